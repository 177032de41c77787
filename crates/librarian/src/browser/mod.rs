//! Dual-mode library browser: locations, crumbs, listings and mutations

pub mod actions;
pub mod crumbs;
pub mod listing;
pub mod path_model;
pub mod session;

pub use actions::{ActionController, ActionKind, Dialog, PendingAction, Refresh, CONFIRM_KEYWORD};
pub use crumbs::Crumb;
pub use listing::{Entry, EntryKey, Listing, ListingAdapter};
pub use path_model::{Location, Mode, PathModel};
pub use session::{Library, Pane};
