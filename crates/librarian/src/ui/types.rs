//! Types and enums used across the UI

use crate::api::RestoreMode;

/// Where list-navigation keys go on the library page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    /// Breadcrumb bar, with the highlighted crumb index.
    Crumbs(usize),
}

/// Full-screen overlays that swallow input until dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    ConfirmRestart,
    ConfirmRestore(RestoreMode),
    ConfirmDbReset,
}
