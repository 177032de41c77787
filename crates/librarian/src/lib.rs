//! Terminal client for a media library server: browse the filesystem-backed
//! auto tree and the curated manual tree, and run confirmed catalog actions.

pub mod api;
pub mod browser;
pub mod coordinator;
pub mod error;
pub mod format;
pub mod logging;
pub mod settings;
pub mod ui;
