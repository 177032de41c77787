//! Confirmation-gated mutations on folders and items
//!
//! Each request walks a small dialog machine:
//!
//! ```text
//! Idle -> MenuShown -> [Prompting] -> Confirming -> [TypedConfirmPending] -> Executing -> Idle
//! ```
//!
//! Any empty, unknown or mismatched answer drops back to `Idle` without side
//! effects. Only `Executing` leads to a backend call, and exactly one.

use super::listing::{Entry, EntryKey};
use super::path_model::Mode;
use crate::api::{CatalogApi, DirPatch, ItemPatch, ROOT_DIR_ID};
use crate::error::ApiResult;

/// Word that must be typed, exactly, before backing files go to trash.
pub const CONFIRM_KEYWORD: &str = "BORRAR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    RenameDir,
    MoveDir,
    DeleteEmptyDir,
    RenameItem,
    MoveItem,
    UnlinkItem,
    GlobalDelete,
    FullDelete,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::RenameDir => "Rename",
            ActionKind::MoveDir => "Move (change parent)",
            ActionKind::DeleteEmptyDir => "Delete (if empty)",
            ActionKind::RenameItem => "Rename (label)",
            ActionKind::MoveItem => "Move (change folder)",
            ActionKind::UnlinkItem => "Remove from this view",
            ActionKind::GlobalDelete => "Global delete (catalog)",
            ActionKind::FullDelete => "Full delete (catalog + files to trash)",
        }
    }

    /// Question asked before running the action.
    pub fn question(&self) -> &'static str {
        match self {
            ActionKind::RenameDir | ActionKind::RenameItem => "Apply the new name?",
            ActionKind::MoveDir | ActionKind::MoveItem => "Move to the new location?",
            ActionKind::DeleteEmptyDir => "Delete folder? Only works if it is empty.",
            ActionKind::UnlinkItem => "Remove from this view? The files are kept.",
            ActionKind::GlobalDelete => {
                "Delete globally? It disappears from auto and manual. Files are kept."
            }
            ActionKind::FullDelete => {
                "Full delete: catalog record removed and files moved to trash. Continue?"
            }
        }
    }

    /// Prompt for the value the action needs, if it needs one.
    pub fn input_prompt(&self) -> Option<&'static str> {
        match self {
            ActionKind::RenameDir | ActionKind::RenameItem => Some("New name"),
            ActionKind::MoveDir => Some("New parent folder id (root = top)"),
            ActionKind::MoveItem => Some("New folder id (root = top)"),
            _ => None,
        }
    }

    pub fn requires_keyword(&self) -> bool {
        matches!(self, ActionKind::FullDelete)
    }

    /// Which views need a fresh listing once the action succeeded.
    pub fn refreshes(&self, origin: Mode) -> Refresh {
        match self {
            ActionKind::GlobalDelete | ActionKind::FullDelete => Refresh {
                auto: true,
                manual: true,
            },
            _ => Refresh::only(origin),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Refresh {
    pub auto: bool,
    pub manual: bool,
}

impl Refresh {
    pub fn only(mode: Mode) -> Self {
        Self {
            auto: mode == Mode::Auto,
            manual: mode == Mode::Manual,
        }
    }
}

/// A requested mutation, alive for one dialog only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub origin: Mode,
    pub entry: Entry,
    /// New name or new parent id, for rename and move.
    pub input: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Dialog {
    #[default]
    Idle,
    MenuShown {
        origin: Mode,
        entry: Entry,
        choices: Vec<ActionKind>,
        input: String,
    },
    Prompting {
        action: PendingAction,
        input: String,
    },
    Confirming {
        action: PendingAction,
    },
    TypedConfirmPending {
        action: PendingAction,
        input: String,
    },
    Executing {
        action: PendingAction,
    },
}

/// Actions offered for a row, in menu order.
pub fn menu_for(origin: Mode, entry: &Entry) -> Vec<ActionKind> {
    let catalog = |mut v: Vec<ActionKind>| {
        if entry.catalog_id.is_some() {
            v.extend([ActionKind::GlobalDelete, ActionKind::FullDelete]);
        }
        v
    };
    match (origin, &entry.key) {
        (Mode::Auto, EntryKey::Path(_)) if !entry.is_dir => catalog(Vec::new()),
        (Mode::Manual, EntryKey::Dir { .. }) => vec![
            ActionKind::RenameDir,
            ActionKind::MoveDir,
            ActionKind::DeleteEmptyDir,
        ],
        (Mode::Manual, EntryKey::Item { .. }) => catalog(vec![
            ActionKind::RenameItem,
            ActionKind::MoveItem,
            ActionKind::UnlinkItem,
        ]),
        _ => Vec::new(),
    }
}

fn prefill(kind: ActionKind, entry: &Entry) -> String {
    match (kind, &entry.key) {
        (ActionKind::MoveDir, EntryKey::Dir { parent_id, .. }) => parent_id.clone(),
        (ActionKind::MoveItem, EntryKey::Item { dir_id, .. }) => dir_id.clone(),
        (ActionKind::RenameDir | ActionKind::RenameItem, _) => entry.name.clone(),
        _ => String::new(),
    }
}

#[derive(Debug, Default)]
pub struct ActionController {
    dialog: Dialog,
}

impl ActionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    pub fn is_idle(&self) -> bool {
        self.dialog == Dialog::Idle
    }

    /// Show the menu for `entry`. Rows without actions leave the dialog idle.
    pub fn open(&mut self, origin: Mode, entry: &Entry) -> bool {
        let choices = menu_for(origin, entry);
        if choices.is_empty() {
            return false;
        }
        self.dialog = Dialog::MenuShown {
            origin,
            entry: entry.clone(),
            choices,
            input: String::new(),
        };
        true
    }

    /// Text buffer of the current step, if it takes typed input.
    pub fn input_mut(&mut self) -> Option<&mut String> {
        match &mut self.dialog {
            Dialog::MenuShown { input, .. }
            | Dialog::Prompting { input, .. }
            | Dialog::TypedConfirmPending { input, .. } => Some(input),
            _ => None,
        }
    }

    /// Submit the typed buffer of the current step.
    pub fn submit(&mut self) {
        let typed = match self.input_mut() {
            Some(input) => std::mem::take(input),
            None => return,
        };
        if matches!(self.dialog, Dialog::MenuShown { .. }) {
            self.choose(&typed);
        } else if matches!(self.dialog, Dialog::Prompting { .. }) {
            self.provide_input(&typed);
        } else {
            self.type_keyword(&typed);
        }
    }

    /// Pick a menu entry by its 1-based number.
    pub fn choose(&mut self, choice: &str) {
        if !matches!(self.dialog, Dialog::MenuShown { .. }) {
            return;
        }
        let Dialog::MenuShown {
            origin,
            entry,
            choices,
            ..
        } = std::mem::take(&mut self.dialog)
        else {
            return;
        };
        let picked = choice
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| choices.get(idx).copied());
        let Some(kind) = picked else {
            tracing::debug!(choice, "menu choice not recognized, aborting");
            return;
        };

        let action = PendingAction {
            kind,
            origin,
            input: None,
            entry,
        };
        self.dialog = if kind.input_prompt().is_some() {
            let input = prefill(kind, &action.entry);
            Dialog::Prompting { action, input }
        } else {
            Dialog::Confirming { action }
        };
    }

    /// Value for rename or move. Blank aborts.
    pub fn provide_input(&mut self, value: &str) {
        if !matches!(self.dialog, Dialog::Prompting { .. }) {
            return;
        }
        let Dialog::Prompting { mut action, .. } = std::mem::take(&mut self.dialog) else {
            return;
        };
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        action.input = Some(value.to_string());
        self.dialog = Dialog::Confirming { action };
    }

    /// Yes/no step.
    pub fn answer(&mut self, yes: bool) {
        if !matches!(self.dialog, Dialog::Confirming { .. }) {
            return;
        }
        let Dialog::Confirming { action } = std::mem::take(&mut self.dialog) else {
            return;
        };
        if !yes {
            return;
        }
        self.dialog = if action.kind.requires_keyword() {
            Dialog::TypedConfirmPending {
                action,
                input: String::new(),
            }
        } else {
            Dialog::Executing { action }
        };
    }

    /// Keyword step. Case-sensitive; surrounding whitespace is ignored.
    pub fn type_keyword(&mut self, typed: &str) {
        if !matches!(self.dialog, Dialog::TypedConfirmPending { .. }) {
            return;
        }
        let Dialog::TypedConfirmPending { action, .. } = std::mem::take(&mut self.dialog) else {
            return;
        };
        if typed.trim() != CONFIRM_KEYWORD {
            tracing::info!(kind = ?action.kind, "confirmation keyword mismatch, aborting");
            return;
        }
        self.dialog = Dialog::Executing { action };
    }

    pub fn cancel(&mut self) {
        self.dialog = Dialog::Idle;
    }

    /// The action cleared for execution, if any.
    pub fn ready(&self) -> Option<&PendingAction> {
        match &self.dialog {
            Dialog::Executing { action } => Some(action),
            _ => None,
        }
    }

    /// Close the dialog after execution, whatever the outcome.
    pub fn finish(&mut self) {
        self.dialog = Dialog::Idle;
    }
}

/// Issue the single backend request for `action`.
pub async fn execute(api: &dyn CatalogApi, action: &PendingAction) -> ApiResult<Refresh> {
    let input = action.input.clone();
    match (&action.kind, &action.entry.key) {
        (ActionKind::RenameDir, EntryKey::Dir { id, .. }) => {
            api.update_directory(
                id,
                DirPatch {
                    name: input,
                    parent_id: None,
                },
            )
            .await?
        }
        (ActionKind::MoveDir, EntryKey::Dir { id, .. }) => {
            api.update_directory(
                id,
                DirPatch {
                    name: None,
                    parent_id: input.or_else(|| Some(ROOT_DIR_ID.to_string())),
                },
            )
            .await?
        }
        (ActionKind::DeleteEmptyDir, EntryKey::Dir { id, .. }) => api.delete_directory(id).await?,
        (ActionKind::RenameItem, EntryKey::Item { id, .. }) => {
            api.update_item(
                id,
                ItemPatch {
                    label: input,
                    dir_id: None,
                },
            )
            .await?
        }
        (ActionKind::MoveItem, EntryKey::Item { id, .. }) => {
            api.update_item(
                id,
                ItemPatch {
                    label: None,
                    dir_id: input.or_else(|| Some(ROOT_DIR_ID.to_string())),
                },
            )
            .await?
        }
        (ActionKind::UnlinkItem, EntryKey::Item { id, .. }) => api.delete_item(id).await?,
        (ActionKind::GlobalDelete, _) => match action.entry.catalog_id.as_deref() {
            Some(catalog_id) => api.catalog_delete(catalog_id).await?,
            None => return Ok(Refresh::default()),
        },
        (ActionKind::FullDelete, _) => match action.entry.catalog_id.as_deref() {
            Some(catalog_id) => api.catalog_delete_full(catalog_id).await?,
            None => return Ok(Refresh::default()),
        },
        (kind, key) => {
            tracing::warn!(?kind, ?key, "action does not apply to entry");
            return Ok(Refresh::default());
        }
    }
    tracing::info!(kind = ?action.kind, entry = %action.entry.name, "action applied");
    Ok(action.kind.refreshes(action.origin))
}
