//! Library session: both panes, their locations and the action dialog

use std::sync::Arc;

use super::actions::{self, ActionController, Refresh};
use super::crumbs::Crumb;
use super::listing::{Entry, ListingAdapter};
use super::path_model::{Location, Mode, PathModel};
use crate::api::CatalogApi;

/// What one pane currently shows.
#[derive(Debug, Clone, Default)]
pub struct Pane {
    pub entries: Vec<Entry>,
    pub crumbs: Vec<Crumb>,
    pub status: String,
}

pub struct Library {
    api: Arc<dyn CatalogApi>,
    paths: PathModel,
    fallback_root: String,
    auto: Pane,
    manual: Pane,
    actions: ActionController,
}

impl Library {
    /// `default_root` is used until the backend reports the real root;
    /// `fallback_root` replaces it if that lookup fails.
    pub fn new(api: Arc<dyn CatalogApi>, default_root: &str, fallback_root: &str) -> Self {
        Self {
            api,
            paths: PathModel::new(default_root),
            fallback_root: fallback_root.to_string(),
            auto: Pane::default(),
            manual: Pane::default(),
            actions: ActionController::new(),
        }
    }

    pub fn api(&self) -> &Arc<dyn CatalogApi> {
        &self.api
    }

    pub fn paths(&self) -> &PathModel {
        &self.paths
    }

    pub fn pane(&self, mode: Mode) -> &Pane {
        match mode {
            Mode::Auto => &self.auto,
            Mode::Manual => &self.manual,
        }
    }

    fn pane_mut(&mut self, mode: Mode) -> &mut Pane {
        match mode {
            Mode::Auto => &mut self.auto,
            Mode::Manual => &mut self.manual,
        }
    }

    pub fn actions(&self) -> &ActionController {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut ActionController {
        &mut self.actions
    }

    fn adapter(&self, mode: Mode) -> ListingAdapter {
        match mode {
            Mode::Auto => ListingAdapter::Filesystem {
                root: self.paths.auto_root().to_string(),
            },
            Mode::Manual => ListingAdapter::CatalogTree,
        }
    }

    /// Resolve the auto root from the backend, else the fallback.
    pub async fn init_roots(&mut self) {
        if self.paths.root_resolved() {
            return;
        }
        let root = match self.api.discovered_auto_root().await {
            Ok(root) if !root.trim().is_empty() => root,
            Ok(_) => self.fallback_root.clone(),
            Err(e) => {
                tracing::warn!(error = %e, fallback = %self.fallback_root, "auto root discovery failed");
                self.fallback_root.clone()
            }
        };
        self.paths.set_root(&root);
    }

    /// Crumbs for the current auto location. Always revalidated first.
    fn render_auto_crumbs(&mut self) {
        self.paths.revalidate();
        self.auto.crumbs =
            super::crumbs::auto_crumbs(self.paths.auto_path(), self.paths.auto_root());
    }

    /// Re-list the current location of `mode`.
    ///
    /// A failure only replaces the status text; the last good entries stay.
    pub async fn refresh(&mut self, mode: Mode) {
        let adapter = self.adapter(mode);
        self.pane_mut(mode).status = "Loading...".to_string();

        // the auto location is re-checked before it is ever sent
        if mode == Mode::Auto {
            self.render_auto_crumbs();
        }
        let location = self.paths.location(mode);
        if mode == Mode::Manual {
            match adapter.ancestor_chain(self.api.as_ref(), location.as_str()).await {
                Ok(crumbs) => self.manual.crumbs = crumbs,
                Err(e) => tracing::debug!(error = %e, "ancestor lookup failed, keeping crumbs"),
            }
        }

        let result = adapter.list(self.api.as_ref(), location.as_str()).await;
        match result {
            Ok(listing) => {
                let status = match mode {
                    Mode::Auto => format!("OK ({})", listing.entries.len()),
                    Mode::Manual => format!(
                        "OK ({} dirs, {} items)",
                        listing.dir_count, listing.item_count
                    ),
                };
                let pane = self.pane_mut(mode);
                pane.entries = listing.entries;
                pane.status = status;
                if mode == Mode::Auto && self.paths.revalidate() {
                    tracing::info!(root = %self.paths.auto_root(), "auto location left root, snapped back");
                    self.render_auto_crumbs();
                }
            }
            Err(e) => {
                tracing::info!(?mode, location = location.as_str(), error = %e, "listing failed");
                self.pane_mut(mode).status = e.to_string();
            }
        }
    }

    /// Navigate to `target` (clamped for the auto tree) and re-list.
    pub async fn navigate(&mut self, target: &Location) {
        self.paths.navigate_to(target);
        self.refresh(target.mode()).await;
    }

    /// Open the folder at `index` of the pane. Items do nothing.
    pub async fn open_entry(&mut self, mode: Mode, index: usize) -> bool {
        let Some(target) = self.pane(mode).entries.get(index).and_then(Entry::target) else {
            return false;
        };
        self.navigate(&target).await;
        true
    }

    pub async fn go_up(&mut self, mode: Mode) {
        let moved = self.paths.go_up(mode, self.api.as_ref()).await;
        if moved {
            self.refresh(mode).await;
        }
    }

    /// Open the action menu for the row at `index`.
    pub fn request_action(&mut self, mode: Mode, index: usize) -> bool {
        match self.pane(mode).entries.get(index).cloned() {
            Some(entry) => self.actions.open(mode, &entry),
            None => false,
        }
    }

    /// Run the confirmed action, if any, then re-list whatever it touched.
    ///
    /// Returns the views that were refreshed.
    pub async fn run_pending_action(&mut self) -> Refresh {
        let Some(action) = self.actions.ready().cloned() else {
            return Refresh::default();
        };
        let result = actions::execute(self.api.as_ref(), &action).await;
        self.actions.finish();

        match result {
            Ok(refresh) => {
                if refresh.manual {
                    self.refresh(Mode::Manual).await;
                }
                if refresh.auto {
                    self.refresh(Mode::Auto).await;
                }
                refresh
            }
            Err(e) => {
                tracing::warn!(kind = ?action.kind, error = %e, "action failed");
                self.pane_mut(action.origin).status = e.to_string();
                Refresh::default()
            }
        }
    }
}
