//! Page state machine: one page visible at a time, page-scoped side effects

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{Backup, CatalogApi, RestoreMode};
use crate::browser::{Library, Mode};
use crate::error::ApiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Library,
    Upload,
    Import,
    Settings,
    Logs,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Library,
        Page::Upload,
        Page::Import,
        Page::Settings,
        Page::Logs,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Library => "Library",
            Page::Upload => "Upload",
            Page::Import => "Import",
            Page::Settings => "Settings",
            Page::Logs => "Logs",
        }
    }
}

/// Repeating upload-panel refresh. Aborted on drop.
struct UploadPoller {
    handle: JoinHandle<()>,
    rx: mpsc::UnboundedReceiver<ApiResult<serde_json::Value>>,
}

impl UploadPoller {
    fn start(api: Arc<dyn CatalogApi>, every: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(api.upload_panels().await).is_err() {
                    break;
                }
            }
        });
        Self { handle, rx }
    }
}

impl Drop for UploadPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Data shown by the non-library pages.
#[derive(Debug, Default)]
pub struct PageData {
    pub upload: Option<serde_json::Value>,
    pub settings: Option<serde_json::Value>,
    pub backups: Vec<Backup>,
    /// Backup row that restore acts on.
    pub selected_backup: usize,
    /// Outcome of the last backup list, run or restore.
    pub backup_status: String,
    pub logs: Option<serde_json::Value>,
    pub status: String,
}

impl PageData {
    pub fn selected_backup_name(&self) -> Option<&str> {
        self.backups
            .get(self.selected_backup)
            .map(|b| b.name.as_str())
    }
}

pub struct ViewCoordinator {
    api: Arc<dyn CatalogApi>,
    page: Page,
    tab: Mode,
    library: Library,
    upload_poller: Option<UploadPoller>,
    poll_every: Duration,
    logs_loaded_once: bool,
    data: PageData,
}

impl ViewCoordinator {
    pub fn new(library: Library, start_tab: Mode, poll_every: Duration) -> Self {
        Self {
            api: Arc::clone(library.api()),
            page: Page::Library,
            tab: start_tab,
            library,
            upload_poller: None,
            poll_every,
            logs_loaded_once: false,
            data: PageData::default(),
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn tab(&self) -> Mode {
        self.tab
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }

    pub fn data(&self) -> &PageData {
        &self.data
    }

    pub fn is_polling(&self) -> bool {
        self.upload_poller.is_some()
    }

    /// Resolve roots, then show the library on the starting tab.
    pub async fn start(&mut self) {
        self.library.init_roots().await;
        self.show_page(Page::Library).await;
        self.set_library_tab(self.tab).await;
    }

    pub async fn show_page(&mut self, page: Page) {
        tracing::debug!(from = ?self.page, to = ?page, "page change");
        self.page = page;

        // at most one poller: the old one is gone before a new one exists
        self.upload_poller = None;
        if page == Page::Upload {
            self.upload_poller = Some(UploadPoller::start(
                Arc::clone(&self.api),
                self.poll_every,
            ));
        }

        match page {
            Page::Settings => self.reload_settings().await,
            Page::Logs if !self.logs_loaded_once => {
                self.logs_loaded_once = true;
                self.reload_logs().await;
            }
            _ => {}
        }
    }

    /// Switch the library sub-tab and re-list it.
    pub async fn set_library_tab(&mut self, tab: Mode) {
        self.tab = tab;
        self.library.refresh(tab).await;
    }

    pub async fn toggle_library_tab(&mut self) {
        self.set_library_tab(self.tab.toggle()).await;
    }

    /// Take whatever the poller delivered since the last call.
    pub fn drain_upload_updates(&mut self) -> usize {
        let Some(poller) = self.upload_poller.as_mut() else {
            return 0;
        };
        let mut received = 0;
        while let Ok(update) = poller.rx.try_recv() {
            received += 1;
            match update {
                Ok(value) => self.data.upload = Some(value),
                Err(e) => self.data.status = e.to_string(),
            }
        }
        received
    }

    /// Always asks the backend; in-memory values may predate a restart.
    pub async fn reload_settings(&mut self) {
        match self.api.settings().await {
            Ok(value) => {
                self.data.settings = Some(value);
                self.data.status.clear();
            }
            Err(e) => {
                tracing::info!(error = %e, "settings load failed");
                self.data.status = e.to_string();
            }
        }
        self.reload_backups().await;
    }

    pub async fn reload_backups(&mut self) {
        match self.api.backups().await {
            Ok(items) => {
                self.data.backup_status = format!("Backups: {}", items.len());
                self.data.selected_backup = self
                    .data
                    .selected_backup
                    .min(items.len().saturating_sub(1));
                self.data.backups = items;
            }
            Err(e) => self.data.backup_status = format!("Backup list failed: {}", e),
        }
    }

    /// Move the restore selection, staying inside the list.
    pub fn select_backup(&mut self, offset: isize) {
        let len = self.data.backups.len();
        if len == 0 {
            return;
        }
        let next = (self.data.selected_backup as isize + offset).clamp(0, len as isize - 1);
        self.data.selected_backup = next as usize;
    }

    pub async fn run_backup(&mut self) {
        self.data.backup_status = "Running backup...".to_string();
        match self.api.run_backup().await {
            Ok(()) => {
                self.reload_backups().await;
                self.data.backup_status = "Manual backup completed".to_string();
            }
            Err(e) => self.data.backup_status = format!("Backup failed: {}", e),
        }
    }

    /// Restore the selected backup. Callers confirm first.
    pub async fn restore_backup(&mut self, mode: RestoreMode) {
        let Some(name) = self.data.selected_backup_name().map(str::to_string) else {
            self.data.backup_status = "No backup selected".to_string();
            return;
        };
        tracing::warn!(backup = %name, mode = mode.label(), "restoring backup");
        match self.api.restore_backup(&name, mode).await {
            Ok(()) => self.data.backup_status = "Restored. Restarting...".to_string(),
            Err(e) => self.data.backup_status = format!("Restore failed: {}", e),
        }
    }

    /// Wipe the database, then restart. Callers confirm first.
    pub async fn reset_database(&mut self) {
        tracing::warn!("resetting database");
        if let Err(e) = self.api.reset_database().await {
            self.data.status = format!("DB reset failed: {}", e);
            return;
        }
        self.restart().await;
    }

    pub async fn restart(&mut self) {
        match self.api.restart().await {
            Ok(()) => self.data.status = "Restarting...".to_string(),
            Err(e) => self.data.status = e.to_string(),
        }
    }

    pub async fn reload_logs(&mut self) {
        match self.api.log_jobs().await {
            Ok(value) => self.data.logs = Some(value),
            Err(e) => self.data.status = e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MemoryBackend, Op};

    fn coordinator(backend: Arc<MemoryBackend>) -> ViewCoordinator {
        let library = Library::new(backend, "/mount/library-auto", "/host/mount/library-auto");
        ViewCoordinator::new(library, Mode::Auto, Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_upload_poller_lives_only_on_upload_page() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut coord = coordinator(backend.clone());

        coord.show_page(Page::Upload).await;
        assert!(coord.is_polling());
        tokio::time::sleep(Duration::from_millis(70)).await;
        assert!(coord.drain_upload_updates() >= 2);
        assert!(coord.data().upload.is_some());

        coord.show_page(Page::Import).await;
        assert!(!coord.is_polling());
        tokio::time::sleep(Duration::from_millis(10)).await;
        let polls = backend.calls(Op::UploadPanels);
        tokio::time::sleep(Duration::from_millis(70)).await;
        assert_eq!(backend.calls(Op::UploadPanels), polls);
    }

    #[tokio::test]
    async fn test_reentering_upload_replaces_poller() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut coord = coordinator(backend.clone());

        coord.show_page(Page::Upload).await;
        coord.show_page(Page::Upload).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        coord.show_page(Page::Library).await;

        // two immediate first ticks plus at most a few from the survivor
        let polls = backend.calls(Op::UploadPanels);
        assert!(polls <= 6, "too many polls: {}", polls);
    }

    #[tokio::test]
    async fn test_settings_reload_every_time_logs_only_once() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut coord = coordinator(backend.clone());

        coord.show_page(Page::Settings).await;
        coord.show_page(Page::Library).await;
        coord.show_page(Page::Settings).await;
        assert_eq!(backend.calls(Op::Settings), 2);
        assert_eq!(coord.data().backups.len(), 1);

        coord.show_page(Page::Logs).await;
        coord.show_page(Page::Library).await;
        coord.show_page(Page::Logs).await;
        assert_eq!(backend.calls(Op::LogJobs), 1);
    }

    #[tokio::test]
    async fn test_tab_toggle_lists_the_other_tree() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut coord = coordinator(backend.clone());
        coord.start().await;
        assert_eq!(coord.tab(), Mode::Auto);
        assert_eq!(backend.calls(Op::ListPath), 1);

        coord.toggle_library_tab().await;
        assert_eq!(coord.tab(), Mode::Manual);
        assert_eq!(backend.calls(Op::DirectoryChildren), 1);
        assert_eq!(backend.calls(Op::DirectoryItems), 1);
    }

    #[tokio::test]
    async fn test_run_backup_and_restart() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut coord = coordinator(backend.clone());
        coord.run_backup().await;
        assert_eq!(coord.data().backups.len(), 2);
        assert_eq!(coord.data().backup_status, "Manual backup completed");

        coord.restart().await;
        assert_eq!(backend.restarts(), 1);
    }

    #[tokio::test]
    async fn test_failed_settings_load_stays_in_status() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        backend.fail(Op::Settings, "settings store unreadable");
        let mut coord = coordinator(backend.clone());

        coord.show_page(Page::Settings).await;
        assert!(coord.data().status.contains("settings store unreadable"));
        assert!(coord.data().settings.is_none());
        // the backup list still loads and reports separately
        assert_eq!(coord.data().backup_status, "Backups: 1");

        backend.clear_failure(Op::Settings);
        coord.reload_settings().await;
        assert!(coord.data().status.is_empty());
    }

    #[tokio::test]
    async fn test_restore_uses_selected_backup_and_mode() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut coord = coordinator(backend.clone());
        coord.run_backup().await;
        coord.show_page(Page::Settings).await;
        assert_eq!(coord.data().backups.len(), 2);

        coord.select_backup(5);
        assert_eq!(coord.data().selected_backup, 1);
        coord.select_backup(-1);
        coord.restore_backup(RestoreMode::DatabaseOnly).await;

        assert_eq!(
            backend.restores(),
            vec![("backup-2024-05-01".to_string(), RestoreMode::DatabaseOnly)]
        );
        assert_eq!(coord.data().backup_status, "Restored. Restarting...");
    }

    #[tokio::test]
    async fn test_restore_without_backups_does_nothing() {
        let backend = Arc::new(MemoryBackend::new("/lib"));
        let mut coord = coordinator(backend.clone());
        coord.reload_backups().await;

        coord.restore_backup(RestoreMode::Full).await;
        assert_eq!(backend.calls(Op::RestoreBackup), 0);
        assert_eq!(coord.data().backup_status, "No backup selected");
    }

    #[tokio::test]
    async fn test_database_reset_then_restart() {
        let backend = Arc::new(MemoryBackend::demo("/lib"));
        let mut coord = coordinator(backend.clone());

        backend.fail(Op::ResetDatabase, "database busy");
        coord.reset_database().await;
        assert_eq!(coord.data().status, "DB reset failed: database busy");
        assert_eq!(backend.restarts(), 0);

        backend.clear_failure(Op::ResetDatabase);
        coord.reset_database().await;
        assert_eq!(backend.db_resets(), 1);
        assert_eq!(backend.restarts(), 1);
        assert_eq!(coord.data().status, "Restarting...");
    }
}
