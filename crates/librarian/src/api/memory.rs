//! In-process backend
//!
//! Holds a filesystem-style auto tree, a manual directory tree and the
//! catalog records both trees point at. Used by `librarian demo` and by the
//! tests, which can also inject failures and per-call latency.

use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{
    Backup, CatalogApi, DirPatch, DirRef, FsEntry, FsListing, ItemPatch, ManualDir, ManualItem,
    RestoreMode, ROOT_DIR_ID,
};
use crate::error::{ApiError, ApiResult};

/// Backend operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    DiscoverRoot,
    ListPath,
    DirectoryChildren,
    DirectoryItems,
    DirectoryAncestors,
    UpdateDirectory,
    UpdateItem,
    DeleteDirectory,
    DeleteItem,
    CatalogDelete,
    CatalogDeleteFull,
    UploadPanels,
    Settings,
    LogJobs,
    Backups,
    RunBackup,
    RestoreBackup,
    ResetDatabase,
    Restart,
}

#[derive(Debug, Clone)]
struct FsNode {
    is_dir: bool,
    size: u64,
    mod_time: Option<String>,
    import_id: Option<String>,
}

#[derive(Default)]
struct State {
    auto_root: String,
    fs: BTreeMap<String, FsNode>,
    dirs: Vec<ManualDir>,
    items: Vec<ManualItem>,
    catalog: BTreeSet<String>,
    trash: Vec<String>,
    backups: Vec<Backup>,
    restores: Vec<(String, RestoreMode)>,
    db_resets: usize,
    restarts: usize,
    calls: HashMap<Op, usize>,
    failures: HashMap<Op, String>,
    latency: HashMap<Op, Duration>,
}

pub struct MemoryBackend {
    state: Mutex<State>,
}

fn parent_of(path: &str) -> Option<&str> {
    let idx = path.rfind('/')?;
    if idx == 0 {
        if path.len() > 1 {
            Some("/")
        } else {
            None
        }
    } else {
        Some(&path[..idx])
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn root_label(root: &str) -> &str {
    root.trim_end_matches('/').rsplit('/').next().unwrap_or(root)
}

impl MemoryBackend {
    pub fn new(auto_root: &str) -> Self {
        let mut state = State {
            auto_root: auto_root.to_string(),
            ..State::default()
        };
        state.fs.insert(
            auto_root.to_string(),
            FsNode {
                is_dir: true,
                size: 0,
                mod_time: None,
                import_id: None,
            },
        );
        Self {
            state: Mutex::new(state),
        }
    }

    /// A small library to click around in.
    pub fn demo(auto_root: &str) -> Self {
        let backend = Self::new(auto_root);
        let movies = format!("{}/Movies", auto_root);
        let shows = format!("{}/Shows", auto_root);
        backend.add_fs_file(
            &format!("{}/Arrival (2016)/Arrival (2016).mkv", movies),
            7_812_345_678,
            Some("imp-arrival"),
        );
        backend.add_fs_file(
            &format!("{}/Heat (1995)/Heat (1995).mkv", movies),
            12_400_000_000,
            Some("imp-heat"),
        );
        backend.add_fs_file(
            &format!("{}/Dark/Season 01/Dark S01E01.mkv", shows),
            1_650_000_000,
            Some("imp-dark-101"),
        );
        backend.add_fs_file(&format!("{}/README.txt", auto_root), 812, None);

        backend.add_manual_dir("favs", "Favourites", ROOT_DIR_ID);
        backend.add_manual_dir("scifi", "Sci-Fi", "favs");
        backend.add_manual_dir("empty", "Empty shelf", ROOT_DIR_ID);
        backend.add_manual_item(
            "m-arrival",
            "scifi",
            Some("Arrival"),
            "Arrival (2016).mkv",
            7_812_345_678,
            "imp-arrival",
        );
        backend.add_manual_item(
            "m-heat",
            "favs",
            None,
            "Heat (1995).mkv",
            12_400_000_000,
            "imp-heat",
        );
        backend.state().backups.push(Backup {
            name: "backup-2024-05-01".to_string(),
            config_present: true,
            time: Some("2024-05-01T03:00:00Z".to_string()),
        });
        backend
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a directory to the auto tree, creating missing parents.
    pub fn add_fs_dir(&self, path: &str) {
        let mut state = self.state();
        let mut current = Some(path);
        while let Some(p) = current {
            if state.fs.contains_key(p) {
                break;
            }
            state.fs.insert(
                p.to_string(),
                FsNode {
                    is_dir: true,
                    size: 0,
                    mod_time: Some("2024-01-01T00:00:00Z".to_string()),
                    import_id: None,
                },
            );
            current = parent_of(p);
        }
    }

    /// Add a file to the auto tree. A catalog id also registers the record.
    pub fn add_fs_file(&self, path: &str, size: u64, import_id: Option<&str>) {
        if let Some(parent) = parent_of(path) {
            self.add_fs_dir(parent);
        }
        let mut state = self.state();
        if let Some(id) = import_id {
            state.catalog.insert(id.to_string());
        }
        state.fs.insert(
            path.to_string(),
            FsNode {
                is_dir: false,
                size,
                mod_time: Some("2024-03-14T15:09:26Z".to_string()),
                import_id: import_id.map(str::to_string),
            },
        );
    }

    pub fn add_manual_dir(&self, id: &str, name: &str, parent_id: &str) {
        self.state().dirs.push(ManualDir {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: Some(parent_id.to_string()),
        });
    }

    pub fn add_manual_item(
        &self,
        id: &str,
        dir_id: &str,
        label: Option<&str>,
        filename: &str,
        bytes: u64,
        import_id: &str,
    ) {
        let mut state = self.state();
        state.catalog.insert(import_id.to_string());
        state.items.push(ManualItem {
            id: id.to_string(),
            label: label.map(str::to_string),
            filename: Some(filename.to_string()),
            bytes: Some(bytes),
            import_id: Some(import_id.to_string()),
            dir_id: Some(dir_id.to_string()),
        });
    }

    /// Make every call of `op` fail with `body` until cleared.
    pub fn fail(&self, op: Op, body: &str) {
        self.state().failures.insert(op, body.to_string());
    }

    pub fn clear_failure(&self, op: Op) {
        self.state().failures.remove(&op);
    }

    pub fn set_latency(&self, op: Op, delay: Duration) {
        self.state().latency.insert(op, delay);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn has_catalog_record(&self, import_id: &str) -> bool {
        self.state().catalog.contains(import_id)
    }

    pub fn trashed(&self) -> Vec<String> {
        self.state().trash.clone()
    }

    pub fn manual_dir(&self, id: &str) -> Option<ManualDir> {
        self.state().dirs.iter().find(|d| d.id == id).cloned()
    }

    pub fn manual_item(&self, id: &str) -> Option<ManualItem> {
        self.state().items.iter().find(|i| i.id == id).cloned()
    }

    pub fn restarts(&self) -> usize {
        self.state().restarts
    }

    /// Restores applied so far, oldest first.
    pub fn restores(&self) -> Vec<(String, RestoreMode)> {
        self.state().restores.clone()
    }

    pub fn db_resets(&self) -> usize {
        self.state().db_resets
    }

    /// Count the call, wait out any configured latency, then apply any
    /// injected failure. The lock is never held across the sleep.
    async fn enter(&self, op: Op) -> ApiResult<()> {
        let delay = {
            let mut state = self.state();
            *state.calls.entry(op).or_insert(0) += 1;
            state.latency.get(&op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.state().failures.get(&op) {
            Some(body) => Err(ApiError::backend(500, body.clone())),
            None => Ok(()),
        }
    }

    fn dir_exists(state: &State, id: &str) -> bool {
        id == ROOT_DIR_ID || state.dirs.iter().any(|d| d.id == id)
    }

    fn parent_id(dir: &ManualDir) -> &str {
        dir.parent_id.as_deref().unwrap_or(ROOT_DIR_ID)
    }

    /// Whether `candidate` is `id` or sits below it.
    fn is_descendant(state: &State, candidate: &str, id: &str) -> bool {
        let mut current = candidate.to_string();
        // bounded by the number of dirs so a corrupt cycle cannot spin
        for _ in 0..=state.dirs.len() {
            if current == id {
                return true;
            }
            match state.dirs.iter().find(|d| d.id == current) {
                Some(dir) => current = Self::parent_id(dir).to_string(),
                None => return false,
            }
        }
        false
    }

    fn drop_catalog_record(state: &mut State, import_id: &str) -> ApiResult<()> {
        if !state.catalog.remove(import_id) {
            return Err(ApiError::backend(404, format!("import not found: {}", import_id)));
        }
        state
            .fs
            .retain(|_, node| node.import_id.as_deref() != Some(import_id));
        state
            .items
            .retain(|item| item.import_id.as_deref() != Some(import_id));
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for MemoryBackend {
    async fn discovered_auto_root(&self) -> ApiResult<String> {
        self.enter(Op::DiscoverRoot).await?;
        Ok(self.state().auto_root.clone())
    }

    async fn list_path(&self, path: &str) -> ApiResult<FsListing> {
        self.enter(Op::ListPath).await?;
        let state = self.state();
        let root = state.auto_root.as_str();
        let inside = path == root || path.starts_with(&format!("{}/", root));
        if !inside {
            return Err(ApiError::backend(
                400,
                format!("path outside {}", root_label(root)),
            ));
        }
        match state.fs.get(path) {
            Some(node) if node.is_dir => {}
            _ => return Err(ApiError::backend(404, format!("no such directory: {}", path))),
        }

        let entries = state
            .fs
            .iter()
            .filter(|(p, _)| p.as_str() != path && parent_of(p) == Some(path))
            .map(|(p, node)| FsEntry {
                name: name_of(p).to_string(),
                is_dir: node.is_dir,
                size: (!node.is_dir).then_some(node.size),
                mod_time: node.mod_time.clone(),
                path: p.clone(),
                import_id: node.import_id.clone(),
            })
            .collect();

        Ok(FsListing {
            entries,
            root: Some(root.to_string()),
        })
    }

    async fn directory_children(&self, parent_id: &str) -> ApiResult<Vec<ManualDir>> {
        self.enter(Op::DirectoryChildren).await?;
        let state = self.state();
        if !Self::dir_exists(&state, parent_id) {
            return Err(ApiError::backend(404, "directory not found"));
        }
        Ok(state
            .dirs
            .iter()
            .filter(|d| Self::parent_id(d) == parent_id)
            .cloned()
            .collect())
    }

    async fn directory_items(&self, dir_id: &str) -> ApiResult<Vec<ManualItem>> {
        self.enter(Op::DirectoryItems).await?;
        let state = self.state();
        if !Self::dir_exists(&state, dir_id) {
            return Err(ApiError::backend(404, "directory not found"));
        }
        Ok(state
            .items
            .iter()
            .filter(|i| i.dir_id.as_deref().unwrap_or(ROOT_DIR_ID) == dir_id)
            .cloned()
            .collect())
    }

    async fn directory_ancestors(&self, dir_id: &str) -> ApiResult<Vec<DirRef>> {
        self.enter(Op::DirectoryAncestors).await?;
        let state = self.state();
        if !Self::dir_exists(&state, dir_id) {
            return Err(ApiError::backend(404, "directory not found"));
        }
        let mut chain = Vec::new();
        let mut current = dir_id.to_string();
        for _ in 0..=state.dirs.len() {
            if current == ROOT_DIR_ID {
                break;
            }
            let Some(dir) = state.dirs.iter().find(|d| d.id == current) else {
                break;
            };
            chain.push(DirRef {
                id: dir.id.clone(),
                name: dir.name.clone(),
            });
            current = Self::parent_id(dir).to_string();
        }
        chain.push(DirRef {
            id: ROOT_DIR_ID.to_string(),
            name: "Manual".to_string(),
        });
        chain.reverse();
        Ok(chain)
    }

    async fn update_directory(&self, id: &str, patch: DirPatch) -> ApiResult<()> {
        self.enter(Op::UpdateDirectory).await?;
        let mut state = self.state();
        if let Some(parent) = patch.parent_id.as_deref() {
            if !Self::dir_exists(&state, parent) {
                return Err(ApiError::backend(400, "parent directory not found"));
            }
            if Self::is_descendant(&state, parent, id) {
                return Err(ApiError::backend(400, "cannot move a directory into itself"));
            }
        }
        let dir = state
            .dirs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| ApiError::backend(404, "directory not found"))?;
        if let Some(name) = patch.name {
            dir.name = name;
        }
        if let Some(parent) = patch.parent_id {
            dir.parent_id = Some(parent);
        }
        Ok(())
    }

    async fn update_item(&self, id: &str, patch: ItemPatch) -> ApiResult<()> {
        self.enter(Op::UpdateItem).await?;
        let mut state = self.state();
        if let Some(dir_id) = patch.dir_id.as_deref() {
            if !Self::dir_exists(&state, dir_id) {
                return Err(ApiError::backend(400, "target directory not found"));
            }
        }
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ApiError::backend(404, "item not found"))?;
        if let Some(label) = patch.label {
            item.label = Some(label);
        }
        if let Some(dir_id) = patch.dir_id {
            item.dir_id = Some(dir_id);
        }
        Ok(())
    }

    async fn delete_directory(&self, id: &str) -> ApiResult<()> {
        self.enter(Op::DeleteDirectory).await?;
        let mut state = self.state();
        if !state.dirs.iter().any(|d| d.id == id) {
            return Err(ApiError::backend(404, "directory not found"));
        }
        let has_children = state.dirs.iter().any(|d| Self::parent_id(d) == id);
        let has_items = state
            .items
            .iter()
            .any(|i| i.dir_id.as_deref() == Some(id));
        if has_children || has_items {
            return Err(ApiError::backend(409, "directory not empty"));
        }
        state.dirs.retain(|d| d.id != id);
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> ApiResult<()> {
        self.enter(Op::DeleteItem).await?;
        let mut state = self.state();
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        if state.items.len() == before {
            return Err(ApiError::backend(404, "item not found"));
        }
        Ok(())
    }

    async fn catalog_delete(&self, catalog_id: &str) -> ApiResult<()> {
        self.enter(Op::CatalogDelete).await?;
        Self::drop_catalog_record(&mut self.state(), catalog_id)
    }

    async fn catalog_delete_full(&self, catalog_id: &str) -> ApiResult<()> {
        self.enter(Op::CatalogDeleteFull).await?;
        let mut state = self.state();
        Self::drop_catalog_record(&mut state, catalog_id)?;
        state.trash.push(catalog_id.to_string());
        Ok(())
    }

    async fn upload_panels(&self) -> ApiResult<serde_json::Value> {
        self.enter(Op::UploadPanels).await?;
        let polls = self.calls(Op::UploadPanels);
        Ok(json!({ "active": [], "queued": 0, "polls": polls }))
    }

    async fn settings(&self) -> ApiResult<serde_json::Value> {
        self.enter(Op::Settings).await?;
        let root = self.state().auto_root.clone();
        Ok(json!({ "paths": { "mount_point": parent_of(&root).unwrap_or("/") } }))
    }

    async fn log_jobs(&self) -> ApiResult<serde_json::Value> {
        self.enter(Op::LogJobs).await?;
        Ok(json!({ "items": [] }))
    }

    async fn backups(&self) -> ApiResult<Vec<Backup>> {
        self.enter(Op::Backups).await?;
        Ok(self.state().backups.clone())
    }

    async fn run_backup(&self) -> ApiResult<()> {
        self.enter(Op::RunBackup).await?;
        let mut state = self.state();
        let name = format!("backup-{}", state.backups.len() + 1);
        state.backups.push(Backup {
            name,
            config_present: true,
            time: Some(chrono::Utc::now().to_rfc3339()),
        });
        Ok(())
    }

    async fn restore_backup(&self, name: &str, mode: RestoreMode) -> ApiResult<()> {
        self.enter(Op::RestoreBackup).await?;
        let mut state = self.state();
        if !state.backups.iter().any(|b| b.name == name) {
            return Err(ApiError::backend(404, format!("backup not found: {}", name)));
        }
        state.restores.push((name.to_string(), mode));
        state.restarts += 1;
        Ok(())
    }

    async fn reset_database(&self) -> ApiResult<()> {
        self.enter(Op::ResetDatabase).await?;
        let mut state = self.state();
        state.dirs.clear();
        state.items.clear();
        state.catalog.clear();
        for node in state.fs.values_mut() {
            node.import_id = None;
        }
        state.db_resets += 1;
        Ok(())
    }

    async fn restart(&self) -> ApiResult<()> {
        self.enter(Op::Restart).await?;
        self.state().restarts += 1;
        Ok(())
    }
}
