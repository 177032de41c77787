//! Backend contract: wire types and the `CatalogApi` trait
//!
//! Two implementations live here: [`HttpBackend`] talks to a running server,
//! [`MemoryBackend`] keeps everything in process for the demo and for tests.

mod http;
mod memory;

pub use http::HttpBackend;
pub use memory::{MemoryBackend, Op};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;

/// Identifier of the top of the manual tree.
pub const ROOT_DIR_ID: &str = "root";

/// One row of a filesystem listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsEntry {
    pub name: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mod_time: Option<String>,
    /// Full path of the child.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsListing {
    #[serde(default)]
    pub entries: Vec<FsEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualDir {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir_id: Option<String>,
}

impl ManualItem {
    /// Label, else filename, else a placeholder.
    pub fn display_name(&self) -> String {
        self.label
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.filename.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("(item)")
            .to_string()
    }
}

/// Element of an ancestor chain, ordered root first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirRef {
    pub id: String,
    pub name: String,
}

/// Partial directory update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Partial item update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub name: String,
    #[serde(default)]
    pub config_present: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// What a backup restore brings back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    /// Database and configuration.
    Full,
    DatabaseOnly,
    ConfigOnly,
}

impl RestoreMode {
    pub fn include_db(&self) -> bool {
        matches!(self, RestoreMode::Full | RestoreMode::DatabaseOnly)
    }

    pub fn include_config(&self) -> bool {
        matches!(self, RestoreMode::Full | RestoreMode::ConfigOnly)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RestoreMode::Full => "DB+config",
            RestoreMode::DatabaseOnly => "DB only",
            RestoreMode::ConfigOnly => "config only",
        }
    }
}

/// Everything the browser needs from the backend.
///
/// Every failure carries the backend's message; callers show it as-is.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Authoritative filesystem root of the auto tree.
    async fn discovered_auto_root(&self) -> ApiResult<String>;

    async fn list_path(&self, path: &str) -> ApiResult<FsListing>;

    async fn directory_children(&self, parent_id: &str) -> ApiResult<Vec<ManualDir>>;

    async fn directory_items(&self, dir_id: &str) -> ApiResult<Vec<ManualItem>>;

    /// Ancestor chain from the root to `dir_id`, inclusive.
    async fn directory_ancestors(&self, dir_id: &str) -> ApiResult<Vec<DirRef>>;

    async fn update_directory(&self, id: &str, patch: DirPatch) -> ApiResult<()>;

    async fn update_item(&self, id: &str, patch: ItemPatch) -> ApiResult<()>;

    /// Fails when the directory still has children or items.
    async fn delete_directory(&self, id: &str) -> ApiResult<()>;

    /// Removes one mount association; the catalog record stays.
    async fn delete_item(&self, id: &str) -> ApiResult<()>;

    /// Removes the catalog record everywhere. Backing files stay.
    async fn catalog_delete(&self, catalog_id: &str) -> ApiResult<()>;

    /// Removes the catalog record and moves backing files to trash.
    async fn catalog_delete_full(&self, catalog_id: &str) -> ApiResult<()>;

    async fn upload_panels(&self) -> ApiResult<serde_json::Value>;

    async fn settings(&self) -> ApiResult<serde_json::Value>;

    async fn log_jobs(&self) -> ApiResult<serde_json::Value>;

    async fn backups(&self) -> ApiResult<Vec<Backup>>;

    async fn run_backup(&self) -> ApiResult<()>;

    /// Restore the named backup. The server restarts itself afterwards.
    async fn restore_backup(&self, name: &str, mode: RestoreMode) -> ApiResult<()>;

    /// Wipe the database only; configuration is kept.
    async fn reset_database(&self) -> ApiResult<()>;

    async fn restart(&self) -> ApiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_modes() {
        assert!(RestoreMode::Full.include_db() && RestoreMode::Full.include_config());
        assert!(RestoreMode::DatabaseOnly.include_db());
        assert!(!RestoreMode::DatabaseOnly.include_config());
        assert!(!RestoreMode::ConfigOnly.include_db());
        assert!(RestoreMode::ConfigOnly.include_config());
    }

    #[test]
    fn test_item_display_name_fallbacks() {
        let mut item = ManualItem {
            id: "i1".to_string(),
            label: Some("Movie (2001)".to_string()),
            filename: Some("movie.mkv".to_string()),
            bytes: None,
            import_id: None,
            dir_id: None,
        };
        assert_eq!(item.display_name(), "Movie (2001)");

        item.label = Some(String::new());
        assert_eq!(item.display_name(), "movie.mkv");

        item.filename = None;
        assert_eq!(item.display_name(), "(item)");
    }

    #[test]
    fn test_fs_listing_decodes_sparse_rows() {
        let json = r#"{"entries":[
            {"name":"Movies","is_dir":true,"path":"/m/Movies","mod_time":"2024-01-02T03:04:05Z"},
            {"name":"a.mkv","path":"/m/a.mkv","size":42,"import_id":"imp-1"}
        ]}"#;
        let listing: FsListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.entries.len(), 2);
        assert!(listing.entries[0].is_dir);
        assert_eq!(listing.entries[0].size, None);
        assert!(!listing.entries[1].is_dir);
        assert_eq!(listing.entries[1].import_id.as_deref(), Some("imp-1"));
        assert_eq!(listing.root, None);
    }

    #[test]
    fn test_patch_omits_unset_fields() {
        let patch = DirPatch {
            name: Some("Films".to_string()),
            parent_id: None,
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"name":"Films"}"#);

        let patch = ItemPatch {
            label: None,
            dir_id: Some("d7".to_string()),
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"dir_id":"d7"}"#);
    }
}
