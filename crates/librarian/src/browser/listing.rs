//! One listing shape over the filesystem tree and the catalog tree

use super::crumbs::{auto_crumbs, manual_crumbs, Crumb};
use super::path_model::Location;
use crate::api::{CatalogApi, FsEntry, ManualDir, ManualItem, ROOT_DIR_ID};
use crate::error::ApiResult;

/// What an entry is, in the terms of the tree it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKey {
    /// Auto tree: full child path.
    Path(String),
    /// Manual folder and its parent.
    Dir { id: String, parent_id: String },
    /// Manual item and the folder it hangs from.
    Item { id: String, dir_id: String },
}

/// Normalized listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub modified: Option<String>,
    pub key: EntryKey,
    /// Catalog record this row shows, if any.
    pub catalog_id: Option<String>,
}

impl Entry {
    /// Where clicking this row leads. Only folders lead anywhere.
    pub fn target(&self) -> Option<Location> {
        if !self.is_dir {
            return None;
        }
        match &self.key {
            EntryKey::Path(path) => Some(Location::Path(path.clone())),
            EntryKey::Dir { id, .. } => Some(Location::Dir(id.clone())),
            EntryKey::Item { .. } => None,
        }
    }
}

impl From<FsEntry> for Entry {
    fn from(e: FsEntry) -> Self {
        Self {
            name: e.name,
            is_dir: e.is_dir,
            size: if e.is_dir { None } else { e.size },
            modified: e.mod_time,
            key: EntryKey::Path(e.path),
            catalog_id: e.import_id.filter(|id| !id.is_empty()),
        }
    }
}

impl From<ManualDir> for Entry {
    fn from(d: ManualDir) -> Self {
        Self {
            name: d.name,
            is_dir: true,
            size: None,
            modified: None,
            key: EntryKey::Dir {
                id: d.id,
                parent_id: d.parent_id.unwrap_or_else(|| ROOT_DIR_ID.to_string()),
            },
            catalog_id: None,
        }
    }
}

impl From<ManualItem> for Entry {
    fn from(item: ManualItem) -> Self {
        Self {
            name: item.display_name(),
            is_dir: false,
            size: item.bytes,
            modified: None,
            key: EntryKey::Item {
                id: item.id,
                dir_id: item.dir_id.unwrap_or_else(|| ROOT_DIR_ID.to_string()),
            },
            catalog_id: item.import_id.filter(|id| !id.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<Entry>,
    /// Root the backend reported alongside the listing, if any.
    pub root_echo: Option<String>,
    pub dir_count: usize,
    pub item_count: usize,
}

/// Listing strategy, picked by mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingAdapter {
    Filesystem { root: String },
    CatalogTree,
}

impl ListingAdapter {
    /// Fetch the entries at `location`, in backend order.
    ///
    /// The catalog tree issues its two requests together and merges only
    /// when both succeed, folders first.
    pub async fn list(&self, api: &dyn CatalogApi, location: &str) -> ApiResult<Listing> {
        match self {
            ListingAdapter::Filesystem { root } => {
                let listing = api.list_path(location).await?;
                let entries: Vec<Entry> = listing.entries.into_iter().map(Entry::from).collect();
                let dir_count = entries.iter().filter(|e| e.is_dir).count();
                Ok(Listing {
                    item_count: entries.len() - dir_count,
                    dir_count,
                    entries,
                    root_echo: listing.root.or_else(|| Some(root.clone())),
                })
            }
            ListingAdapter::CatalogTree => {
                let (dirs, items) = tokio::try_join!(
                    api.directory_children(location),
                    api.directory_items(location)
                )?;
                let dir_count = dirs.len();
                let item_count = items.len();
                let entries = dirs
                    .into_iter()
                    .map(Entry::from)
                    .chain(items.into_iter().map(Entry::from))
                    .collect();
                Ok(Listing {
                    entries,
                    root_echo: Some(ROOT_DIR_ID.to_string()),
                    dir_count,
                    item_count,
                })
            }
        }
    }

    /// Crumb trail for `location`. The filesystem trail is computed locally
    /// and never fails.
    pub async fn ancestor_chain(
        &self,
        api: &dyn CatalogApi,
        location: &str,
    ) -> ApiResult<Vec<Crumb>> {
        match self {
            ListingAdapter::Filesystem { root } => Ok(auto_crumbs(location, root)),
            ListingAdapter::CatalogTree => {
                let chain = api.directory_ancestors(location).await?;
                Ok(manual_crumbs(&chain))
            }
        }
    }
}
