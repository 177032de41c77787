//! Current location per mode, and the root boundary it may never leave

use serde::{Deserialize, Serialize};

use crate::api::{CatalogApi, ROOT_DIR_ID};

/// Which of the two library trees is being browsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Filesystem-backed tree, addressed by path.
    Auto,
    /// Database-backed tree, addressed by directory id.
    Manual,
}

impl Mode {
    pub fn toggle(&self) -> Self {
        match self {
            Mode::Auto => Mode::Manual,
            Mode::Manual => Mode::Auto,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::Auto => "Auto",
            Mode::Manual => "Manual",
        }
    }
}

/// A navigation target: a path in the auto tree or a directory id in the
/// manual tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Path(String),
    Dir(String),
}

impl Location {
    pub fn mode(&self) -> Mode {
        match self {
            Location::Path(_) => Mode::Auto,
            Location::Dir(_) => Mode::Manual,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Location::Path(s) | Location::Dir(s) => s,
        }
    }
}

/// Lexically normalize an absolute path: drop empty and `.` segments and
/// resolve `..` without ever going above `/`. Relative paths yield `None`.
pub fn normalize(path: &str) -> Option<String> {
    if !path.starts_with('/') {
        return None;
    }
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    Some(format!("/{}", parts.join("/")))
}

/// `path == root` or `path` is a proper descendant of `root`.
///
/// Both arguments are expected to be normalized. The check is per segment,
/// so `/a/bbx` is not inside `/a/bb`.
pub fn is_within(root: &str, path: &str) -> bool {
    if root == "/" {
        return path.starts_with('/');
    }
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Normalize `candidate` and substitute `root` if it is not inside it.
pub fn clamp(root: &str, candidate: &str) -> String {
    match normalize(candidate) {
        Some(path) if is_within(root, &path) => path,
        _ => {
            tracing::debug!(root, candidate, "location outside root, clamping");
            root.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathModel {
    auto_root: String,
    auto_path: String,
    root_resolved: bool,
    manual_dir: String,
}

impl PathModel {
    /// Start at `default_root` until the real root is known.
    pub fn new(default_root: &str) -> Self {
        let root = normalize(default_root).unwrap_or_else(|| "/".to_string());
        Self {
            auto_path: root.clone(),
            auto_root: root,
            root_resolved: false,
            manual_dir: ROOT_DIR_ID.to_string(),
        }
    }

    pub fn auto_root(&self) -> &str {
        &self.auto_root
    }

    pub fn auto_path(&self) -> &str {
        &self.auto_path
    }

    pub fn manual_dir(&self) -> &str {
        &self.manual_dir
    }

    pub fn root_resolved(&self) -> bool {
        self.root_resolved
    }

    pub fn location(&self, mode: Mode) -> Location {
        match mode {
            Mode::Auto => Location::Path(self.auto_path.clone()),
            Mode::Manual => Location::Dir(self.manual_dir.clone()),
        }
    }

    /// Install the discovered auto root. Only the first call takes effect.
    ///
    /// A location still sitting at or under the startup default is moved to
    /// the new root, as is any location the new root does not contain.
    pub fn set_root(&mut self, root: &str) -> bool {
        if self.root_resolved {
            tracing::warn!(root, current = %self.auto_root, "auto root already resolved");
            return false;
        }
        let Some(root) = normalize(root) else {
            tracing::warn!(root, "ignoring relative auto root");
            return false;
        };

        let stale = self.auto_path.is_empty() || is_within(&self.auto_root, &self.auto_path);
        if stale || !is_within(&root, &self.auto_path) {
            self.auto_path = root.clone();
        }
        tracing::info!(%root, "auto root resolved");
        self.auto_root = root;
        self.root_resolved = true;
        true
    }

    /// Move to `target`. Out-of-root paths silently land on the root.
    pub fn navigate_to(&mut self, target: &Location) {
        match target {
            Location::Path(path) => self.auto_path = clamp(&self.auto_root, path),
            Location::Dir(id) if id.is_empty() => self.manual_dir = ROOT_DIR_ID.to_string(),
            Location::Dir(id) => self.manual_dir = id.clone(),
        }
    }

    /// Re-check the auto location against the root; true if it was clamped.
    pub fn revalidate(&mut self) -> bool {
        let clamped = clamp(&self.auto_root, &self.auto_path);
        if clamped != self.auto_path {
            self.auto_path = clamped;
            return true;
        }
        false
    }

    /// Put the auto location somewhere without any checks, as a stale
    /// response could.
    #[cfg(test)]
    pub(crate) fn place_auto_path_unchecked(&mut self, path: &str) {
        self.auto_path = path.to_string();
    }

    /// Pop the last auto segment, never above the root.
    pub fn go_up_auto(&mut self) -> bool {
        if self.auto_path == self.auto_root {
            return false;
        }
        let parent = match self.auto_path.rfind('/') {
            Some(0) | None => "/".to_string(),
            Some(idx) => self.auto_path[..idx].to_string(),
        };
        self.auto_path = clamp(&self.auto_root, &parent);
        true
    }

    /// Move to the manual parent via the ancestor chain. Falls back to the
    /// root when the chain is too short or the lookup fails.
    pub async fn go_up_manual(&mut self, api: &dyn CatalogApi) -> bool {
        if self.manual_dir == ROOT_DIR_ID {
            return false;
        }
        let parent = match api.directory_ancestors(&self.manual_dir).await {
            Ok(chain) if chain.len() >= 2 => {
                let id = &chain[chain.len() - 2].id;
                if id.is_empty() {
                    ROOT_DIR_ID.to_string()
                } else {
                    id.clone()
                }
            }
            Ok(_) => ROOT_DIR_ID.to_string(),
            Err(e) => {
                tracing::warn!(dir = %self.manual_dir, error = %e, "ancestor lookup failed, going to root");
                ROOT_DIR_ID.to_string()
            }
        };
        self.manual_dir = parent;
        true
    }

    pub async fn go_up(&mut self, mode: Mode, api: &dyn CatalogApi) -> bool {
        match mode {
            Mode::Auto => self.go_up_auto(),
            Mode::Manual => self.go_up_manual(api).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MemoryBackend, Op};
    use proptest::prelude::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a//b/./c/").as_deref(), Some("/a/b/c"));
        assert_eq!(normalize("/a/b/../c").as_deref(), Some("/a/c"));
        assert_eq!(normalize("/../../x").as_deref(), Some("/x"));
        assert_eq!(normalize("/").as_deref(), Some("/"));
        assert_eq!(normalize("a/b"), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn test_sibling_prefix_is_not_inside() {
        assert!(!is_within("/a/bb", "/a/bbx"));
        assert!(is_within("/a/bb", "/a/bb"));
        assert!(is_within("/a/bb", "/a/bb/x"));
        assert!(is_within("/", "/anything"));
    }

    #[test]
    fn test_navigate_clamps_out_of_root() {
        let mut model = PathModel::new("/a/bb");
        model.navigate_to(&Location::Path("/a/bbx".to_string()));
        assert_eq!(model.auto_path(), "/a/bb");

        model.navigate_to(&Location::Path("/a/bb/c/../../etc".to_string()));
        assert_eq!(model.auto_path(), "/a/bb");

        model.navigate_to(&Location::Path("relative/path".to_string()));
        assert_eq!(model.auto_path(), "/a/bb");

        model.navigate_to(&Location::Path("/a/bb/c/./d/".to_string()));
        assert_eq!(model.auto_path(), "/a/bb/c/d");
    }

    #[test]
    fn test_stale_default_root_is_replaced() {
        let mut model = PathModel::new("/mount/library-auto");
        model.navigate_to(&Location::Path("/mount/library-auto/X".to_string()));
        assert_eq!(model.auto_path(), "/mount/library-auto/X");

        assert!(model.set_root("/host/mount/library-auto"));
        assert_eq!(model.auto_root(), "/host/mount/library-auto");
        assert_eq!(model.auto_path(), "/host/mount/library-auto");
    }

    #[test]
    fn test_set_root_only_once() {
        let mut model = PathModel::new("/mount/library-auto");
        assert!(model.set_root("/srv/lib"));
        assert!(!model.set_root("/other"));
        assert_eq!(model.auto_root(), "/srv/lib");
    }

    #[test]
    fn test_revalidate_clamps_escaped_location() {
        let mut model = PathModel::new("/a/bb");
        model.navigate_to(&Location::Path("/a/bb/c".to_string()));
        assert!(!model.revalidate());
        assert_eq!(model.auto_path(), "/a/bb/c");

        model.auto_path = "/a/bbx/c".to_string();
        assert!(model.revalidate());
        assert_eq!(model.auto_path(), "/a/bb");
        assert!(!model.revalidate());

        model.place_auto_path_unchecked("/a/bb/c/../../../etc");
        assert!(model.revalidate());
        assert_eq!(model.auto_path(), "/a/bb");
    }

    #[test]
    fn test_go_up_auto() {
        let mut model = PathModel::new("/lib");
        assert!(!model.go_up_auto());
        assert_eq!(model.auto_path(), "/lib");

        model.navigate_to(&Location::Path("/lib/a/b".to_string()));
        assert!(model.go_up_auto());
        assert_eq!(model.auto_path(), "/lib/a");
        assert!(model.go_up_auto());
        assert_eq!(model.auto_path(), "/lib");
        assert!(!model.go_up_auto());
    }

    #[test]
    fn test_go_up_from_filesystem_root() {
        let mut model = PathModel::new("/");
        model.navigate_to(&Location::Path("/top".to_string()));
        assert!(model.go_up_auto());
        assert_eq!(model.auto_path(), "/");
    }

    #[tokio::test]
    async fn test_go_up_manual_uses_ancestor_chain() {
        let backend = MemoryBackend::demo("/lib");
        let mut model = PathModel::new("/lib");

        assert!(!model.go_up_manual(&backend).await);
        assert_eq!(backend.calls(Op::DirectoryAncestors), 0);

        model.navigate_to(&Location::Dir("scifi".to_string()));
        assert!(model.go_up_manual(&backend).await);
        assert_eq!(model.manual_dir(), "favs");
        assert!(model.go_up_manual(&backend).await);
        assert_eq!(model.manual_dir(), ROOT_DIR_ID);
    }

    #[tokio::test]
    async fn test_go_up_manual_falls_back_to_root_on_failure() {
        let backend = MemoryBackend::demo("/lib");
        backend.fail(Op::DirectoryAncestors, "db locked");
        let mut model = PathModel::new("/lib");
        model.navigate_to(&Location::Dir("scifi".to_string()));

        assert!(model.go_up_manual(&backend).await);
        assert_eq!(model.manual_dir(), ROOT_DIR_ID);
    }

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("..".to_string()),
            Just(".".to_string()),
            Just(String::new()),
            Just("a".to_string()),
            Just("bb".to_string()),
            Just("bbx".to_string()),
            "[a-z ]{1,4}",
        ]
    }

    fn candidate() -> impl Strategy<Value = String> {
        (any::<bool>(), prop::collection::vec(segment(), 0..8)).prop_map(|(absolute, segs)| {
            let joined = segs.join("/");
            if absolute {
                format!("/{}", joined)
            } else {
                joined
            }
        })
    }

    proptest! {
        #[test]
        fn prop_navigate_stays_inside_root(target in candidate()) {
            let mut model = PathModel::new("/a/bb");
            model.navigate_to(&Location::Path(target));
            let path = model.auto_path();
            prop_assert!(path == "/a/bb" || path.starts_with("/a/bb/"));
            prop_assert!(!path.split('/').any(|s| s == ".." || s == "."));
        }

        #[test]
        fn prop_go_up_stays_inside_root(target in candidate(), pops in 0usize..10) {
            let mut model = PathModel::new("/a/bb");
            model.navigate_to(&Location::Path(target));
            for _ in 0..pops {
                model.go_up_auto();
            }
            prop_assert!(is_within("/a/bb", model.auto_path()));
        }
    }
}
