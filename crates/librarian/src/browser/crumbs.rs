//! Breadcrumb trails for both trees

use super::path_model::{clamp, Location};
use crate::api::DirRef;

/// One clickable breadcrumb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    pub target: Location,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Crumbs for an auto location, root first.
///
/// The first crumb is the root, labeled with its last segment. Each later
/// crumb targets the cumulative path up to its own segment. A location
/// outside `root` is treated as `root`.
pub fn auto_crumbs(location: &str, root: &str) -> Vec<Crumb> {
    let location = clamp(root, location);
    let root_parts: Vec<&str> = segments(root).collect();

    let root_label = root_parts.last().copied().unwrap_or("/");
    let mut acc = format!("/{}", root_parts.join("/"));
    let mut crumbs = vec![Crumb {
        label: root_label.to_string(),
        target: Location::Path(acc.clone()),
    }];

    for seg in segments(&location).skip(root_parts.len()) {
        if !acc.ends_with('/') {
            acc.push('/');
        }
        acc.push_str(seg);
        crumbs.push(Crumb {
            label: seg.to_string(),
            target: Location::Path(acc.clone()),
        });
    }
    crumbs
}

/// Crumbs for the manual tree, straight from the server's ancestor chain.
pub fn manual_crumbs(chain: &[DirRef]) -> Vec<Crumb> {
    chain
        .iter()
        .map(|dir| Crumb {
            label: dir.name.clone(),
            target: Location::Dir(dir.id.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::path_model::PathModel;
    use proptest::prelude::*;

    fn targets(crumbs: &[Crumb]) -> Vec<&str> {
        crumbs.iter().map(|c| c.target.as_str()).collect()
    }

    #[test]
    fn test_root_only() {
        let crumbs = auto_crumbs("/host/mount/library-auto", "/host/mount/library-auto");
        assert_eq!(crumbs.len(), 1);
        assert_eq!(crumbs[0].label, "library-auto");
        assert_eq!(
            crumbs[0].target,
            Location::Path("/host/mount/library-auto".to_string())
        );
    }

    #[test]
    fn test_cumulative_targets() {
        let crumbs = auto_crumbs("/lib/Movies/Heat (1995)", "/lib");
        let labels: Vec<&str> = crumbs.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["lib", "Movies", "Heat (1995)"]);
        assert_eq!(
            targets(&crumbs),
            vec!["/lib", "/lib/Movies", "/lib/Movies/Heat (1995)"]
        );
    }

    #[test]
    fn test_outside_root_renders_root_only() {
        let crumbs = auto_crumbs("/a/bbx/c", "/a/bb");
        assert_eq!(targets(&crumbs), vec!["/a/bb"]);

        let crumbs = auto_crumbs("/etc", "/a/bb");
        assert_eq!(targets(&crumbs), vec!["/a/bb"]);
    }

    #[test]
    fn test_filesystem_root() {
        let crumbs = auto_crumbs("/x/y", "/");
        assert_eq!(crumbs[0].label, "/");
        assert_eq!(targets(&crumbs), vec!["/", "/x", "/x/y"]);
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let a = auto_crumbs("/lib/a/b", "/lib");
        let b = auto_crumbs("/lib/a/b", "/lib");
        assert_eq!(a, b);
    }

    #[test]
    fn test_manual_crumbs_follow_chain() {
        let chain = vec![
            DirRef {
                id: "root".to_string(),
                name: "Manual".to_string(),
            },
            DirRef {
                id: "favs".to_string(),
                name: "Favourites".to_string(),
            },
        ];
        let crumbs = manual_crumbs(&chain);
        assert_eq!(crumbs.len(), 2);
        assert_eq!(crumbs[1].label, "Favourites");
        assert_eq!(crumbs[1].target, Location::Dir("favs".to_string()));
    }

    proptest! {
        #[test]
        fn prop_crumbs_round_trip(segs in prop::collection::vec("[a-zA-Z0-9 ._-]{1,6}", 0..6)) {
            let root = "/srv/library-auto";
            let segs: Vec<String> = segs
                .into_iter()
                .filter(|s| s != "." && s != "..")
                .collect();
            let location = if segs.is_empty() {
                root.to_string()
            } else {
                format!("{}/{}", root, segs.join("/"))
            };

            let crumbs = auto_crumbs(&location, root);
            prop_assert_eq!(crumbs.len(), 1 + segs.len());

            let mut model = PathModel::new(root);
            for crumb in &crumbs {
                model.navigate_to(&crumb.target);
                prop_assert_eq!(model.auto_path(), crumb.target.as_str());
            }
            prop_assert_eq!(crumbs.last().unwrap().target.as_str(), location.as_str());
        }
    }
}
