//! View lookup by logical name.
//!
//! `admin.users.index` resolves to `admin/users/index.<ext>` under each
//! configured root, trying extensions in order. `mail::welcome` looks only in
//! the roots registered for the `mail` namespace.

use crate::error::{AuditError, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

pub const NAMESPACE_DELIMITER: &str = "::";

pub trait ViewResolver: Send + Sync {
    /// Locate the file for a view. Unknown views yield `AuditError::NotFound`.
    fn find(&self, name: &str) -> Result<PathBuf>;

    /// Every logical view name available, sorted.
    fn list_all(&self) -> Vec<String>;
}

#[derive(Debug, Clone)]
pub struct FileViewFinder {
    paths: Vec<PathBuf>,
    extensions: Vec<String>,
    hints: HashMap<String, Vec<PathBuf>>,
}

impl FileViewFinder {
    pub fn new(paths: Vec<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            paths,
            extensions,
            hints: HashMap::new(),
        }
    }

    pub fn add_namespace(&mut self, namespace: &str, paths: Vec<PathBuf>) {
        self.hints
            .entry(namespace.to_string())
            .or_default()
            .extend(paths);
    }

    fn roots_for<'a>(&'a self, name: &'a str) -> Result<(&'a [PathBuf], &'a str)> {
        match name.split_once(NAMESPACE_DELIMITER) {
            Some((ns, view)) => match self.hints.get(ns) {
                Some(roots) => Ok((roots.as_slice(), view)),
                None => Err(AuditError::NotFound {
                    name: name.to_string(),
                    tried: Vec::new(),
                }),
            },
            None => Ok((self.paths.as_slice(), name)),
        }
    }

    /// Strip the longest matching extension from a file name.
    fn strip_extension<'a>(&self, file: &'a str) -> Option<&'a str> {
        let mut exts: Vec<&String> = self.extensions.iter().collect();
        exts.sort_by_key(|e| std::cmp::Reverse(e.len()));
        exts.into_iter()
            .find_map(|ext| file.strip_suffix(ext.as_str())?.strip_suffix('.'))
            .filter(|stem| !stem.is_empty())
    }

    fn views_under(&self, root: &Path, prefix: &str, out: &mut BTreeSet<String>) {
        if !root.is_dir() {
            tracing::warn!("View directory does not exist: {}", root.display());
            return;
        }
        let pattern = format!(
            "{}/**/*",
            glob::Pattern::escape(&root.to_string_lossy())
        );
        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot scan {}: {}", root.display(), e);
                return;
            }
        };
        for path in entries.filter_map(std::result::Result::ok) {
            if !path.is_file() {
                continue;
            }
            let Some(rel) = pathdiff::diff_paths(&path, root) else {
                continue;
            };
            let rel = rel.to_string_lossy().replace('\\', "/");
            if let Some(stem) = self.strip_extension(&rel) {
                out.insert(format!("{}{}", prefix, stem.replace('/', ".")));
            }
        }
    }
}

/// `admin.users.index` as `admin/users/index`. Names with an empty segment
/// or anything that would leave the view root yield `None`.
fn relative_view_path(view: &str) -> Option<String> {
    let view = view.trim();
    if view.split('.').any(str::is_empty) {
        return None;
    }
    let rel = view.replace('.', "/");
    let inside = Path::new(&rel)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    inside.then_some(rel)
}

impl ViewResolver for FileViewFinder {
    fn find(&self, name: &str) -> Result<PathBuf> {
        let direct = Path::new(name);
        if direct.is_file() && self.strip_extension(name).is_some() {
            return Ok(direct.to_path_buf());
        }
        let (roots, view) = self.roots_for(name)?;
        let rel = match relative_view_path(view) {
            Some(rel) => rel,
            None => {
                tracing::debug!("Rejecting malformed view name '{}'", name);
                return Err(AuditError::NotFound {
                    name: name.to_string(),
                    tried: Vec::new(),
                });
            }
        };
        let mut tried = Vec::new();
        for root in roots {
            for ext in &self.extensions {
                let candidate = root.join(format!("{rel}.{ext}"));
                if candidate.is_file() {
                    tracing::debug!("Resolved view '{}' to {}", name, candidate.display());
                    return Ok(candidate);
                }
                tried.push(candidate);
            }
        }
        Err(AuditError::NotFound {
            name: name.to_string(),
            tried,
        })
    }

    fn list_all(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for root in &self.paths {
            self.views_under(root, "", &mut names);
        }
        for (ns, roots) in &self.hints {
            for root in roots {
                self.views_under(root, &format!("{ns}{NAMESPACE_DELIMITER}"), &mut names);
            }
        }
        tracing::debug!("Discovered {} views", names.len());
        names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn finder(root: &Path) -> FileViewFinder {
        FileViewFinder::new(
            vec![root.to_path_buf()],
            vec!["blade.php".into(), "php".into()],
        )
    }

    #[test]
    fn test_find_dotted_name_prefers_first_extension() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("admin/users")).unwrap();
        fs::write(root.join("admin/users/index.blade.php"), "@csrf").unwrap();
        fs::write(root.join("admin/users/index.php"), "<?php").unwrap();

        let found = finder(root).find("admin.users.index").unwrap();
        assert_eq!(found, root.join("admin/users/index.blade.php"));
    }

    #[test]
    fn test_missing_view_is_not_found_with_tried_paths() {
        let dir = tempdir().unwrap();
        let err = finder(dir.path()).find("nope.view").unwrap_err();
        match err {
            AuditError::NotFound { name, tried } => {
                assert_eq!(name, "nope.view");
                assert_eq!(tried.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_names_stay_inside_roots() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("views");
        fs::create_dir_all(&root).unwrap();
        fs::write(dir.path().join("secret.blade.php"), "").unwrap();
        let f = finder(&root);
        for name in [".secret", "a..secret", "admin.", "/etc/hosts", "../secret", ""] {
            match f.find(name) {
                Err(AuditError::NotFound { tried, .. }) => assert!(tried.is_empty(), "{name}"),
                other => panic!("{name}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_namespaced_views() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::create_dir_all(root.join("vendor/mail")).unwrap();
        fs::write(root.join("app/home.blade.php"), "").unwrap();
        fs::write(root.join("vendor/mail/welcome.blade.php"), "").unwrap();

        let mut f = finder(&root.join("app"));
        f.add_namespace("mail", vec![root.join("vendor/mail")]);
        assert_eq!(
            f.find("mail::welcome").unwrap(),
            root.join("vendor/mail/welcome.blade.php")
        );
        assert!(f.find("other::welcome").unwrap_err().is_not_found());
        assert!(f.find("welcome").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_all_derives_dotted_names() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("layouts")).unwrap();
        fs::create_dir_all(root.join("admin/users")).unwrap();
        fs::write(root.join("welcome.blade.php"), "").unwrap();
        fs::write(root.join("layouts/app.blade.php"), "").unwrap();
        fs::write(root.join("admin/users/index.php"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        assert_eq!(
            finder(root).list_all(),
            vec!["admin.users.index", "layouts.app", "welcome"]
        );
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let dir = tempdir().unwrap();
        assert!(finder(&dir.path().join("missing")).list_all().is_empty());
    }
}
