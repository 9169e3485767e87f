//! Mapping from remote keys to paths in the local mirror tree.

use crate::error::{SyncError, SyncResult};
use std::path::{Component, Path, PathBuf};

/// Places remote keys under a local root, with the remote prefix stripped.
#[derive(Clone, Debug)]
pub struct LocalLayout {
    root: PathBuf,
    prefix: String,
}

impl LocalLayout {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `key` to its destination path.
    ///
    /// Keys that would land outside the root, or that name the root itself
    /// (directory placeholders such as `prefix/`), are rejected.
    pub fn resolve(&self, key: &str) -> SyncResult<PathBuf> {
        let relative = key.strip_prefix(self.prefix.as_str()).unwrap_or(key);
        let relative = relative.trim_start_matches('/');

        let mut path = self.root.clone();
        let mut depth = 0usize;
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(SyncError::fetch(key, "key escapes the local root"));
                }
            }
        }

        if depth == 0 || relative.ends_with('/') {
            return Err(SyncError::fetch(key, "key does not name a file"));
        }
        Ok(path)
    }
}
