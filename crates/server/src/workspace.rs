//! Per-user workspace roots and the path rules that keep requests inside them.

use std::{
    io,
    path::{Component, Path, PathBuf},
};

const MAX_USER_BYTES: usize = 64;

pub fn is_valid_user(user: &str) -> bool {
    !user.is_empty()
        && user.len() <= MAX_USER_BYTES
        && user
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !user.starts_with('.')
}

/// Lexical normalization: folds `.` and `..` without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Final path component of a client-supplied name, if it has one.
pub fn base_name(name: &str) -> Option<&str> {
    Path::new(name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
}

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub async fn open(base: &Path, user: &str) -> io::Result<Self> {
        if !is_valid_user(user) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid workspace user {user:?}"),
            ));
        }
        let root = base.join(user);
        tokio::fs::create_dir_all(&root).await?;
        let root = tokio::fs::canonicalize(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, path: &Path) -> bool {
        normalize(path).starts_with(&self.root)
    }

    /// Resolves symlinks in `path` and returns the real location, or `None`
    /// when it lies outside the workspace.
    pub async fn confine(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        let real = tokio::fs::canonicalize(path).await?;
        Ok(real.starts_with(&self.root).then_some(real))
    }

    /// Joins `name` onto `path` (the root when empty), clamping anything that
    /// escapes the workspace back to the root.
    pub fn resolve(&self, path: &str, name: &str) -> PathBuf {
        let base = if path.is_empty() {
            self.root.clone()
        } else {
            PathBuf::from(path)
        };
        let joined = normalize(&base.join(name));
        if joined.starts_with(&self.root) {
            joined
        } else {
            self.root.clone()
        }
    }
}
