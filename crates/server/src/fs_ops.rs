//! File-system work behind the actions: directory listings with entry metadata
//! and the batch operations that report how many files they touched.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use shared::domain::DirectoryEntry;
use tokio_stream::{wrappers::ReadDirStream, StreamExt};
use tracing::debug;

const DIRECTORY_MIME: &str = "inode/directory";
const SYMLINK_MIME: &str = "inode/symlink";

fn mime_tag(mime: &str) -> String {
    mime.replace('/', "-")
}

fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(unix)]
fn mode_and_owner(metadata: &fs::Metadata) -> (String, String) {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    (
        format!("{:o}", metadata.permissions().mode() & 0o777),
        metadata.uid().to_string(),
    )
}

#[cfg(not(unix))]
fn mode_and_owner(metadata: &fs::Metadata) -> (String, String) {
    let mode = if metadata.permissions().readonly() {
        "444"
    } else {
        "644"
    };
    (mode.to_string(), String::new())
}

/// Metadata for one entry of `dir`, without following a final symlink.
pub async fn entry_info(dir: &Path, name: &str) -> io::Result<DirectoryEntry> {
    let target = dir.join(name);
    let metadata = tokio::fs::symlink_metadata(&target).await?;
    let (mode, owner) = mode_and_owner(&metadata);

    let mut real_path = None;
    let mut real_type = None;
    let mime = if metadata.file_type().is_symlink() {
        if let Ok(resolved) = tokio::fs::canonicalize(&target).await {
            let real_mime = match tokio::fs::metadata(&resolved).await {
                Ok(meta) if meta.is_dir() => DIRECTORY_MIME.to_string(),
                _ => guess_mime(&resolved),
            };
            real_type = Some(mime_tag(&real_mime));
            real_path = Some(resolved.to_string_lossy().into_owned());
        }
        SYMLINK_MIME.to_string()
    } else if metadata.is_dir() {
        DIRECTORY_MIME.to_string()
    } else {
        guess_mime(&target)
    };

    Ok(DirectoryEntry {
        name: name.to_string(),
        kind: mime_tag(&mime),
        size: metadata.len(),
        owner,
        mode,
        path: dir.to_string_lossy().into_owned(),
        mime: Some(mime),
        real_path,
        real_type,
    })
}

/// Entries of `dir`, sorted by name. Entries that vanish mid-listing are skipped.
pub async fn list_files(dir: &Path) -> io::Result<Vec<DirectoryEntry>> {
    let mut stream = ReadDirStream::new(tokio::fs::read_dir(dir).await?);
    let mut entries = Vec::new();
    while let Some(item) = stream.next().await {
        let name = item?.file_name().to_string_lossy().into_owned();
        match entry_info(dir, &name).await {
            Ok(entry) => entries.push(entry),
            Err(err) => debug!(dir = %dir.display(), %name, %err, "skipping unreadable entry"),
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

pub fn create_dir(dir: &Path, name: &str) -> io::Result<()> {
    let path = dir.join(name);
    if path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Directory already exists",
        ));
    }
    fs::create_dir(path)
}

pub fn create_file(dir: &Path, name: &str) -> io::Result<()> {
    let path = dir.join(name);
    if path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "File already exists",
        ));
    }
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(drop)
}

fn destination(file: &Path, dir: &Path) -> Option<PathBuf> {
    file.file_name().map(|name| dir.join(name))
}

fn count_successes<F>(files: &[PathBuf], mut op: F) -> u64
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let mut succeeded = 0;
    for file in files {
        match op(file) {
            Ok(()) => succeeded += 1,
            Err(err) => debug!(file = %file.display(), %err, "batch operation skipped file"),
        }
    }
    succeeded
}

pub fn move_files(files: &[PathBuf], dir: &Path) -> u64 {
    count_successes(files, |file| {
        let target = destination(file, dir).ok_or(io::ErrorKind::InvalidInput)?;
        fs::rename(file, target)
    })
}

pub fn copy_files(files: &[PathBuf], dir: &Path) -> u64 {
    count_successes(files, |file| {
        let target = destination(file, dir).ok_or(io::ErrorKind::InvalidInput)?;
        if target.starts_with(file) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot copy a directory into itself",
            ));
        }
        copy_recursive(file, &target)
    })
}

/// Copies a tree without following symlinks; links are recreated as links.
fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(from)?;
    if metadata.file_type().is_symlink() {
        return copy_link(from, to);
    }
    if !metadata.is_dir() {
        return fs::copy(from, to).map(drop);
    }
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_link(from: &Path, _to: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot copy symlink {}", from.display()),
    ))
}

pub fn remove_files(files: &[PathBuf]) -> u64 {
    count_successes(files, |file| {
        if fs::symlink_metadata(file)?.is_dir() {
            fs::remove_dir_all(file)
        } else {
            fs::remove_file(file)
        }
    })
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, permissions)
}

/// Applies `mode` to each file; `recursive` descends into directories and
/// counts every entry it changes below them. Symlinks are skipped.
pub fn chmod_files(files: &[PathBuf], mode: u32, recursive: bool) -> u64 {
    let mut changed = 0;
    for file in files {
        let file_type = match fs::symlink_metadata(file) {
            Ok(metadata) => metadata.file_type(),
            Err(err) => {
                debug!(file = %file.display(), %err, "chmod skipped file");
                continue;
            }
        };
        if file_type.is_symlink() {
            debug!(file = %file.display(), "chmod skipped symlink");
            continue;
        }
        if recursive && file_type.is_dir() {
            changed += chmod_tree(file, mode);
        }
        match set_mode(file, mode) {
            Ok(()) => changed += 1,
            Err(err) => debug!(file = %file.display(), %err, "chmod skipped file"),
        }
    }
    changed
}

fn chmod_tree(dir: &Path, mode: u32) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let mut changed = 0;
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_symlink() {
            continue;
        }
        let path = entry.path();
        if file_type.is_dir() {
            changed += chmod_tree(&path, mode);
        }
        if set_mode(&path, mode).is_ok() {
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
#[path = "tests/fs_ops_tests.rs"]
mod tests;
