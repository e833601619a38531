use super::*;
use std::fs;
use tempfile::TempDir;

fn scratch() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

#[tokio::test]
async fn lists_entries_sorted_with_mime_tags() {
    let dir = scratch();
    fs::write(dir.path().join("b.txt"), vec![0u8; 2048]).expect("write");
    fs::create_dir(dir.path().join("a_dir")).expect("mkdir");

    let entries = list_files(dir.path()).await.expect("list");
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a_dir", "b.txt"]);

    assert_eq!(entries[0].kind, "inode-directory");
    assert_eq!(entries[1].kind, "text-plain");
    assert_eq!(entries[1].mime.as_deref(), Some("text/plain"));
    assert_eq!(entries[1].size, 2048);
    assert_eq!(entries[1].path, dir.path().to_string_lossy());
    assert!(entries[1].real_path.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn reports_octal_mode_and_symlink_target() {
    use std::os::unix::fs::{symlink, PermissionsExt};

    let dir = scratch();
    let target = dir.path().join("target");
    fs::create_dir(&target).expect("mkdir");
    fs::set_permissions(&target, fs::Permissions::from_mode(0o750)).expect("chmod");
    symlink(&target, dir.path().join("link")).expect("symlink");

    let link = entry_info(dir.path(), "link").await.expect("info");
    assert_eq!(link.kind, "inode-symlink");
    assert_eq!(link.real_type.as_deref(), Some("inode-directory"));
    assert!(link.links_to_directory());
    let canonical = fs::canonicalize(&target).expect("canonical");
    assert_eq!(link.real_path, Some(canonical.to_string_lossy().into_owned()));

    let target_info = entry_info(dir.path(), "target").await.expect("info");
    assert_eq!(target_info.mode, "750");
}

#[tokio::test]
async fn listing_missing_directory_fails() {
    let dir = scratch();
    assert!(list_files(&dir.path().join("missing")).await.is_err());
}

#[test]
fn create_refuses_existing_names() {
    let dir = scratch();
    create_dir(dir.path(), "docs").expect("create dir");
    let err = create_dir(dir.path(), "docs").expect_err("exists");
    assert_eq!(err.to_string(), "Directory already exists");

    create_file(dir.path(), "notes.md").expect("create file");
    assert!(dir.path().join("notes.md").is_file());
    let err = create_file(dir.path(), "notes.md").expect_err("exists");
    assert_eq!(err.to_string(), "File already exists");
}

#[test]
fn move_counts_only_successful_files() {
    let src = scratch();
    let dst = scratch();
    fs::write(src.path().join("a"), "a").expect("write");
    fs::write(src.path().join("b"), "b").expect("write");
    let files = vec![
        src.path().join("a"),
        src.path().join("b"),
        src.path().join("missing"),
    ];

    assert_eq!(move_files(&files, dst.path()), 2);
    assert!(dst.path().join("a").exists());
    assert!(!src.path().join("a").exists());
}

#[test]
fn copy_descends_into_directories_but_not_into_itself() {
    let dir = scratch();
    let tree = dir.path().join("tree");
    fs::create_dir_all(tree.join("inner")).expect("mkdir");
    fs::write(tree.join("inner").join("leaf.txt"), "leaf").expect("write");
    let dst = scratch();

    assert_eq!(copy_files(&[tree.clone()], dst.path()), 1);
    assert_eq!(
        fs::read_to_string(dst.path().join("tree/inner/leaf.txt")).expect("read"),
        "leaf"
    );
    assert!(tree.join("inner/leaf.txt").exists());

    assert_eq!(copy_files(&[tree.clone()], &tree), 0);
}

#[test]
fn remove_handles_files_and_trees() {
    let dir = scratch();
    fs::create_dir_all(dir.path().join("tree/inner")).expect("mkdir");
    fs::write(dir.path().join("file"), "x").expect("write");
    let files = vec![dir.path().join("tree"), dir.path().join("file")];

    assert_eq!(remove_files(&files), 2);
    assert_eq!(fs::read_dir(dir.path()).expect("read").count(), 0);
}

#[cfg(unix)]
#[test]
fn recursive_chmod_counts_every_changed_entry() {
    use std::os::unix::fs::PermissionsExt;

    let dir = scratch();
    let tree = dir.path().join("tree");
    fs::create_dir_all(tree.join("inner")).expect("mkdir");
    fs::write(tree.join("inner/leaf"), "x").expect("write");

    assert_eq!(chmod_files(&[tree.clone()], 0o700, false), 1);
    assert_eq!(chmod_files(&[tree.clone()], 0o700, true), 3);
    let mode = fs::metadata(tree.join("inner/leaf"))
        .expect("meta")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o700);
}

#[cfg(unix)]
#[test]
fn chmod_leaves_symlink_targets_alone() {
    use std::os::unix::fs::{symlink, PermissionsExt};

    let outside = scratch();
    let secret = outside.path().join("secret.txt");
    fs::write(&secret, "s3cret").expect("write");
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o600)).expect("chmod");

    let dir = scratch();
    let tree = dir.path().join("d");
    fs::create_dir(&tree).expect("mkdir");
    symlink(outside.path(), tree.join("link")).expect("symlink");
    symlink(&secret, dir.path().join("secret_link")).expect("symlink");

    assert_eq!(chmod_files(&[tree.clone()], 0o777, true), 1);
    assert_eq!(chmod_files(&[dir.path().join("secret_link")], 0o777, false), 0);

    let mode = fs::metadata(&secret).expect("meta").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    let outside_mode = fs::metadata(outside.path()).expect("meta").permissions().mode();
    assert_ne!(outside_mode & 0o777, 0o777);
}

#[cfg(unix)]
#[test]
fn copy_recreates_symlinks_instead_of_reading_targets() {
    use std::os::unix::fs::symlink;

    let outside = scratch();
    let secret = outside.path().join("secret.txt");
    fs::write(&secret, "s3cret").expect("write");

    let src = scratch();
    let dst = scratch();
    symlink(&secret, src.path().join("link")).expect("symlink");
    fs::create_dir(src.path().join("tree")).expect("mkdir");
    symlink(outside.path(), src.path().join("tree").join("escape")).expect("symlink");

    let files = vec![src.path().join("link"), src.path().join("tree")];
    assert_eq!(copy_files(&files, dst.path()), 2);

    let copied = dst.path().join("link");
    assert!(fs::symlink_metadata(&copied)
        .expect("meta")
        .file_type()
        .is_symlink());
    assert_eq!(fs::read_link(&copied).expect("read link"), secret);

    let nested = dst.path().join("tree").join("escape");
    assert!(fs::symlink_metadata(&nested)
        .expect("meta")
        .file_type()
        .is_symlink());
    assert_eq!(fs::read_link(&nested).expect("read link"), outside.path());
}
