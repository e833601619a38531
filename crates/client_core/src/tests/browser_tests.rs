use super::*;

fn entry(name: &str, kind: &str, size: u64, owner: &str) -> DirectoryEntry {
    DirectoryEntry {
        name: name.to_string(),
        kind: kind.to_string(),
        size,
        owner: owner.to_string(),
        mode: "644".to_string(),
        path: "/data".to_string(),
        mime: None,
        real_path: None,
        real_type: None,
    }
}

fn listing(dir: &str, files: Vec<DirectoryEntry>) -> DirectoryListing {
    DirectoryListing {
        dir: dir.to_string(),
        files: Some(files),
        error: None,
    }
}

fn names(browser: &FileBrowser) -> Vec<&str> {
    browser.rows().iter().map(Row::name).collect()
}

#[test]
fn formats_sizes_with_binary_units() {
    assert_eq!(format_size(0), "0.0 B");
    assert_eq!(format_size(512), "512.0 B");
    assert_eq!(format_size(2048), "2.0 KiB");
    assert_eq!(format_size(1536 * 1024), "1.5 MiB");
    assert_eq!(format_size(u64::MAX), "16384.0 PiB");
}

#[test]
fn adds_parent_row_only_off_root() {
    let files = vec![
        entry("a", "text-plain", 1, "u"),
        entry("b", "text-plain", 2, "u"),
    ];
    let mut browser = FileBrowser::new();

    browser.show_listing(listing("/data", files.clone()));
    assert_eq!(browser.rows().len(), 3);
    assert_eq!(browser.rows()[0], Row::Parent);

    browser.show_listing(listing("/", files));
    assert_eq!(browser.rows().len(), 2);
    assert!(!browser.rows().contains(&Row::Parent));
}

#[test]
fn listing_error_renders_no_rows() {
    let mut browser = FileBrowser::new();
    browser.show_listing(DirectoryListing {
        dir: "/data/locked".to_string(),
        files: None,
        error: Some("Permission denied".to_string()),
    });
    assert!(browser.rows().is_empty());
    assert_eq!(browser.message(), Some("Permission denied"));
}

#[test]
fn empty_listing_reports_empty_directory() {
    let mut browser = FileBrowser::new();
    browser.show_listing(listing("/", Vec::new()));
    assert!(browser.rows().is_empty());
    assert_eq!(browser.message(), Some(EMPTY_DIRECTORY_MESSAGE));
}

#[test]
fn name_order_is_case_insensitive_and_stable() {
    let mut browser = FileBrowser::new();
    browser.show_listing(listing(
        "/data",
        vec![
            entry("beta", "text-plain", 1, "u"),
            entry("Alpha", "text-plain", 5, "u"),
            entry("BETA", "text-plain", 3, "u"),
            entry("alpha2", "text-plain", 4, "u"),
        ],
    ));
    assert_eq!(names(&browser), vec!["..", "Alpha", "alpha2", "beta", "BETA"]);
}

#[test]
fn size_order_is_numeric_ascending() {
    let mut browser = FileBrowser::new();
    browser.show_listing(listing(
        "/data",
        vec![
            entry("big", "text-plain", 10_000, "u"),
            entry("small", "text-plain", 9, "u"),
            entry("mid", "text-plain", 100, "u"),
        ],
    ));
    browser.apply_order(SortOrder::Size);
    assert_eq!(names(&browser), vec!["..", "small", "mid", "big"]);

    // The active order survives a listing replacement.
    browser.show_listing(listing(
        "/data",
        vec![entry("z", "text-plain", 1, "u"), entry("a", "text-plain", 2, "u")],
    ));
    assert_eq!(browser.sort_order(), SortOrder::Size);
    assert_eq!(names(&browser), vec!["..", "z", "a"]);
}

#[test]
fn plain_click_replaces_selection_and_ctrl_click_extends_it() {
    let mut browser = FileBrowser::new();
    browser.show_listing(listing(
        "/data",
        vec![
            entry("a", "text-plain", 1, "u"),
            entry("b", "text-plain", 2, "u"),
        ],
    ));

    browser.click("a", false);
    browser.click("b", false);
    assert_eq!(browser.selected_names(), vec!["b"]);

    browser.click("a", false);
    let info = browser.click("b", true);
    assert!(info.is_none());
    assert_eq!(browser.selected_names(), vec!["a", "b"]);

    browser.click("a", true);
    assert_eq!(browser.selected_names(), vec!["b"]);
}

#[test]
fn plain_click_projects_file_info() {
    let mut browser = FileBrowser::new();
    browser.show_listing(listing("/data", vec![entry("x.txt", "text-plain", 2048, "u")]));
    let info = browser.click("x.txt", false).cloned().expect("info");
    assert_eq!(
        info,
        FileInfo {
            name: "x.txt".to_string(),
            size: "2.0 KiB".to_string(),
            mime: "text/plain".to_string(),
        }
    );
}

#[test]
fn parent_row_is_not_selectable() {
    let mut browser = FileBrowser::new();
    browser.show_listing(listing("/data", vec![entry("a", "text-plain", 1, "u")]));
    assert!(browser.click(PARENT_NAME, false).is_none());
    assert!(browser.selected_names().is_empty());
}

#[test]
fn new_listing_clears_selection() {
    let mut browser = FileBrowser::new();
    browser.show_listing(listing("/data", vec![entry("a", "text-plain", 1, "u")]));
    browser.click("a", false);
    browser.show_listing(listing("/data", vec![entry("a", "text-plain", 1, "u")]));
    assert!(!browser.is_selected("a"));
    assert!(browser.info().is_none());
}

#[test]
fn double_click_resolves_directories_symlinks_and_files() {
    let mut link = entry("link", "inode-symlink", 0, "u");
    link.real_path = Some("/data/elsewhere".to_string());
    link.real_type = Some("inode-directory".to_string());
    let mut browser = FileBrowser::new();
    browser.show_listing(listing(
        "/data",
        vec![
            entry("docs", "inode-directory", 4096, "u"),
            link,
            entry("report.pdf", "application-pdf", 10, "u"),
        ],
    ));

    assert_eq!(
        browser.double_click("docs"),
        Some(Activation::ChangeDir {
            path: "/data".to_string(),
            name: "docs".to_string(),
        })
    );
    assert_eq!(
        browser.double_click("link"),
        Some(Activation::ChangeDir {
            path: "/data/elsewhere".to_string(),
            name: String::new(),
        })
    );
    assert!(matches!(
        browser.double_click("report.pdf"),
        Some(Activation::Download(ref e)) if e.name == "report.pdf"
    ));
    assert_eq!(
        browser.double_click(".."),
        Some(Activation::ChangeDir {
            path: "/data".to_string(),
            name: "..".to_string(),
        })
    );
    assert_eq!(browser.double_click("missing"), None);
}

#[test]
fn properties_for_single_selection_use_entry_fields() {
    let mut browser = FileBrowser::new();
    browser.show_listing(listing("/data", vec![entry("a", "text-plain", 2048, "alice")]));
    assert!(browser.properties().is_none());

    browser.click("a", false);
    assert_eq!(
        browser.properties(),
        Some(Properties {
            name: "a".to_string(),
            size: "2.0 KiB (2048 bytes)".to_string(),
            owner: "alice".to_string(),
            mode: "644".to_string(),
        })
    );
}

#[test]
fn properties_aggregate_multiple_selections() {
    let mut browser = FileBrowser::new();
    browser.show_listing(listing(
        "/data",
        vec![
            entry("a", "text-plain", 1024, "alice"),
            entry("b", "text-plain", 1024, "alice"),
            entry("c", "text-plain", 0, "alice"),
            entry("d", "text-plain", 0, "bob"),
        ],
    ));
    browser.click("a", false);
    browser.click("b", true);
    let props = browser.properties().expect("properties");
    assert_eq!(props.name, "a, b");
    assert_eq!(props.size, "2.0 KiB (2048 bytes)");
    assert_eq!(props.owner, "alice");
    assert_eq!(props.mode, "???");

    browser.select_all();
    let props = browser.properties().expect("properties");
    assert_eq!(props.name, "a, b, c, ... (4)");
    assert_eq!(props.owner, "...");
}
