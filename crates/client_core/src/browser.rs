//! In-memory projection of the file manager view: rows, selection, sort order,
//! clipboard controls and the waiting gate.

use std::{cmp::Ordering, collections::HashSet};

use shared::domain::{DirectoryEntry, DirectoryListing};

pub const PARENT_NAME: &str = "..";
pub const EMPTY_DIRECTORY_MESSAGE: &str = "Empty directory";
const SIZE_UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Formats a byte count with base-1024 units and one decimal.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0.0 B".to_string();
    }
    let exponent = (bytes.ilog(1024) as usize).min(SIZE_UNITS.len() - 1);
    let scaled = bytes as f64 / 1024f64.powi(exponent as i32);
    format!("{scaled:.1} {}", SIZE_UNITS[exponent])
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Name,
    Size,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Parent,
    Entry(DirectoryEntry),
}

impl Row {
    pub fn name(&self) -> &str {
        match self {
            Self::Parent => PARENT_NAME,
            Self::Entry(entry) => &entry.name,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Self::Parent => 0,
            Self::Entry(entry) => entry.size,
        }
    }

    pub fn size_label(&self) -> String {
        match self {
            Self::Parent => String::new(),
            Self::Entry(entry) => format_size(entry.size),
        }
    }

    pub fn entry(&self) -> Option<&DirectoryEntry> {
        match self {
            Self::Parent => None,
            Self::Entry(entry) => Some(entry),
        }
    }
}

/// Short summary shown after a plain click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: String,
    pub mime: String,
}

impl From<&DirectoryEntry> for FileInfo {
    fn from(entry: &DirectoryEntry) -> Self {
        Self {
            name: entry.name.clone(),
            size: format_size(entry.size),
            mime: entry
                .mime
                .clone()
                .unwrap_or_else(|| entry.kind.replacen('-', "/", 1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Properties {
    pub name: String,
    pub size: String,
    pub owner: String,
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitingGate {
    open: bool,
    message: String,
}

impl WaitingGate {
    pub fn open(&mut self, message: impl Into<String>) {
        self.open = true;
        self.message = message.into();
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of double-clicking a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    ChangeDir { path: String, name: String },
    Download(DirectoryEntry),
}

#[derive(Debug, Default)]
pub struct FileBrowser {
    dir: Option<String>,
    rows: Vec<Row>,
    selection: HashSet<String>,
    sort_order: SortOrder,
    message: Option<String>,
    info: Option<FileInfo>,
    paste_visible: bool,
    buffer_count: u64,
    gate: WaitingGate,
}

impl FileBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current listing wholesale.
    pub fn show_listing(&mut self, listing: DirectoryListing) {
        self.rows.clear();
        self.clear_selection();
        self.info = None;
        self.message = None;
        self.dir = Some(listing.dir.clone());

        if let Some(error) = listing.error {
            self.message = Some(error);
            return;
        }

        if !listing.is_root() {
            self.rows.push(Row::Parent);
        }
        let files = listing.files.unwrap_or_default();
        if files.is_empty() {
            self.message = Some(EMPTY_DIRECTORY_MESSAGE.to_string());
        }
        self.rows.extend(files.into_iter().map(Row::Entry));
        self.apply_order(self.sort_order);
    }

    pub fn apply_order(&mut self, order: SortOrder) {
        self.sort_order = order;
        // The parent row stays pinned first; sort_by is stable for equal keys.
        let start = usize::from(matches!(self.rows.first(), Some(Row::Parent)));
        self.rows[start..].sort_by(|a, b| compare_rows(a, b, order));
    }

    /// Plain click selects only `name`; ctrl-click toggles it.
    pub fn click(&mut self, name: &str, ctrl: bool) -> Option<&FileInfo> {
        let entry = self.find_entry(name)?.clone();
        if ctrl {
            if !self.selection.remove(name) {
                self.selection.insert(entry.name);
            }
            return None;
        }
        self.selection.clear();
        self.selection.insert(entry.name.clone());
        self.info = Some(FileInfo::from(&entry));
        self.info.as_ref()
    }

    pub fn double_click(&self, name: &str) -> Option<Activation> {
        if name == PARENT_NAME {
            let has_parent = matches!(self.rows.first(), Some(Row::Parent));
            return has_parent.then(|| Activation::ChangeDir {
                path: self.dir.clone().unwrap_or_default(),
                name: PARENT_NAME.to_string(),
            });
        }
        let entry = self.find_entry(name)?;
        if entry.is_directory() {
            Some(Activation::ChangeDir {
                path: entry.path.clone(),
                name: entry.name.clone(),
            })
        } else if entry.links_to_directory() {
            Some(Activation::ChangeDir {
                path: entry.real_path.clone().unwrap_or_default(),
                name: String::new(),
            })
        } else {
            Some(Activation::Download(entry.clone()))
        }
    }

    pub fn select_all(&mut self) {
        self.selection = self
            .rows
            .iter()
            .filter_map(Row::entry)
            .map(|entry| entry.name.clone())
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected entries in display order.
    pub fn selected_entries(&self) -> Vec<&DirectoryEntry> {
        self.rows
            .iter()
            .filter_map(Row::entry)
            .filter(|entry| self.selection.contains(&entry.name))
            .collect()
    }

    pub fn selected_names(&self) -> Vec<String> {
        self.selected_entries()
            .into_iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selection.contains(name)
    }

    pub fn properties(&self) -> Option<Properties> {
        let selected = self.selected_entries();
        match selected.as_slice() {
            [] => None,
            [entry] => Some(Properties {
                name: entry.name.clone(),
                size: format!("{} ({} bytes)", format_size(entry.size), entry.size),
                owner: entry.owner.clone(),
                mode: entry.mode.clone(),
            }),
            entries => {
                let total = entries.len();
                let total_size: u64 = entries.iter().map(|entry| entry.size).sum();
                let mut name = entries
                    .iter()
                    .take(3)
                    .map(|entry| entry.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                if total > 3 {
                    name.push_str(&format!(", ... ({total})"));
                }
                let first_owner = &entries[0].owner;
                let owner = if entries.iter().all(|entry| &entry.owner == first_owner) {
                    first_owner.clone()
                } else {
                    "...".to_string()
                };
                Some(Properties {
                    name,
                    size: format!("{} ({total_size} bytes)", format_size(total_size)),
                    owner,
                    mode: "???".to_string(),
                })
            }
        }
    }

    pub fn show_paste(&mut self, count: u64) {
        self.paste_visible = true;
        self.buffer_count = count;
    }

    pub fn hide_paste(&mut self) {
        self.paste_visible = false;
    }

    pub fn paste_visible(&self) -> bool {
        self.paste_visible
    }

    pub fn buffer_count(&self) -> u64 {
        self.buffer_count
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn dir(&self) -> Option<&str> {
        self.dir.as_deref()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn info(&self) -> Option<&FileInfo> {
        self.info.as_ref()
    }

    pub fn gate(&self) -> &WaitingGate {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut WaitingGate {
        &mut self.gate
    }

    fn find_entry(&self, name: &str) -> Option<&DirectoryEntry> {
        self.rows
            .iter()
            .filter_map(Row::entry)
            .find(|entry| entry.name == name)
    }
}

fn compare_rows(a: &Row, b: &Row, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
        SortOrder::Size => a.size().cmp(&b.size()),
    }
}

#[cfg(test)]
#[path = "tests/browser_tests.rs"]
mod tests;
