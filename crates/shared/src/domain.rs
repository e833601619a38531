use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);
    };
}

id_newtype!(RequestId);

/// MIME-like tag the backend reports for directories.
pub const DIRECTORY_TYPE: &str = "inode-directory";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferAction {
    Cut,
    Copy,
    Remove,
}

impl BufferAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cut => "cut",
            Self::Copy => "copy",
            Self::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    #[serde(default, alias = "owner_name")]
    pub owner: String,
    #[serde(default)]
    pub mode: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_type: Option<String>,
}

impl DirectoryEntry {
    pub fn is_directory(&self) -> bool {
        self.kind == DIRECTORY_TYPE
    }

    /// True for symlinks whose target resolves to a directory.
    pub fn links_to_directory(&self) -> bool {
        self.real_type.as_deref() == Some(DIRECTORY_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<DirectoryEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DirectoryListing {
    pub fn is_root(&self) -> bool {
        self.dir == "/"
    }
}
