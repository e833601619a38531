use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{BufferAction, DirectoryListing},
    error::{ExceptionKind, ProtocolError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Chdir,
    ListDir,
    CreateDir,
    CreateFile,
    UpdatePerms,
    UpdateBuffer,
    PasteFiles,
    RemoveFiles,
    Pwd,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Chdir,
        Action::ListDir,
        Action::CreateDir,
        Action::CreateFile,
        Action::UpdatePerms,
        Action::UpdateBuffer,
        Action::PasteFiles,
        Action::RemoveFiles,
        Action::Pwd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chdir => "chdir",
            Self::ListDir => "list_dir",
            Self::CreateDir => "create_dir",
            Self::CreateFile => "create_file",
            Self::UpdatePerms => "update_perms",
            Self::UpdateBuffer => "update_buffer",
            Self::PasteFiles => "paste_files",
            Self::RemoveFiles => "remove_files",
            Self::Pwd => "pwd",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ExceptionKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or(ExceptionKind::UnknownAction)
    }
}

/// Client to server frame. The `do` field selects the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "do", rename_all = "snake_case")]
pub enum ClientRequest {
    Chdir {
        path: String,
        name: String,
    },
    ListDir {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    CreateDir {
        name: String,
    },
    CreateFile {
        name: String,
    },
    UpdatePerms {
        files: Vec<String>,
        mode: u32,
        #[serde(default)]
        recursive: bool,
    },
    UpdateBuffer {
        files: Vec<String>,
        action: BufferAction,
    },
    PasteFiles,
    RemoveFiles,
    Pwd,
}

impl ClientRequest {
    pub fn action(&self) -> Action {
        match self {
            Self::Chdir { .. } => Action::Chdir,
            Self::ListDir { .. } => Action::ListDir,
            Self::CreateDir { .. } => Action::CreateDir,
            Self::CreateFile { .. } => Action::CreateFile,
            Self::UpdatePerms { .. } => Action::UpdatePerms,
            Self::UpdateBuffer { .. } => Action::UpdateBuffer,
            Self::PasteFiles => Action::PasteFiles,
            Self::RemoveFiles => Action::RemoveFiles,
            Self::Pwd => Action::Pwd,
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Either an operation error reported by the backend or the typed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Failed { error: String },
    Done(T),
}

impl<T> Outcome<T> {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathResult {
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub result: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub result: u64,
}

/// Count of affected files tagged with the clipboard action that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferCount {
    pub result: u64,
    pub action: BufferAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "response", rename_all = "snake_case")]
pub enum ServerResponse {
    Chdir(Outcome<PathResult>),
    ListDir(DirectoryListing),
    CreateDir(Outcome<Created>),
    CreateFile(Outcome<Created>),
    UpdatePerms(Outcome<Count>),
    UpdateBuffer(Outcome<BufferCount>),
    PasteFiles(Outcome<BufferCount>),
    RemoveFiles(Outcome<Count>),
    Pwd(Outcome<PathResult>),
}

impl ServerResponse {
    pub fn action(&self) -> Action {
        match self {
            Self::Chdir(_) => Action::Chdir,
            Self::ListDir(_) => Action::ListDir,
            Self::CreateDir(_) => Action::CreateDir,
            Self::CreateFile(_) => Action::CreateFile,
            Self::UpdatePerms(_) => Action::UpdatePerms,
            Self::UpdateBuffer(_) => Action::UpdateBuffer,
            Self::PasteFiles(_) => Action::PasteFiles,
            Self::RemoveFiles(_) => Action::RemoveFiles,
            Self::Pwd(_) => Action::Pwd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolException {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    pub exception: String,
}

impl ProtocolException {
    pub fn new(action: Option<Action>, kind: ExceptionKind) -> Self {
        Self {
            action,
            exception: kind.message().to_string(),
        }
    }
}

/// Server to client frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Response(ServerResponse),
    Exception(ProtocolException),
}

impl ServerMessage {
    pub fn action(&self) -> Option<Action> {
        match self {
            Self::Response(response) => Some(response.action()),
            Self::Exception(exception) => exception.action,
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;
        serde_json::from_value(value).map_err(ProtocolError::SchemaMismatch)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

impl From<ServerResponse> for ServerMessage {
    fn from(value: ServerResponse) -> Self {
        Self::Response(value)
    }
}

impl From<ProtocolException> for ServerMessage {
    fn from(value: ProtocolException) -> Self {
        Self::Exception(value)
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
