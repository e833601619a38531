//! Per-connection request handling for the file manager protocol.

use std::{
    io,
    path::{Path, PathBuf},
};

use serde_json::Value;
use shared::{
    domain::{BufferAction, DirectoryListing},
    error::ExceptionKind,
    protocol::{
        Action, BufferCount, ClientRequest, Count, Created, Outcome, PathResult,
        ProtocolException, ServerMessage, ServerResponse,
    },
};
use tracing::{debug, warn};

use crate::{
    fs_ops,
    workspace::{base_name, normalize, Workspace},
};

const NO_SUCH_DIRECTORY: &str = "No such directory";
const ACCESS_DENIED: &str = "Access denied";
const INVALID_NAME: &str = "Invalid name";
const CUT_AND_COPY_ONLY: &str = "Cut and copy only";
const WRONG_ACTION: &str = "Wrong action";

#[derive(Debug, Default)]
struct ClipboardBuffer {
    files: Vec<PathBuf>,
    action: Option<BufferAction>,
}

impl ClipboardBuffer {
    fn take(&mut self) -> (Vec<PathBuf>, Option<BufferAction>) {
        (std::mem::take(&mut self.files), self.action.take())
    }
}

/// State owned by one WebSocket connection: the workspace it is confined to,
/// its current directory and its clipboard buffer.
#[derive(Debug)]
pub struct WorkspaceSession {
    workspace: Workspace,
    current_dir: PathBuf,
    buffer: ClipboardBuffer,
}

impl WorkspaceSession {
    pub fn new(workspace: Workspace) -> Self {
        let current_dir = workspace.root().to_path_buf();
        Self {
            workspace,
            current_dir,
            buffer: ClipboardBuffer::default(),
        }
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    /// Decodes one inbound frame and produces the frame to send back.
    pub async fn handle_text(&mut self, text: &str) -> ServerMessage {
        match parse_request(text) {
            Ok(request) => self.execute(request).await.into(),
            Err(exception) => {
                debug!(exception = %exception.exception, "rejected request");
                exception.into()
            }
        }
    }

    pub async fn execute(&mut self, request: ClientRequest) -> ServerResponse {
        debug!(action = %request.action(), "running action");
        match request {
            ClientRequest::Chdir { path, name } => ServerResponse::Chdir(self.chdir(&path, &name).await),
            ClientRequest::ListDir { path } => ServerResponse::ListDir(self.list_dir(path).await),
            ClientRequest::CreateDir { name } => {
                ServerResponse::CreateDir(self.create(name, fs_ops::create_dir).await)
            }
            ClientRequest::CreateFile { name } => {
                ServerResponse::CreateFile(self.create(name, fs_ops::create_file).await)
            }
            ClientRequest::UpdatePerms {
                files,
                mode,
                recursive,
            } => ServerResponse::UpdatePerms(self.update_perms(&files, mode, recursive).await),
            ClientRequest::UpdateBuffer { files, action } => {
                ServerResponse::UpdateBuffer(self.update_buffer(&files, action))
            }
            ClientRequest::PasteFiles => ServerResponse::PasteFiles(self.paste_files().await),
            ClientRequest::RemoveFiles => ServerResponse::RemoveFiles(self.remove_files().await),
            ClientRequest::Pwd => ServerResponse::Pwd(Outcome::Done(PathResult {
                result: display(&self.current_dir),
            })),
        }
    }

    async fn chdir(&mut self, path: &str, name: &str) -> Outcome<PathResult> {
        let target = match self.workspace.confine(&self.workspace.resolve(path, name)).await {
            Ok(Some(target)) => target,
            Ok(None) => return Outcome::failed(ACCESS_DENIED),
            Err(_) => return Outcome::failed(NO_SUCH_DIRECTORY),
        };
        match tokio::fs::metadata(&target).await {
            Ok(metadata) if metadata.is_dir() => {
                self.current_dir = target;
                Outcome::Done(PathResult {
                    result: display(&self.current_dir),
                })
            }
            _ => Outcome::failed(NO_SUCH_DIRECTORY),
        }
    }

    async fn list_dir(&mut self, path: Option<String>) -> DirectoryListing {
        let requested = match path.filter(|path| !path.is_empty()) {
            Some(path) => normalize(Path::new(&path)),
            None => self.current_dir.clone(),
        };
        let denied = |dir: &Path, error: String| DirectoryListing {
            dir: display(dir),
            files: None,
            error: Some(error),
        };
        if !self.workspace.contains(&requested) {
            return denied(&requested, ACCESS_DENIED.to_string());
        }
        let dir = match self.workspace.confine(&requested).await {
            Ok(Some(dir)) => dir,
            Ok(None) => return denied(&requested, ACCESS_DENIED.to_string()),
            Err(err) => return denied(&requested, error_text(&err)),
        };
        match fs_ops::list_files(&dir).await {
            Ok(files) => {
                self.current_dir = dir;
                DirectoryListing {
                    dir: display(&self.current_dir),
                    files: Some(files),
                    error: None,
                }
            }
            Err(err) => {
                warn!(dir = %dir.display(), %err, "listing failed");
                DirectoryListing {
                    dir: display(&dir),
                    files: None,
                    error: Some(error_text(&err)),
                }
            }
        }
    }

    async fn create(
        &self,
        name: String,
        create: fn(&Path, &str) -> io::Result<()>,
    ) -> Outcome<Created> {
        let Some(name) = base_name(&name).map(str::to_string) else {
            return Outcome::failed(INVALID_NAME);
        };
        let dir = self.current_dir.clone();
        match blocking(move || create(&dir, &name)).await {
            Ok(()) => Outcome::Done(Created { result: true }),
            Err(err) => Outcome::failed(error_text(&err)),
        }
    }

    fn update_buffer(&mut self, files: &[String], action: BufferAction) -> Outcome<BufferCount> {
        self.buffer.files = self.in_current_dir(files);
        self.buffer.action = Some(action);
        Outcome::Done(BufferCount {
            result: self.buffer.files.len() as u64,
            action,
        })
    }

    async fn paste_files(&mut self) -> Outcome<BufferCount> {
        let destination = self.current_dir.clone();
        match self.buffer.action {
            Some(BufferAction::Cut) => {
                let (files, _) = self.buffer.take();
                let moved = blocking(move || Ok(fs_ops::move_files(&files, &destination))).await;
                batch_outcome(moved, BufferAction::Cut)
            }
            Some(BufferAction::Copy) => {
                let files = self.buffer.files.clone();
                let copied = blocking(move || Ok(fs_ops::copy_files(&files, &destination))).await;
                batch_outcome(copied, BufferAction::Copy)
            }
            _ => Outcome::failed(CUT_AND_COPY_ONLY),
        }
    }

    async fn remove_files(&mut self) -> Outcome<Count> {
        if self.buffer.action != Some(BufferAction::Remove) {
            return Outcome::failed(WRONG_ACTION);
        }
        let (files, _) = self.buffer.take();
        match blocking(move || Ok(fs_ops::remove_files(&files))).await {
            Ok(result) => Outcome::Done(Count { result }),
            Err(err) => Outcome::failed(error_text(&err)),
        }
    }

    async fn update_perms(&self, files: &[String], mode: u32, recursive: bool) -> Outcome<Count> {
        let files = self.in_current_dir(files);
        match blocking(move || Ok(fs_ops::chmod_files(&files, mode & 0o7777, recursive))).await {
            Ok(result) => Outcome::Done(Count { result }),
            Err(err) => Outcome::failed(error_text(&err)),
        }
    }

    fn in_current_dir(&self, files: &[String]) -> Vec<PathBuf> {
        files
            .iter()
            .filter_map(|file| base_name(file))
            .map(|name| self.current_dir.join(name))
            .collect()
    }
}

/// Maps a raw frame to a request, or to the exception frame the client gets
/// back when the frame is not a usable request.
pub fn parse_request(text: &str) -> Result<ClientRequest, ProtocolException> {
    let value: Value = serde_json::from_str(text)
        .map_err(|_| ProtocolException::new(None, ExceptionKind::InvalidJson))?;
    let Some(tag) = value.get("do") else {
        return Err(ProtocolException::new(None, ExceptionKind::NoAction));
    };
    let action = tag
        .as_str()
        .ok_or(ExceptionKind::UnknownAction)
        .and_then(str::parse::<Action>)
        .map_err(|kind| ProtocolException::new(None, kind))?;
    serde_json::from_value(value)
        .map_err(|_| ProtocolException::new(Some(action), ExceptionKind::NotEnoughData))
}

async fn blocking<T, F>(work: F) -> io::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(io::Error::other)?
}

fn batch_outcome(count: io::Result<u64>, action: BufferAction) -> Outcome<BufferCount> {
    match count {
        Ok(result) => Outcome::Done(BufferCount { result, action }),
        Err(err) => Outcome::failed(error_text(&err)),
    }
}

/// Message text without the `(os error N)` suffix std appends.
fn error_text(err: &io::Error) -> String {
    let text = err.to_string();
    match text.find(" (os error") {
        Some(cut) => text[..cut].to_string(),
        None => text,
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
