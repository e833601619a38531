use shared::{domain::BufferAction, error::ProtocolError};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub mod browser;
pub mod config;
pub mod session;
pub mod transport;

pub use browser::{FileBrowser, FileInfo, Properties, Row, SortOrder};
pub use config::{load_settings, ClientSettings, EndpointError, Endpoints};
pub use session::FileManagerSession;
pub use transport::{connect, ReadyState, Transport, TransportError, WsInbound, WsTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTarget {
    Upload,
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    NewDir,
    NewFile,
}

/// Side effects a front-end reacts to; the rest of the view is read from the
/// session's [`FileBrowser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Alert(String),
    ErrorDialog(String),
    OpenWindow { target: WindowTarget, url: String },
    Navigated(String),
    ListingReplaced { dir: String, rows: usize },
    DialogClosed(Dialog),
    PropertiesOpened(Properties),
    ProtocolError(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("connection is not ready ({0:?})")]
    NotReady(ReadyState),
    #[error("no entry named {0:?} in the current listing")]
    UnknownEntry(String),
    #[error("{0:?} is not a directory")]
    NotADirectory(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// UI gestures accepted by [`FileManagerSession::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    ChangeDir { path: String, name: String },
    Up,
    Refresh,
    Open(String),
    Enter(String),
    Select { name: String, ctrl: bool },
    SelectAll,
    CreateDir(String),
    CreateFile(String),
    Buffer(BufferAction),
    Paste,
    Remove,
    Chmod { mode: u32, recursive: bool },
    Order(SortOrder),
    Properties,
    Upload,
    Pwd,
    Quit,
}

/// Drives a session until the connection closes or the command stream ends.
///
/// Inbound frames and user commands are handled one at a time; `render` runs
/// after each of them.
pub async fn run<T, F>(
    session: &mut FileManagerSession<T>,
    inbound: &mut WsInbound,
    commands: &mut mpsc::Receiver<UserCommand>,
    mut render: F,
) where
    T: Transport,
    F: FnMut(&FileManagerSession<T>),
{
    if let Err(err) = session.on_open() {
        warn!(%err, "failed to request workspace root");
    }
    render(session);

    loop {
        tokio::select! {
            frame = inbound.next_text() => match frame {
                Some(text) => session.handle_text(&text),
                None => {
                    info!(state = ?session.ready_state(), "connection ended");
                    break;
                }
            },
            command = commands.recv() => match command {
                None | Some(UserCommand::Quit) => {
                    session.close();
                    break;
                }
                Some(command) => {
                    if let Err(err) = session.execute(command) {
                        warn!(%err, "command failed");
                    }
                }
            },
        }
        render(session);
    }
}
