use std::collections::VecDeque;

use shared::{
    domain::{BufferAction, RequestId},
    error::ProtocolError,
    protocol::{
        Action, BufferCount, ClientRequest, Count, Created, Outcome, PathResult,
        ProtocolException, ServerMessage, ServerResponse,
    },
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    browser::{Activation, FileBrowser, FileInfo, Properties, SortOrder},
    config::Endpoints,
    transport::{ReadyState, Transport},
    Dialog, SessionError, SessionEvent, UserCommand, WindowTarget,
};

pub const LOADING_MESSAGE: &str = "Loading";
pub const PASTING_MESSAGE: &str = "Pasting files";
pub const CONNECTION_CLOSED_MESSAGE: &str = "Connection closed";

/// Requests awaiting a response.
///
/// The wire protocol carries no correlation id, so a response is matched to
/// the oldest outstanding request of the same action. Two in-flight requests of
/// the same action cannot be told apart.
#[derive(Debug, Default)]
pub struct PendingRequests {
    next_id: u64,
    queue: VecDeque<(RequestId, Action)>,
}

impl PendingRequests {
    pub fn register(&mut self, action: Action) -> RequestId {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        self.queue.push_back((id, action));
        id
    }

    /// Completes the oldest request for `action`, or the oldest request of any
    /// kind when the response does not name one.
    pub fn complete(&mut self, action: Option<Action>) -> Option<(RequestId, Action)> {
        let position = match action {
            Some(action) => self.queue.iter().position(|(_, pending)| *pending == action)?,
            None if self.queue.is_empty() => return None,
            None => 0,
        };
        self.queue.remove(position)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// One file manager session over one duplex connection.
pub struct FileManagerSession<T: Transport> {
    transport: T,
    endpoints: Endpoints,
    browser: FileBrowser,
    current_path: String,
    pending: PendingRequests,
    events: broadcast::Sender<SessionEvent>,
}

impl<T: Transport> FileManagerSession<T> {
    pub fn new(transport: T, endpoints: Endpoints) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            transport,
            endpoints,
            browser: FileBrowser::new(),
            current_path: String::new(),
            pending: PendingRequests::default(),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn browser(&self) -> &FileBrowser {
        &self.browser
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.transport.ready_state()
    }

    /// Serializes and transmits `request`, opening the waiting gate.
    pub fn send(&mut self, request: ClientRequest) -> Result<RequestId, SessionError> {
        let state = self.transport.ready_state();
        if state.is_closed() {
            self.emit(SessionEvent::Alert(CONNECTION_CLOSED_MESSAGE.to_string()));
            return Err(SessionError::ConnectionClosed);
        }
        if state.is_transitional() {
            debug!(action = %request.action(), ?state, "dropping request while connection is not ready");
            return Err(SessionError::NotReady(state));
        }

        let action = request.action();
        let text = request.encode()?;
        if let Err(err) = self.transport.send_text(text) {
            if self.transport.ready_state().is_closed() {
                self.emit(SessionEvent::Alert(CONNECTION_CLOSED_MESSAGE.to_string()));
            }
            return Err(err.into());
        }
        let id = self.pending.register(action);
        let message = match action {
            Action::PasteFiles => PASTING_MESSAGE,
            _ => LOADING_MESSAGE,
        };
        self.browser.gate_mut().open(message);
        debug!(request_id = id.0, %action, "request sent");
        Ok(id)
    }

    /// Requests the workspace root once the connection opens.
    pub fn on_open(&mut self) -> Result<RequestId, SessionError> {
        info!("connection open, requesting workspace root");
        self.change_dir("", "")
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Decodes one inbound frame and dispatches it.
    pub fn handle_text(&mut self, text: &str) {
        match ServerMessage::decode(text) {
            Ok(message) => self.handle_message(message),
            Err(err) => {
                self.browser.gate_mut().close();
                self.protocol_error(err, text);
            }
        }
    }

    pub fn handle_message(&mut self, message: ServerMessage) {
        self.browser.gate_mut().close();
        self.dispatch(message);
    }

    fn dispatch(&mut self, message: ServerMessage) {
        match self.pending.complete(message.action()) {
            Some((id, action)) => debug!(request_id = id.0, %action, "response received"),
            None => {
                warn!(action = ?message.action(), "response does not match any pending request");
                self.emit(SessionEvent::ProtocolError(format!(
                    "unexpected response for {}",
                    message
                        .action()
                        .map(|action| action.as_str())
                        .unwrap_or("unknown action")
                )));
            }
        }

        match message {
            ServerMessage::Response(response) => self.dispatch_response(response),
            ServerMessage::Exception(exception) => self.on_exception(exception),
        }
    }

    fn dispatch_response(&mut self, response: ServerResponse) {
        match response {
            ServerResponse::Chdir(outcome) => self.on_change_dir(outcome),
            ServerResponse::ListDir(listing) => {
                let dir = listing.dir.clone();
                self.browser.show_listing(listing);
                self.emit(SessionEvent::ListingReplaced {
                    dir,
                    rows: self.browser.rows().len(),
                });
            }
            ServerResponse::CreateDir(outcome) => self.on_created(outcome, Dialog::NewDir),
            ServerResponse::CreateFile(outcome) => self.on_created(outcome, Dialog::NewFile),
            ServerResponse::UpdateBuffer(outcome) => self.on_buffer_updated(outcome),
            ServerResponse::PasteFiles(outcome) => self.on_pasted(outcome),
            ServerResponse::RemoveFiles(outcome) => self.on_removed(outcome),
            ServerResponse::UpdatePerms(outcome) => self.on_perms_updated(outcome),
            ServerResponse::Pwd(outcome) => match outcome {
                Outcome::Done(PathResult { result }) => self.current_path = result,
                Outcome::Failed { error } => self.error_dialog(error),
            },
        }
    }

    fn on_change_dir(&mut self, outcome: Outcome<PathResult>) {
        match outcome {
            Outcome::Done(PathResult { result }) if !result.is_empty() => {
                self.current_path = result.clone();
                self.emit(SessionEvent::Navigated(result.clone()));
                self.follow_up(ClientRequest::ListDir { path: Some(result) });
            }
            Outcome::Done(_) => self.error_dialog("Directory change returned no path".to_string()),
            Outcome::Failed { error } => self.error_dialog(error),
        }
    }

    fn on_created(&mut self, outcome: Outcome<Created>, dialog: Dialog) {
        match outcome {
            Outcome::Failed { error } => self.error_dialog(error),
            Outcome::Done(_) => {
                self.emit(SessionEvent::DialogClosed(dialog));
                self.refresh_listing();
            }
        }
    }

    fn on_buffer_updated(&mut self, outcome: Outcome<BufferCount>) {
        match outcome {
            Outcome::Failed { error } => self.error_dialog(error),
            Outcome::Done(BufferCount { result, action }) => {
                if result > 0 && action != BufferAction::Remove {
                    self.browser.show_paste(result);
                }
                debug!(count = result, action = action.as_str(), "buffer updated");
            }
        }
    }

    fn on_pasted(&mut self, outcome: Outcome<BufferCount>) {
        let BufferCount { result, action } = match outcome {
            Outcome::Failed { error } => return self.error_dialog(error),
            Outcome::Done(count) => count,
        };
        if result == 0 {
            info!("no files were copied or moved");
            return;
        }
        self.refresh_listing();
        match action {
            BufferAction::Cut => {
                self.browser.hide_paste();
                info!(count = result, "moved files");
            }
            BufferAction::Copy => info!(count = result, "copied files"),
            BufferAction::Remove => warn!(count = result, "paste reported a remove buffer"),
        }
    }

    fn on_removed(&mut self, outcome: Outcome<Count>) {
        match outcome {
            Outcome::Failed { error } => self.error_dialog(error),
            Outcome::Done(Count { result }) if result > 0 => {
                self.refresh_listing();
                info!(count = result, "removed files");
            }
            Outcome::Done(_) => info!("no files were removed"),
        }
    }

    fn on_perms_updated(&mut self, outcome: Outcome<Count>) {
        match outcome {
            Outcome::Failed { error } => self.error_dialog(error),
            Outcome::Done(Count { result }) if result > 0 => {
                self.refresh_listing();
                info!(count = result, "updated permissions");
            }
            Outcome::Done(_) => info!("no permissions were changed"),
        }
    }

    fn on_exception(&mut self, exception: ProtocolException) {
        warn!(
            action = ?exception.action,
            exception = %exception.exception,
            "server rejected request"
        );
        self.emit(SessionEvent::ProtocolError(exception.exception));
    }

    pub fn change_dir(&mut self, path: &str, name: &str) -> Result<RequestId, SessionError> {
        self.send(ClientRequest::Chdir {
            path: path.to_string(),
            name: name.to_string(),
        })
    }

    pub fn go_up(&mut self) -> Result<RequestId, SessionError> {
        let path = self.current_path.clone();
        self.change_dir(&path, "..")
    }

    pub fn refresh(&mut self) -> Result<RequestId, SessionError> {
        self.send(self.listing_request())
    }

    pub fn create_dir(&mut self, name: &str) -> Result<RequestId, SessionError> {
        self.send(ClientRequest::CreateDir {
            name: name.to_string(),
        })
    }

    pub fn create_file(&mut self, name: &str) -> Result<RequestId, SessionError> {
        self.send(ClientRequest::CreateFile {
            name: name.to_string(),
        })
    }

    /// Sends the current selection to the server-side buffer.
    pub fn put_to_buffer(&mut self, action: BufferAction) -> Result<RequestId, SessionError> {
        let files = self.browser.selected_names();
        self.send(ClientRequest::UpdateBuffer { files, action })
    }

    pub fn paste(&mut self) -> Result<RequestId, SessionError> {
        self.send(ClientRequest::PasteFiles)
    }

    pub fn remove(&mut self) -> Result<RequestId, SessionError> {
        self.put_to_buffer(BufferAction::Remove)?;
        self.send(ClientRequest::RemoveFiles)
    }

    pub fn update_perms(&mut self, mode: u32, recursive: bool) -> Result<RequestId, SessionError> {
        let files = self.browser.selected_names();
        self.send(ClientRequest::UpdatePerms {
            files,
            mode,
            recursive,
        })
    }

    pub fn pwd(&mut self) -> Result<RequestId, SessionError> {
        self.send(ClientRequest::Pwd)
    }

    pub fn apply_order(&mut self, order: SortOrder) {
        self.browser.apply_order(order);
    }

    pub fn click(&mut self, name: &str, ctrl: bool) -> Result<Option<FileInfo>, SessionError> {
        if self.browser.rows().iter().all(|row| row.name() != name) {
            return Err(SessionError::UnknownEntry(name.to_string()));
        }
        Ok(self.browser.click(name, ctrl).cloned())
    }

    pub fn select_all(&mut self) {
        self.browser.select_all();
    }

    /// Opens a directory or starts a download for a file.
    pub fn double_click(&mut self, name: &str) -> Result<Option<RequestId>, SessionError> {
        match self.browser.double_click(name) {
            Some(Activation::ChangeDir { path, name }) => self.change_dir(&path, &name).map(Some),
            Some(Activation::Download(entry)) => {
                let url = self.endpoints.download_url(&entry)?;
                self.emit(SessionEvent::OpenWindow {
                    target: WindowTarget::Download,
                    url: url.to_string(),
                });
                Ok(None)
            }
            None => Err(SessionError::UnknownEntry(name.to_string())),
        }
    }

    /// Like [`Self::double_click`] but refuses entries that are not directories.
    pub fn enter(&mut self, name: &str) -> Result<RequestId, SessionError> {
        match self.browser.double_click(name) {
            Some(Activation::ChangeDir { path, name }) => self.change_dir(&path, &name),
            Some(Activation::Download(_)) => Err(SessionError::NotADirectory(name.to_string())),
            None => Err(SessionError::UnknownEntry(name.to_string())),
        }
    }

    pub fn show_properties(&mut self) -> Option<Properties> {
        let properties = self.browser.properties()?;
        self.emit(SessionEvent::PropertiesOpened(properties.clone()));
        Some(properties)
    }

    pub fn upload(&mut self) -> Result<(), SessionError> {
        let url = self.endpoints.upload_url()?;
        self.emit(SessionEvent::OpenWindow {
            target: WindowTarget::Upload,
            url: url.to_string(),
        });
        Ok(())
    }

    /// Applies one UI gesture.
    pub fn execute(&mut self, command: UserCommand) -> Result<(), SessionError> {
        match command {
            UserCommand::ChangeDir { path, name } => self.change_dir(&path, &name).map(drop),
            UserCommand::Up => self.go_up().map(drop),
            UserCommand::Refresh => self.refresh().map(drop),
            UserCommand::Open(name) => self.double_click(&name).map(drop),
            UserCommand::Enter(name) => self.enter(&name).map(drop),
            UserCommand::Select { name, ctrl } => self.click(&name, ctrl).map(drop),
            UserCommand::SelectAll => {
                self.select_all();
                Ok(())
            }
            UserCommand::CreateDir(name) => self.create_dir(&name).map(drop),
            UserCommand::CreateFile(name) => self.create_file(&name).map(drop),
            UserCommand::Buffer(action) => self.put_to_buffer(action).map(drop),
            UserCommand::Paste => self.paste().map(drop),
            UserCommand::Remove => self.remove().map(drop),
            UserCommand::Chmod { mode, recursive } => self.update_perms(mode, recursive).map(drop),
            UserCommand::Order(order) => {
                self.apply_order(order);
                Ok(())
            }
            UserCommand::Properties => {
                self.show_properties();
                Ok(())
            }
            UserCommand::Upload => self.upload(),
            UserCommand::Pwd => self.pwd().map(drop),
            UserCommand::Quit => {
                self.close();
                Ok(())
            }
        }
    }

    fn listing_request(&self) -> ClientRequest {
        let path = (!self.current_path.is_empty()).then(|| self.current_path.clone());
        ClientRequest::ListDir { path }
    }

    fn refresh_listing(&mut self) {
        self.follow_up(self.listing_request());
    }

    fn follow_up(&mut self, request: ClientRequest) {
        let action = request.action();
        if let Err(err) = self.send(request) {
            warn!(%action, %err, "follow-up request was not sent");
        }
    }

    fn error_dialog(&mut self, message: String) {
        warn!(%message, "operation failed");
        self.emit(SessionEvent::ErrorDialog(message));
    }

    fn protocol_error(&mut self, err: ProtocolError, text: &str) {
        warn!(%err, frame = text, "dropping undecodable frame");
        self.emit(SessionEvent::ProtocolError(err.to_string()));
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; the projection is still updated.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
