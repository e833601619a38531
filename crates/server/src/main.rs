use std::{
    net::SocketAddr,
    path::{Path as FsPath, PathBuf},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{ws::WebSocket, DefaultBodyLimit, Path, Query, State, WebSocketUpgrade},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

mod actions;
mod config;
mod fs_ops;
mod workspace;

use actions::WorkspaceSession;
use config::{load_settings, prepare_workspace_base};
use workspace::{base_name, is_valid_user, Workspace};

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const NO_FILE_SELECTED: &str = "No file selected";
const UPLOADED: &str = "File uploaded successfully";

#[derive(Clone)]
struct AppState {
    workspace_base: PathBuf,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user: String,
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    user: String,
    filename: Option<String>,
}

type HttpError = (StatusCode, String);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let workspace_base = prepare_workspace_base(&settings.workspace_base).map_err(|error| {
        error!(
            workspace_base = %settings.workspace_base,
            %error,
            "failed to prepare workspace base; verify the directory is writable"
        );
        error
    })?;

    let app = build_router(Arc::new(AppState { workspace_base }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "file manager listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .route("/download/*path", get(download_file))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn open_workspace(state: &AppState, user: &str) -> Result<Workspace, HttpError> {
    if !is_valid_user(user) {
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()));
    }
    Workspace::open(&state.workspace_base, user)
        .await
        .map_err(|e| {
            error!(%user, error = %e, "failed to open workspace");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, HttpError> {
    let workspace = open_workspace(&state, &q.user).await?;
    info!(user = %q.user, root = %workspace.root().display(), "file manager connection");
    Ok(ws.on_upgrade(move |socket| ws_connection(socket, WorkspaceSession::new(workspace))))
}

async fn ws_connection(socket: WebSocket, mut session: WorkspaceSession) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();

    while let Some(Ok(message)) = receiver.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let reply = match session.handle_text(&text).await.encode() {
            Ok(reply) => reply,
            Err(err) => {
                warn!(%err, "failed to encode reply");
                continue;
            }
        };
        if sender.send(Message::Text(reply)).await.is_err() {
            break;
        }
    }
    debug!(dir = %session.current_dir().display(), "file manager connection closed");
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(q): Query<UserQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let workspace = open_workspace(&state, &q.user).await?;
    let not_found = || (StatusCode::NOT_FOUND, "file not found".to_string());

    let requested = FsPath::new("/").join(path);
    let resolved = tokio::fs::canonicalize(&requested)
        .await
        .map_err(|_| not_found())?;
    if !workspace.contains(&resolved) || !resolved.is_file() {
        return Err(not_found());
    }
    let contents = tokio::fs::read(&resolved).await.map_err(|e| {
        warn!(path = %resolved.display(), error = %e, "download failed");
        not_found()
    })?;

    let mut headers = HeaderMap::new();
    let content_type = mime_guess::from_path(&resolved).first_or_octet_stream();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type.essence_str())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if let Some(filename) = resolved.file_name().and_then(|name| name.to_str()) {
        if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
    }

    Ok((StatusCode::OK, headers, contents))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Result<&'static str, HttpError> {
    let filename = q.filename.as_deref().map(str::trim).and_then(base_name);
    let Some(filename) = filename.filter(|_| !body.is_empty()) else {
        return Err((StatusCode::BAD_REQUEST, NO_FILE_SELECTED.to_string()));
    };

    let workspace = open_workspace(&state, &q.user).await?;
    let target = workspace.root().join(filename);
    tokio::fs::write(&target, &body).await.map_err(|e| {
        warn!(path = %target.display(), error = %e, "upload failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    info!(user = %q.user, path = %target.display(), bytes = body.len(), "file uploaded");
    Ok(UPLOADED)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
