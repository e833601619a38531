use super::*;
use crate::{config::Endpoints, session::FileManagerSession, UserCommand};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use std::{net::SocketAddr, time::Duration};
use tokio::net::TcpListener;

const CHDIR_REPLY: &str = r#"{"action":"chdir","response":{"result":"/srv/alice"}}"#;
const LIST_REPLY: &str = r#"{"action":"list_dir","response":{"dir":"/srv/alice","files":[
    {"name":"x.txt","type":"text-plain","size":2048,"owner":"1000","mode":"644","path":"/srv/alice"}
]}}"#;

async fn ws_upgrade(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(answer_requests)
}

async fn answer_requests(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        let reply = match message {
            WsMessage::Text(text) if text.contains(r#""do":"chdir""#) => CHDIR_REPLY,
            WsMessage::Text(text) if text.contains(r#""do":"list_dir""#) => LIST_REPLY,
            WsMessage::Text(_) => r#"{"exception":"Unknown action"}"#,
            WsMessage::Close(_) => break,
            _ => continue,
        };
        if socket.send(WsMessage::Text(reply.to_string())).await.is_err() {
            break;
        }
    }
}

async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route("/ws", get(ws_upgrade));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

#[tokio::test]
async fn exchanges_text_frames_and_rejects_sends_after_close() {
    let addr = spawn_server().await;
    let url = Url::parse(&format!("ws://{addr}/ws?user=alice")).expect("url");
    let (mut transport, mut inbound) = connect(&url).await.expect("connect");
    assert_eq!(transport.ready_state(), ReadyState::Open);

    transport
        .send_text(r#"{"do":"chdir","path":"","name":""}"#.to_string())
        .expect("send");
    let reply = tokio::time::timeout(Duration::from_secs(5), inbound.next_text())
        .await
        .expect("reply in time")
        .expect("frame");
    assert_eq!(reply, CHDIR_REPLY);

    transport.close();
    assert!(matches!(
        transport.ready_state(),
        ReadyState::Closing | ReadyState::Closed
    ));
    let err = transport
        .send_text("{}".to_string())
        .expect_err("should fail");
    assert!(matches!(err, TransportError::NotOpen(_)));
}

#[tokio::test]
async fn connect_fails_when_nothing_listens() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}/ws")).expect("url");
    assert!(connect(&url).await.is_err());
}

#[tokio::test]
async fn run_loop_lists_workspace_root_then_quits() {
    let addr = spawn_server().await;
    let endpoints = Endpoints::new(&format!("http://{addr}"), "alice").expect("endpoints");
    let (transport, mut inbound) = connect(endpoints.ws_url()).await.expect("connect");
    let mut session = FileManagerSession::new(transport, endpoints);
    let (command_tx, mut command_rx) = tokio::sync::mpsc::channel(8);

    let quit_tx = command_tx.clone();
    let mut renders = 0;
    tokio::time::timeout(
        Duration::from_secs(5),
        crate::run(&mut session, &mut inbound, &mut command_rx, |session| {
            renders += 1;
            if !session.browser().rows().is_empty() {
                let _ = quit_tx.try_send(UserCommand::Quit);
            }
        }),
    )
    .await
    .expect("loop finished in time");

    assert!(renders >= 3);
    assert_eq!(session.current_path(), "/srv/alice");
    let names: Vec<&str> = session.browser().rows().iter().map(|row| row.name()).collect();
    assert_eq!(names, vec!["..", "x.txt"]);
    assert!(!session.browser().gate().is_open());
    drop(command_tx);
}
