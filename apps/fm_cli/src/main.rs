use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    connect, load_settings, Endpoints, FileManagerSession, SessionEvent, Transport, UserCommand,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast, mpsc},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{parse_command, CommandError};

/// Terminal front-end for a workspace file manager.
#[derive(Parser, Debug)]
struct Args {
    /// Server base URL; overrides fm.toml and FM_SERVER_URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Workspace owner; overrides fm.toml and FM_USER.
    #[arg(long)]
    user: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(user) = args.user {
        settings.user = user;
    }

    let endpoints = Endpoints::from_settings(&settings)?;
    let (transport, mut inbound) = connect(endpoints.ws_url())
        .await
        .with_context(|| format!("failed to reach {}", settings.server_url))?;
    info!(user = %settings.user, url = %endpoints.ws_url(), "connected");

    let mut session = FileManagerSession::new(transport, endpoints);
    tokio::spawn(print_events(session.subscribe_events()));

    let (command_tx, mut command_rx) = mpsc::channel(16);
    tokio::spawn(read_commands(command_tx));

    let mut last_view = String::new();
    client_core::run(&mut session, &mut inbound, &mut command_rx, |session| {
        let view = render(session);
        if view != last_view {
            print!("{view}");
            last_view = view;
        }
    })
    .await;

    Ok(())
}

async fn read_commands(commands: mpsc::Sender<UserCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("type `help` for commands");
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                eprintln!("stdin: {err}");
                break;
            }
        };
        match parse_command(&line) {
            Ok(Some(command)) => {
                if commands.send(command).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(CommandError::Help) => println!("{}", commands::HELP),
            Err(err) => eprintln!("{err}"),
        }
    }
    debug!("command input closed");
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "event printer lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        match event {
            SessionEvent::Alert(message) => eprintln!("! {message}"),
            SessionEvent::ErrorDialog(message) => eprintln!("error: {message}"),
            SessionEvent::OpenWindow { target, url } => println!("{target:?}: {url}"),
            SessionEvent::PropertiesOpened(props) => println!(
                "name: {}\nsize: {}\nowner: {}\nmode: {}",
                props.name, props.size, props.owner, props.mode
            ),
            SessionEvent::ProtocolError(message) => eprintln!("protocol: {message}"),
            SessionEvent::Navigated(_)
            | SessionEvent::ListingReplaced { .. }
            | SessionEvent::DialogClosed(_) => {}
        }
    }
}

fn render<T: Transport>(session: &FileManagerSession<T>) -> String {
    let browser = session.browser();
    let mut out = String::new();

    if browser.gate().is_open() {
        let _ = writeln!(out, "[{}...]", browser.gate().message());
        return out;
    }
    let Some(dir) = browser.dir() else {
        return out;
    };
    let _ = writeln!(out, "\n{dir}");
    for row in browser.rows() {
        let marker = if browser.is_selected(row.name()) { '*' } else { ' ' };
        let _ = writeln!(out, " {marker} {:<40} {:>12}", row.name(), row.size_label());
    }
    if let Some(message) = browser.message() {
        let _ = writeln!(out, "   {message}");
    }
    if let Some(file) = browser.info() {
        let _ = writeln!(out, "-- {} ({}, {})", file.name, file.size, file.mime);
    }
    if browser.paste_visible() {
        let _ = writeln!(out, "-- clipboard: {} file(s), `paste` to drop here", browser.buffer_count());
    }
    out
}
