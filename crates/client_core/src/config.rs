use std::{collections::HashMap, fs};

use serde::Deserialize;
use shared::domain::DirectoryEntry;
use thiserror::Error;
use url::Url;

const SETTINGS_FILE: &str = "fm.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    pub server_url: String,
    pub user: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            user: "guest".into(),
        }
    }
}

pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("server_url") {
                settings.server_url = v.clone();
            }
            if let Some(v) = file_cfg.get("user") {
                settings.user = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("FM_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("FM_USER") {
        settings.user = v;
    }

    settings
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("server_url must start with http:// or https://")]
    UnsupportedScheme,
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("server url cannot carry a path")]
    CannotBeABase,
}

/// URLs derived from the server base: the duplex endpoint plus the upload and
/// download windows that sit outside the duplex protocol.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    ws: Url,
    user: String,
}

impl Endpoints {
    pub fn new(server_url: &str, user: &str) -> Result<Self, EndpointError> {
        let server_url = server_url.trim_end_matches('/');
        let ws_url = if server_url.starts_with("https://") {
            server_url.replacen("https://", "wss://", 1)
        } else if server_url.starts_with("http://") {
            server_url.replacen("http://", "ws://", 1)
        } else {
            return Err(EndpointError::UnsupportedScheme);
        };
        let mut ws = Url::parse(&format!("{ws_url}/ws"))?;
        ws.query_pairs_mut().append_pair("user", user);
        Ok(Self {
            base: Url::parse(&format!("{server_url}/"))?,
            ws,
            user: user.to_string(),
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, EndpointError> {
        Self::new(&settings.server_url, &settings.user)
    }

    pub fn ws_url(&self) -> &Url {
        &self.ws
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn download_url(&self, entry: &DirectoryEntry) -> Result<Url, EndpointError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| EndpointError::CannotBeABase)?
            .pop_if_empty()
            .push("download")
            .extend(entry.path.split('/').filter(|segment| !segment.is_empty()))
            .push(&entry.name);
        url.query_pairs_mut().append_pair("user", &self.user);
        Ok(url)
    }

    pub fn upload_url(&self) -> Result<Url, EndpointError> {
        let mut url = self.base.join("upload")?;
        url.query_pairs_mut().append_pair("user", &self.user);
        Ok(url)
    }
}
