use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub workspace_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            workspace_base: "./data/workspaces".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file_settings(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("FM_SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Ok(v) = std::env::var("FM_WORKSPACE_BASE") {
        settings.workspace_base = v;
    }
    if let Ok(v) = std::env::var("APP__WORKSPACE_BASE") {
        settings.workspace_base = v;
    }

    settings
}

fn apply_file_settings(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("workspace_base") {
        settings.workspace_base = v.clone();
    }
}

/// Creates the directory holding per-user workspaces and returns its
/// canonical path.
pub fn prepare_workspace_base(raw_workspace_base: &str) -> anyhow::Result<PathBuf> {
    let base = normalize_workspace_base(raw_workspace_base);
    fs::create_dir_all(&base).with_context(|| {
        format!(
            "failed to create workspace base directory '{}'",
            base.display()
        )
    })?;
    fs::canonicalize(&base)
        .with_context(|| format!("failed to resolve workspace base '{}'", base.display()))
}

fn normalize_workspace_base(raw_workspace_base: &str) -> PathBuf {
    let raw_workspace_base = raw_workspace_base.trim();
    if raw_workspace_base.is_empty() {
        return PathBuf::from(Settings::default().workspace_base);
    }
    Path::new(&raw_workspace_base.replace('\\', "/")).to_path_buf()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
