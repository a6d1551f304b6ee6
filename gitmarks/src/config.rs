//! User configuration.
//!
//! Read once at startup from `$XDG_CONFIG_HOME/gitmarks/config.toml`
//! (`~/.config/gitmarks/config.toml` when the variable is unset). A missing
//! file means defaults; a malformed one is logged and also means defaults,
//! so a typo never prevents startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_USER_POLL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the GitMarks API.
    pub api_url: String,
    /// Raw `Cookie` header value carrying the session, e.g. `jwt_cookie=...`.
    pub session_cookie: Option<String>,
    pub theme: String,
    /// Where tracing output goes; the terminal belongs to the UI.
    pub log_file: PathBuf,
    /// Draft database location.
    pub drafts_db: PathBuf,
    /// Interval between current-user revalidations.
    pub user_poll_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data = data_dir();
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            session_cookie: None,
            theme: "dark".to_owned(),
            log_file: data.join("gitmarks.log"),
            drafts_db: data.join("drafts.db"),
            user_poll_secs: DEFAULT_USER_POLL_SECS,
        }
    }
}

fn home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    std::env::var(var)
        .ok()
        .map(PathBuf::from)
        .or_else(|| home().map(|h| h.join(fallback)))
        .unwrap_or_else(|| PathBuf::from(fallback))
}

/// `$XDG_CONFIG_HOME/gitmarks/config.toml`.
pub fn config_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config").join("gitmarks").join("config.toml")
}

/// `$XDG_DATA_HOME/gitmarks`, home of the draft store and log file.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share").join("gitmarks")
}

/// Loads the config at `path`, falling back to defaults.
///
/// Returns the config and, when the file existed but could not be used, a
/// message worth surfacing once logging is up.
pub fn load(path: &Path) -> (Config, Option<String>) {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return (Config::default(), None),
    };
    match toml::from_str(&raw) {
        Ok(config) => (config, None),
        Err(err) => (
            Config::default(),
            Some(format!("config parse error in {}: {err}", path.display())),
        ),
    }
}
