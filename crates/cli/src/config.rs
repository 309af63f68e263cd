//! `statescope.toml`: optional settings shared by every subcommand.
//!
//! # Example
//!
//! ```toml
//! [server]
//! port = 8080
//! bind = "127.0.0.1"
//! rate_limit = 120
//! api_key = "local-dev-key"
//!
//! [history]
//! dir = "./histories"
//!
//! [logging]
//! level = "debug"
//! json = false
//! ```
//!
//! Precedence, lowest first: built-in defaults, the file, environment
//! (`STATESCOPE_API_KEY`, `STATESCOPE_RATE_LIMIT`), command-line flags.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub(crate) const DEFAULT_PORT: u16 = 8080;
pub(crate) const DEFAULT_BIND: &str = "0.0.0.0";
/// Requests per minute per client IP.
pub(crate) const DEFAULT_RATE_LIMIT: u64 = 60;
pub(crate) const DEFAULT_HISTORY_DIR: &str = "histories";
pub(crate) const DEFAULT_CONFIG_FILE: &str = "statescope.toml";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub server: ServerSection,
    pub history: HistorySection,
    pub logging: LoggingSection,
}

/// `[server]`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerSection {
    pub port: u16,
    pub bind: String,
    pub rate_limit: u64,
    /// None disables authentication.
    pub api_key: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            rate_limit: DEFAULT_RATE_LIMIT,
            api_key: None,
        }
    }
}

/// `[history]`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct HistorySection {
    /// Directory of exported execution histories.
    pub dir: PathBuf,
}

impl Default for HistorySection {
    fn default() -> Self {
        HistorySection {
            dir: PathBuf::from(DEFAULT_HISTORY_DIR),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LoggingSection {
    /// EnvFilter directive, e.g. `info` or `statescope_replay=trace`.
    pub level: Option<String>,
    pub json: bool,
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load configuration.
///
/// An explicit `path` must exist. Without one, `statescope.toml` in the
/// working directory is used if present, else the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config, String> {
    let mut config = match path {
        Some(p) => read_config(p)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                read_config(default_path)?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env(|name| std::env::var(name).ok())?;
    Ok(config)
}

pub(crate) fn read_config(path: &Path) -> Result<Config, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    parse_config(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

pub(crate) fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

impl Config {
    /// Apply environment overrides read through `var`.
    pub(crate) fn apply_env(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), String> {
        if let Some(key) = var("STATESCOPE_API_KEY") {
            // An empty key turns authentication off.
            self.server.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(raw) = var("STATESCOPE_RATE_LIMIT") {
            self.server.rate_limit = raw
                .parse::<u64>()
                .map_err(|_| format!("STATESCOPE_RATE_LIMIT must be an integer, got '{}'", raw))?;
        }
        Ok(())
    }
}
