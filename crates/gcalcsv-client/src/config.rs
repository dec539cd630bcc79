//! Client configuration.
//!
//! Settings can live in an optional `config.toml` file at
//! `~/.config/gcalcsv/config.toml` by default:
//!
//! ```toml
//! [google]
//! credentials_file = "/home/me/.config/gcalcsv/credentials.json"
//! token_file = "/home/me/.config/gcalcsv/token.json"
//! calendar_id = "primary"
//!
//! [fetch]
//! timeout_secs = 10
//! limit = 250
//! ```
//!
//! Command-line flags win over the file, which wins over built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gcalcsv_core::WindowInputs;
use gcalcsv_providers::google::GoogleConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{ClientError, ClientResult};

/// Default client secret file.
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// Default deadline for the whole event traversal, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default cap on written rows.
pub const DEFAULT_LIMIT: usize = 250;

// ---------------------------------------------------------------------------
// FileConfig (config.toml)
// ---------------------------------------------------------------------------

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Google Calendar settings.
    pub google: GoogleSettings,

    /// Fetch settings.
    pub fetch: FetchSettings,
}

/// `[google]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoogleSettings {
    /// Path to the OAuth client secret file.
    pub credentials_file: Option<PathBuf>,

    /// Path to the cached credential.
    pub token_file: Option<PathBuf>,

    /// Calendar to read.
    pub calendar_id: Option<String>,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSettings {
    /// Deadline for the whole traversal, in seconds.
    pub timeout_secs: Option<u64>,

    /// Maximum rows to write; 0 disables the cap.
    pub limit: Option<usize>,
}

impl FileConfig {
    /// Loads configuration from the default path, if the file exists.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcalcsv")
    }
}

// ---------------------------------------------------------------------------
// ExportConfig (resolved)
// ---------------------------------------------------------------------------

/// Everything one export run needs, after merging flags, file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Unresolved window bounds and offsets.
    pub window: WindowInputs,
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
    pub calendar_id: String,
    /// Deadline for the traversal; also the per-request HTTP timeout.
    pub timeout: Duration,
    /// Row cap; `None` means unlimited.
    pub limit: Option<usize>,
    /// Try to open the authorization page in a browser.
    pub open_browser: bool,
}

impl ExportConfig {
    /// Merges command-line flags over the file configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero timeout or an empty calendar
    /// id.
    pub fn resolve(cli: &Cli, file: &FileConfig) -> ClientResult<Self> {
        let mut window = WindowInputs::new();
        window.start = cli.start.clone();
        window.end = cli.end.clone();
        if let Some(from) = cli.from {
            window.from = from;
        }
        if let Some(to) = cli.to {
            window.to = to;
        }

        let credentials_file = cli
            .credentials
            .clone()
            .or_else(|| file.google.credentials_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE));
        let token_file = cli
            .token
            .clone()
            .or_else(|| file.google.token_file.clone())
            .unwrap_or_else(|| PathBuf::from(GoogleConfig::DEFAULT_TOKEN_FILE));
        let calendar_id = cli
            .calendar
            .clone()
            .or_else(|| file.google.calendar_id.clone())
            .unwrap_or_else(|| GoogleConfig::DEFAULT_CALENDAR_ID.to_string());

        if calendar_id.trim().is_empty() {
            return Err(ClientError::Config(
                "calendar id must not be empty".to_string(),
            ));
        }

        let timeout_secs = cli
            .timeout
            .or(file.fetch.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ClientError::Config(
                "timeout must be greater than zero".to_string(),
            ));
        }

        let limit = match cli.limit.or(file.fetch.limit).unwrap_or(DEFAULT_LIMIT) {
            0 => None,
            n => Some(n),
        };

        Ok(Self {
            window,
            credentials_file,
            token_file,
            calendar_id,
            timeout: Duration::from_secs(timeout_secs),
            limit,
            open_browser: !cli.no_browser,
        })
    }
}
