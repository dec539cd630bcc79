//! Application secret and provider settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// Google's OAuth authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google's OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Redirect used when the credentials file does not list one.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost";

/// The registered OAuth application ("client secret").
///
/// Users create their own application in the Google Cloud Console and
/// download it as `credentials.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    /// Consent page.
    pub auth_uri: String,
    /// Code exchange and refresh endpoint.
    pub token_uri: String,
    /// Registered redirect URIs, in file order.
    pub redirect_uris: Vec<String>,
}

/// On-disk layout of a client secret file.
///
/// Console downloads nest the application under `installed` (desktop apps)
/// or `web`; some tools write `client_id`/`client_secret` at the top level.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretSection>,
    web: Option<ClientSecretSection>,
    #[serde(flatten)]
    top_level: TopLevelSecret,
}

#[derive(Debug, Deserialize)]
struct ClientSecretSection {
    client_id: String,
    client_secret: String,
    auth_uri: Option<String>,
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TopLevelSecret {
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl OAuthCredentials {
    /// Credentials against Google's standard endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_uri: GOOGLE_AUTH_URL.to_string(),
            token_uri: GOOGLE_TOKEN_URL.to_string(),
            redirect_uris: Vec::new(),
        }
    }

    /// Reads a client secret file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "unable to read client secret file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses the contents of a client secret file.
    ///
    /// `installed` wins over `web`, which wins over top-level fields.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("unable to parse client secret file: {}", e))
        })?;

        if let Some(section) = file.installed.or(file.web) {
            let defaults = Self::new(section.client_id, section.client_secret);
            return Ok(Self {
                auth_uri: section.auth_uri.unwrap_or(defaults.auth_uri),
                token_uri: section.token_uri.unwrap_or(defaults.token_uri),
                redirect_uris: section.redirect_uris,
                ..defaults
            });
        }

        match file.top_level {
            TopLevelSecret {
                client_id: Some(id),
                client_secret: Some(secret),
            } => Ok(Self::new(id, secret)),
            _ => Err(ProviderError::configuration(
                "client secret file has no 'installed' or 'web' application \
                 and no top-level client_id/client_secret",
            )),
        }
    }

    /// Redirect URI sent with the authorization request: the first
    /// registered one, or `http://localhost`.
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_REDIRECT_URI)
    }

    /// Checks that nothing required is blank.
    pub fn validate(&self) -> Result<(), &'static str> {
        let blank = [
            (self.client_id.as_str(), "client_id is empty"),
            (self.client_secret.as_str(), "client_secret is empty"),
            (self.auth_uri.as_str(), "auth_uri is empty"),
            (self.token_uri.as_str(), "token_uri is empty"),
        ];
        match blank.iter().find(|(value, _)| value.trim().is_empty()) {
            Some((_, reason)) => Err(*reason),
            None => Ok(()),
        }
    }
}

/// Everything needed to authorize and list events for one calendar.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,

    /// Path of the cached bearer credential.
    ///
    /// Defaults to `token.json` in the working directory.
    pub token_path: PathBuf,

    /// Calendar to list events from. Defaults to `"primary"`.
    pub calendar_id: String,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,

    /// Scopes requested for new credentials. A cached credential missing any
    /// of them is re-authorized.
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    /// Default per-request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read-only calendar access.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    /// Default token cache file.
    pub const DEFAULT_TOKEN_FILE: &'static str = "token.json";

    /// Default calendar.
    pub const DEFAULT_CALENDAR_ID: &'static str = "primary";

    /// Defaults for everything but the application secret.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: PathBuf::from(Self::DEFAULT_TOKEN_FILE),
            calendar_id: Self::DEFAULT_CALENDAR_ID.to_string(),
            request_timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
        }
    }

    /// Sets the token path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the calendar to read.
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Rejects settings that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid client secret: {}", e))?;

        if self.calendar_id.trim().is_empty() {
            return Err("calendar id must not be empty".to_string());
        }
        if self.token_path.as_os_str().is_empty() {
            return Err("token path must not be empty".to_string());
        }
        if self.request_timeout.is_zero() {
            return Err("request timeout must be greater than zero".to_string());
        }
        if self.scopes.is_empty() {
            return Err("no OAuth scope requested".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INSTALLED_JSON: &str = r#"{
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "project_id": "calendar-export",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "s3cret",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn parse_installed_credentials() {
        let creds = OAuthCredentials::from_json(INSTALLED_JSON).unwrap();
        assert_eq!(creds.client_id, "123.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "s3cret");
        assert_eq!(creds.token_uri, GOOGLE_TOKEN_URL);
        assert_eq!(creds.redirect_uri(), "http://localhost");
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn parse_web_credentials_with_custom_endpoints() {
        let json = r#"{
            "web": {
                "client_id": "abc",
                "client_secret": "def",
                "token_uri": "https://example.test/token",
                "redirect_uris": ["http://127.0.0.1:8080/callback", "http://localhost"]
            }
        }"#;
        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.token_uri, "https://example.test/token");
        assert_eq!(creds.auth_uri, GOOGLE_AUTH_URL);
        assert_eq!(creds.redirect_uri(), "http://127.0.0.1:8080/callback");
    }

    #[test]
    fn parse_flat_credentials() {
        let json = r#"{"client_id": "abc", "client_secret": "def"}"#;
        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "abc");
        assert_eq!(creds.redirect_uri(), DEFAULT_REDIRECT_URI);
    }

    #[test]
    fn reject_credentials_without_client() {
        let err = OAuthCredentials::from_json(r#"{"other": 1}"#).unwrap_err();
        assert_eq!(
            err.code(),
            crate::error::ProviderErrorCode::Configuration
        );
    }

    #[test]
    fn reject_malformed_json() {
        assert!(OAuthCredentials::from_json("{not json").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INSTALLED_JSON.as_bytes()).unwrap();
        let creds = OAuthCredentials::from_file(file.path()).unwrap();
        assert_eq!(creds.client_secret, "s3cret");
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = OAuthCredentials::from_file(dir.path().join("credentials.json")).unwrap_err();
        assert!(err.message().contains("unable to read client secret file"));
    }

    #[test]
    fn config_defaults_and_validation() {
        let config = GoogleConfig::new(OAuthCredentials::new("id", "secret"));
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.token_path, PathBuf::from("token.json"));
        assert_eq!(config.scopes, vec![GoogleConfig::DEFAULT_SCOPE.to_string()]);
        assert!(config.validate().is_ok());

        let config = config.with_calendar_id("  ");
        assert!(config.validate().is_err());

        let config = GoogleConfig::new(OAuthCredentials::new("", "secret"));
        assert!(config.validate().unwrap_err().contains("client_id"));
    }
}
