//! OAuth token storage.
//!
//! The cached bearer credential lives in a single JSON file (`token.json` by
//! default). The layout uses the same keys as the token files written by the
//! common Go and Python OAuth2 libraries, so an existing cache can be reused.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Tokens are treated as expired this long before their real expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// The cached bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Sent as `Authorization: Bearer` on API calls.
    pub access_token: String,

    /// The token type, normally `Bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Long-lived token used to mint new access tokens without the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access token expiry, stored under the `expiry` key.
    #[serde(rename = "expiry", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scopes; empty when the file did not record them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,

    /// When the tokens were last obtained or refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<DateTime<Utc>>,
}

impl TokenInfo {
    /// Builds a credential from a token endpoint response received now.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token,
            expires_at: expires_in_secs.map(|secs| now + Duration::seconds(secs)),
            scopes,
            last_refresh: Some(now),
        }
    }

    /// True when the access token expires within the next minute.
    ///
    /// A missing expiry, or the zero timestamp (`0001-01-01T00:00:00Z`) that
    /// Go writes for "no expiry", never expires.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if the access token is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) if expires_at.year() > 1 => {
                now + Duration::seconds(EXPIRY_SKEW_SECS) >= expires_at
            }
            _ => false,
        }
    }

    /// True when every `required` scope was granted.
    ///
    /// Tokens loaded from files that do not record scopes are assumed to
    /// carry whatever was requested when they were issued.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        self.scopes.is_empty() || required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Returns true if the token can be refreshed without user interaction.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Applies a refresh response.
    ///
    /// The refresh token is only replaced when the server issued a new one.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) {
        let now = Utc::now();
        self.access_token = access_token.into();
        if let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = Some(refresh_token);
        }
        self.expires_at = expires_in_secs.map(|secs| now + Duration::seconds(secs));
        self.last_refresh = Some(now);
    }
}

/// File-backed credential cache.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached credential.
    ///
    /// # Errors
    ///
    /// Returns a missing-credential error when no file exists and a configuration
    /// error when the file cannot be read or decoded.
    pub fn load(&self) -> ProviderResult<TokenInfo> {
        let file = File::open(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ProviderError::missing_credential(format!(
                    "no token file at {}",
                    self.path.display()
                ))
            } else {
                ProviderError::configuration(format!(
                    "failed to read token file {}: {}",
                    self.path.display(),
                    e
                ))
                .with_source(e)
            }
        })?;

        let tokens: TokenInfo = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token file {}: {}",
                self.path.display(),
                e
            ))
            .with_source(e)
        })?;

        debug!("loaded tokens from {:?}", self.path);
        Ok(tokens)
    }

    /// Saves the credential, replacing any previous file.
    ///
    /// The data is written to a sibling temporary file created with owner-only
    /// permissions and then renamed over the target.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be created or written.
    pub fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("unable to create {}: {}", parent.display(), e))
                    .with_source(e)
            })?;
        }

        let temp_path = self.temp_path();
        let write_result = Self::write_restricted(&temp_path, tokens);
        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            ProviderError::configuration(format!("unable to cache oauth token: {}", e))
                .with_source(e)
        })?;

        info!("saved credential file to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "token.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_restricted(path: &Path, tokens: &TokenInfo) -> ProviderResult<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = options.open(path).map_err(|e| {
            ProviderError::configuration(format!("unable to cache oauth token: {}", e))
                .with_source(e)
        })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, tokens)
            .map_err(|e| ProviderError::internal(format!("unable to encode credential: {}", e)))?;
        writer
            .flush()
            .and_then(|()| writer.get_ref().sync_all())
            .map_err(|e| {
                ProviderError::configuration(format!("unable to cache oauth token: {}", e))
                    .with_source(e)
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_token() -> TokenInfo {
        TokenInfo {
            access_token: "access-token".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("refresh-token".to_string()),
            expires_at: Some(Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap()),
            scopes: vec!["scope1".to_string()],
            last_refresh: Some(Utc.with_ymd_and_hms(2029, 12, 31, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn new_credential_is_fresh() {
        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            vec!["scope1".to_string()],
        );

        assert_eq!(token.access_token, "access-token");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());
        assert!(token.can_refresh());
    }

    #[test]
    fn expiry_with_skew() {
        let mut token = TokenInfo::new("access", None, Some(3600), vec![]);
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());

        // Within the skew window counts as expired
        token.expires_at = Some(Utc::now() + Duration::seconds(10));
        assert!(token.is_expired());
    }

    #[test]
    fn token_without_expiry_never_expires() {
        let mut token = TokenInfo::new("access", None, None, vec![]);
        assert!(!token.is_expired());

        token.expires_at = Some(Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap());
        assert!(!token.is_expired());
    }

    #[test]
    fn granted_scopes() {
        let token = TokenInfo::new(
            "access",
            None,
            None,
            vec!["scope1".to_string(), "scope2".to_string()],
        );

        assert!(token.has_scopes(&["scope1".to_string()]));
        assert!(token.has_scopes(&["scope1".to_string(), "scope2".to_string()]));
        assert!(!token.has_scopes(&["scope3".to_string()]));

        let unscoped = TokenInfo::new("access", None, None, vec![]);
        assert!(unscoped.has_scopes(&["scope3".to_string()]));
    }

    #[test]
    fn apply_refresh_keeps_refresh_token() {
        let mut token = sample_token();
        token.apply_refresh("new-access", None, Some(3600));
        assert_eq!(token.access_token, "new-access");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-token"));
        assert!(!token.is_expired());

        token.apply_refresh("newer-access", Some("rotated".to_string()), None);
        assert_eq!(token.refresh_token.as_deref(), Some("rotated"));
        assert!(token.expires_at.is_none());
    }

    #[test]
    fn token_storage_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("token.json"));
        let token = sample_token();

        storage.save(&token).unwrap();
        assert!(storage.path().exists());

        let loaded = TokenStorage::new(storage.path()).load().unwrap();
        assert_eq!(loaded, token);
    }

    #[test]
    fn token_storage_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("token.json"));

        storage.save(&sample_token()).unwrap();
        let mut updated = sample_token();
        updated.access_token = "second".to_string();
        storage.save(&updated).unwrap();

        assert_eq!(storage.load().unwrap().access_token, "second");
        assert!(!dir.path().join("token.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn token_storage_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("token.json"));
        storage.save(&sample_token()).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn token_storage_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("nested").join("token.json"));
        storage.save(&sample_token()).unwrap();
        assert!(storage.path().exists());
    }

    #[test]
    fn load_without_file_is_missing_credential() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("token.json"));
        let err = storage.load().unwrap_err();
        assert!(err.is_missing_credential());
    }

    #[test]
    fn token_storage_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{ definitely not json").unwrap();

        let err = TokenStorage::new(&path).load().unwrap_err();
        assert!(!err.is_missing_credential());
        assert!(err.message().contains("failed to parse token file"));
    }

    #[test]
    fn token_storage_reads_go_style_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(
            &path,
            r#"{"access_token":"ya29.a0","token_type":"Bearer","refresh_token":"1//0g","expiry":"2024-03-15T10:20:30.123456789+01:00"}"#,
        )
        .unwrap();

        let token = TokenStorage::new(&path).load().unwrap();
        assert_eq!(token.access_token, "ya29.a0");
        assert_eq!(token.refresh_token.as_deref(), Some("1//0g"));
        let expiry = token.expires_at.unwrap();
        assert_eq!(
            expiry.timestamp(),
            Utc.with_ymd_and_hms(2024, 3, 15, 9, 20, 30).unwrap().timestamp()
        );
        assert!(token.scopes.is_empty());
    }
}
