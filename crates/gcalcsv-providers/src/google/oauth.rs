//! OAuth 2.0 authorization-code exchange for Google APIs.
//!
//! The flow is the copy/paste variant for command-line tools:
//!
//! 1. Generate a PKCE code verifier, its SHA-256 challenge and a random state
//! 2. Build the authorization URL (offline access so a refresh token is issued)
//! 3. The user opens it, grants access and pastes back the code, or the whole
//!    URL the browser was redirected to
//! 4. Exchange the code (with the verifier) for access and refresh tokens
//!
//! Expired access tokens are renewed through the same token endpoint with the
//! refresh token.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::page::BoxFuture;

use super::auth::TokenExchanger;
use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::TokenInfo;

/// Random bytes behind the PKCE verifier (43 characters once encoded).
const VERIFIER_BYTES: usize = 32;

/// Random bytes behind the `state` parameter.
const STATE_BYTES: usize = 16;

/// OAuth client for Google APIs.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    scopes: Vec<String>,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the HTTP client cannot be built.
    pub fn new(
        credentials: OAuthCredentials,
        scopes: Vec<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            credentials,
            scopes,
            http_client,
        })
    }

    /// Creates an OAuth client from the provider configuration.
    pub fn from_config(config: &GoogleConfig) -> ProviderResult<Self> {
        Self::new(
            config.credentials.clone(),
            config.scopes.clone(),
            config.request_timeout,
        )
    }

    /// Builds the URL the user must visit to grant access.
    pub fn authorization_url(&self, pkce: &PkceFlow) -> String {
        pkce.build_auth_url(
            &self.credentials.auth_uri,
            &self.credentials.client_id,
            self.credentials.redirect_uri(),
            &self.scopes,
        )
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> ProviderResult<TokenInfo> {
        let grant = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", self.credentials.redirect_uri()),
        ];
        let response = self.post_token_request(&grant, "code exchange").await?;
        info!("authorization code exchanged for a new credential");
        let scopes = response.granted_scopes().unwrap_or_else(|| self.scopes.clone());
        let mut tokens = TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes,
        );
        if let Some(token_type) = response.token_type {
            tokens.token_type = token_type;
        }
        Ok(tokens)
    }

    /// Refreshes an expired access token using the refresh token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> ProviderResult<TokenResponse> {
        let grant = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let response = self.post_token_request(&grant, "token refresh").await?;
        info!("access token refreshed");
        Ok(response)
    }

    /// Posts `grant` together with the client credentials to the token
    /// endpoint.
    async fn post_token_request(
        &self,
        grant: &[(&str, &str)],
        operation: &str,
    ) -> ProviderResult<TokenResponse> {
        let mut form = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);
        debug!("{} at {}", operation, self.credentials.token_uri);

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("{} request failed: {}", operation, e))
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("unable to read {} response: {}", operation, e))
        })?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} rejected ({}): {}",
                operation,
                status,
                describe_token_error(&body)
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })
    }
}

/// Error body of the token endpoint (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    error_description: Option<String>,
}

fn describe_token_error(body: &str) -> String {
    match serde_json::from_str::<TokenErrorBody>(body) {
        Ok(TokenErrorBody {
            error,
            error_description: Some(description),
        }) => format!("{}: {}", error, description),
        Ok(TokenErrorBody { error, .. }) => error,
        Err(_) => body.trim().to_string(),
    }
}

impl TokenExchanger for OAuthClient {
    fn scopes(&self) -> &[String] {
        &self.scopes
    }

    fn authorization_url(&self, pkce: &PkceFlow) -> String {
        OAuthClient::authorization_url(self, pkce)
    }

    fn exchange_code<'a>(
        &'a self,
        code: &'a str,
        pkce: &'a PkceFlow,
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(self.exchange_authorization_code(code, &pkce.verifier))
    }

    fn refresh<'a>(&'a self, token: &'a TokenInfo) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(async move {
            let refresh_token = token
                .refresh_token
                .as_deref()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    ProviderError::authentication("no refresh token - re-authentication required")
                })?;

            let response = self.refresh_access_token(refresh_token).await?;
            let mut refreshed = token.clone();
            refreshed.apply_refresh(
                response.access_token,
                response.refresh_token,
                response.expires_in,
            );
            Ok(refreshed)
        })
    }
}

/// Extracts the authorization code from what the user typed.
///
/// Accepts the bare code, a percent-encoded code, or the full URL the browser
/// was redirected to. When a URL carries a `state` it must match
/// `expected_state`.
///
/// # Errors
///
/// Returns an authentication error for empty input, a denied authorization,
/// a state mismatch or a URL without a code.
pub fn parse_authorization_input(input: &str, expected_state: &str) -> ProviderResult<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ProviderError::authentication("no authorization code entered"));
    }

    if let Ok(url) = url::Url::parse(input) {
        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(ProviderError::authentication(format!(
                "authorization denied: {}",
                error
            )));
        }
        if let Some(state) = state
            && state != expected_state
        {
            return Err(ProviderError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            ));
        }
        return code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::authentication("missing authorization code in URL"));
    }

    Ok(urlencoding::decode(input)
        .map(|code| code.into_owned())
        .unwrap_or_else(|_| input.to_string()))
}

/// Per-authorization secrets: the RFC 7636 verifier and its S256
/// challenge, plus the anti-forgery `state`.
///
/// A fresh value is made for every interactive authorization.
#[derive(Debug, Clone)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        Self::from_verifier(random_url_safe(VERIFIER_BYTES), random_url_safe(STATE_BYTES))
    }

    fn from_verifier(verifier: String, state: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Builds the consent page URL for an offline (refreshable) grant.
    ///
    /// Parameters are appended to any query `auth_uri` already carries.
    pub fn build_auth_url(
        &self,
        auth_uri: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        let query = [
            ("client_id", client_id.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
            ("response_type", "code".to_string()),
            ("scope", scopes.join(" ")),
            ("code_challenge", self.challenge.clone()),
            ("code_challenge_method", "S256".to_string()),
            ("state", self.state.clone()),
            ("access_type", "offline".to_string()),
            ("prompt", "consent".to_string()),
        ]
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

        let separator = if auth_uri.contains('?') { '&' } else { '?' };
        format!("{auth_uri}{separator}{query}")
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// `len` random bytes, base64url encoded without padding.
fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Space-separated scopes actually granted.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    fn granted_scopes(&self) -> Option<Vec<String>> {
        let scope = self.scope.as_deref()?;
        let scopes: Vec<String> = scope.split_whitespace().map(String::from).collect();
        (!scopes.is_empty()).then_some(scopes)
    }
}
