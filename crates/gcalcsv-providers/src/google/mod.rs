//! Google Calendar provider implementation.
//!
//! # Authentication Flow
//!
//! 1. User provides their own OAuth client ID/secret (`credentials.json`)
//! 2. A cached credential in `token.json` is reused while it is valid
//! 3. An expired credential is refreshed once through the token endpoint
//! 4. Otherwise the authorization URL (with PKCE challenge) is shown and the
//!    user pastes back the code or the redirected address
//! 5. The code is exchanged for access and refresh tokens, which are
//!    persisted for future runs
//!
//! # Example
//!
//! ```ignore
//! use gcalcsv_providers::google::{
//!     ConsolePrompt, CredentialProvider, EventQuery, GoogleCalendarClient, GoogleConfig,
//!     OAuthClient, OAuthCredentials, TokenStorage,
//! };
//!
//! let config = GoogleConfig::new(OAuthCredentials::from_file("credentials.json")?);
//! let provider = CredentialProvider::new(
//!     TokenStorage::new(&config.token_path),
//!     OAuthClient::from_config(&config)?,
//! );
//! let token = provider.obtain(&mut ConsolePrompt::stdio()).await?;
//!
//! let client = GoogleCalendarClient::new(token.access_token, config.request_timeout)?;
//! let mut pages = client.event_pages(EventQuery::new(config.calendar_id, window));
//! ```

mod auth;
mod client;
mod config;
mod oauth;
mod tokens;

pub use auth::{AuthorizationPrompt, ConsolePrompt, CredentialProvider, TokenExchanger};
pub use client::{EventQuery, GoogleCalendarClient, GoogleEventPages};
pub use config::{
    DEFAULT_REDIRECT_URI, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GoogleConfig, OAuthCredentials,
};
pub use oauth::{OAuthClient, PkceFlow, TokenResponse, parse_authorization_input};
pub use tokens::{TokenInfo, TokenStorage};
