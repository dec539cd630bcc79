//! Credential acquisition.
//!
//! [`CredentialProvider::obtain`] returns a usable bearer credential, in order
//! of preference:
//!
//! 1. the cached credential, if it is fresh and carries the requested scopes
//! 2. the cached credential refreshed through the token endpoint
//! 3. a new credential from the interactive copy/paste authorization flow
//!
//! Steps 2 and 3 persist the result. Nothing is retried: a failed refresh or
//! exchange is returned to the caller as is.

use std::io::{self, BufRead, BufReader, Stderr, Stdin, Write};

use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::page::BoxFuture;

use super::oauth::{PkceFlow, parse_authorization_input};
use super::tokens::{TokenInfo, TokenStorage};

/// The token endpoint operations the provider depends on.
pub trait TokenExchanger: Send + Sync {
    /// Scopes requested for new credentials.
    fn scopes(&self) -> &[String];

    /// Builds the URL the user must visit to grant access.
    fn authorization_url(&self, pkce: &PkceFlow) -> String;

    /// Exchanges an authorization code for a credential.
    fn exchange_code<'a>(
        &'a self,
        code: &'a str,
        pkce: &'a PkceFlow,
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>>;

    /// Returns a refreshed copy of `token`.
    fn refresh<'a>(&'a self, token: &'a TokenInfo) -> BoxFuture<'a, ProviderResult<TokenInfo>>;
}

/// Asks a human for the authorization code.
pub trait AuthorizationPrompt {
    /// Shows `auth_url` and returns one line of user input.
    fn request_code(&mut self, auth_url: &str) -> ProviderResult<String>;
}

/// Console prompt: prints the URL and reads a single line.
#[derive(Debug)]
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
    open_browser: bool,
}

impl<R, W> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            open_browser: false,
        }
    }

    /// Also try to open the URL in the default browser.
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }
}

impl ConsolePrompt<BufReader<Stdin>, Stderr> {
    /// Prompt on stderr, reading from stdin. Stdout is left to the caller.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stderr())
    }
}

impl<R: BufRead, W: Write> AuthorizationPrompt for ConsolePrompt<R, W> {
    fn request_code(&mut self, auth_url: &str) -> ProviderResult<String> {
        if self.open_browser
            && let Err(e) = open::that(auth_url)
        {
            debug!("failed to open browser: {}", e);
        }

        let prompt_error = |e: io::Error| {
            ProviderError::internal(format!("unable to show authorization prompt: {}", e))
                .with_source(e)
        };
        writeln!(
            self.output,
            "Go to the following link in your browser, then type the authorization code \
             or paste the address you were redirected to:\n\n{}\n",
            auth_url
        )
        .map_err(prompt_error)?;
        write!(self.output, "Authorization code: ").map_err(prompt_error)?;
        self.output.flush().map_err(prompt_error)?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(|e| {
            ProviderError::authentication(format!("unable to read authorization code: {}", e))
                .with_source(e)
        })?;
        if read == 0 {
            return Err(ProviderError::authentication(
                "unable to read authorization code: end of input",
            ));
        }
        Ok(line)
    }
}

/// Produces a valid credential from the cache, a refresh or the user.
#[derive(Debug)]
pub struct CredentialProvider<E> {
    storage: TokenStorage,
    exchanger: E,
}

impl<E: TokenExchanger> CredentialProvider<E> {
    pub fn new(storage: TokenStorage, exchanger: E) -> Self {
        Self { storage, exchanger }
    }

    /// Returns the backing credential store.
    pub fn storage(&self) -> &TokenStorage {
        &self.storage
    }

    /// Returns a usable credential, prompting only when the cache cannot help.
    ///
    /// # Errors
    ///
    /// Returns an authentication error when the refresh or the interactive
    /// exchange fails, and a configuration error when the credential cannot
    /// be persisted.
    pub async fn obtain<P>(&self, prompt: &mut P) -> ProviderResult<TokenInfo>
    where
        P: AuthorizationPrompt + ?Sized,
    {
        match self.storage.load() {
            Ok(token) if !token.has_scopes(self.exchanger.scopes()) => {
                info!("cached credential lacks the requested scopes, re-authorizing");
            }
            Ok(token) if !token.is_expired() => {
                debug!("using cached credential from {}", self.storage.path().display());
                return Ok(token);
            }
            Ok(token) if token.can_refresh() => {
                info!("cached credential expired, refreshing");
                let refreshed = self.exchanger.refresh(&token).await?;
                self.storage.save(&refreshed)?;
                return Ok(refreshed);
            }
            Ok(_) => {
                info!("cached credential expired and has no refresh token");
            }
            Err(e) if e.is_missing_credential() => {
                info!("no cached credential at {}", self.storage.path().display());
            }
            Err(e) => {
                warn!("ignoring unusable cached credential: {}", e);
            }
        }

        let token = self.authorize_interactively(prompt).await?;
        self.storage.save(&token)?;
        Ok(token)
    }

    async fn authorize_interactively<P>(&self, prompt: &mut P) -> ProviderResult<TokenInfo>
    where
        P: AuthorizationPrompt + ?Sized,
    {
        let pkce = PkceFlow::new();
        let auth_url = self.exchanger.authorization_url(&pkce);
        debug!("authorization URL: {}", auth_url);

        let input = prompt.request_code(&auth_url)?;
        let code = parse_authorization_input(&input, &pkce.state)?;

        info!("received authorization code, exchanging for tokens...");
        self.exchanger.exchange_code(&code, &pkce).await
    }
}
