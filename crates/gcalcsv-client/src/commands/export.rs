//! The export command: window, credential, pages, CSV.

use std::io;

use chrono::Utc;
use gcalcsv_core::{QueryWindow, resolve_window};
use gcalcsv_providers::google::{
    ConsolePrompt, CredentialProvider, EventQuery, GoogleCalendarClient, GoogleConfig,
    OAuthClient, OAuthCredentials, TokenInfo, TokenStorage,
};
use tracing::{debug, info};

use crate::collector::{CollectionCounters, PageCollector};
use crate::config::ExportConfig;
use crate::error::{ClientError, ClientResult};
use crate::signal::{CancelSignal, spawn_interrupt_listener};
use crate::writer::RecordWriter;

/// Runs one export and writes the rows to stdout.
///
/// The window is validated before the credential files are touched, so a bad
/// date never triggers network traffic or an authorization prompt.
pub async fn run(config: ExportConfig) -> ClientResult<CollectionCounters> {
    let window = resolve_window(&config.window, Utc::now())?;
    debug!(
        "resolved window {} -> {}",
        window.time_min(),
        window.time_max()
    );

    let google = google_config(&config)?;
    let token = obtain_credential(&google, config.open_browser).await?;

    let client = GoogleCalendarClient::new(token.access_token, google.request_timeout)
        .map_err(ClientError::Transport)?;
    let counters = collect(&client, &google, window, &config).await?;

    info!(
        "exported {} items from {} pages of calendar {}",
        counters.items, counters.pages, google.calendar_id
    );
    Ok(counters)
}

fn google_config(config: &ExportConfig) -> ClientResult<GoogleConfig> {
    let credentials = OAuthCredentials::from_file(&config.credentials_file)
        .map_err(|e| ClientError::Config(e.message().to_string()))?;

    let google = GoogleConfig::new(credentials)
        .with_token_path(config.token_file.clone())
        .with_calendar_id(config.calendar_id.clone())
        .with_request_timeout(config.timeout);
    google.validate().map_err(ClientError::Config)?;
    Ok(google)
}

async fn obtain_credential(google: &GoogleConfig, open_browser: bool) -> ClientResult<TokenInfo> {
    let exchanger = OAuthClient::from_config(google).map_err(ClientError::from_auth)?;
    let provider = CredentialProvider::new(TokenStorage::new(google.token_path.clone()), exchanger);

    let mut prompt = ConsolePrompt::stdio().with_browser(open_browser);
    provider
        .obtain(&mut prompt)
        .await
        .map_err(ClientError::from_auth)
}

async fn collect(
    client: &GoogleCalendarClient,
    google: &GoogleConfig,
    window: QueryWindow,
    config: &ExportConfig,
) -> ClientResult<CollectionCounters> {
    let mut pages = client.event_pages(EventQuery::new(google.calendar_id.clone(), window));

    let (mut signal, handle) = CancelSignal::with_timeout(config.timeout);
    let listener = spawn_interrupt_listener(handle);

    let mut collector =
        PageCollector::new(RecordWriter::new(io::stdout())).with_limit(config.limit);
    let result = collector.run(&mut pages, &mut signal).await;
    listener.abort();

    if result.is_err() {
        let counters = collector.counters();
        debug!(
            "stopped after {} pages, {} rows written",
            counters.pages,
            collector.writer().rows_written()
        );
    }
    result
}
