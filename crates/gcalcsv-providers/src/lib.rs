//! Calendar event sources for gcalcsv.
//!
//! This crate provides the pieces the exporter pulls events through:
//!
//! - [`PageSource`] - A lazily fetched sequence of [`EventPage`]s
//! - [`google`] - Google Calendar `events.list` paging plus OAuth 2.0
//!   credential handling (cache, refresh and interactive authorization)
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌─────────────────────┐
//! │ CredentialProvider   │────▶│ token.json (cache)  │
//! └──────────┬───────────┘     └─────────────────────┘
//!            │ bearer credential
//!            ▼
//! ┌──────────────────────┐
//! │ GoogleCalendarClient │
//! └──────────┬───────────┘
//!            │ events.list, one page per call
//!            ▼
//! ┌──────────────────────┐
//! │   GoogleEventPages   │ (PageSource)
//! └──────────┬───────────┘
//!            ▼
//!        EventPage
//! ```

pub mod error;
pub mod google;
pub mod page;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use page::{BoxFuture, EventPage, PageSource, StaticPages};
