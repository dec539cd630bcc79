//! CLI, configuration, page collection and CSV output
//!
//! This crate provides the `gcalcsv` command-line interface.

pub mod cli;
pub mod collector;
pub mod commands;
pub mod config;
pub mod error;
pub mod signal;
pub mod writer;

pub use cli::Cli;
pub use collector::{CollectionCounters, PageCollector};
pub use config::{ExportConfig, FileConfig};
pub use error::{ClientError, ClientResult};
pub use signal::{CancelHandle, CancelReason, CancelSignal};
pub use writer::RecordWriter;
