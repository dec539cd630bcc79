//! Log setup for the gcalcsv binary.
//!
//! Standard output carries the CSV rows, so every log line goes to stderr.
//! `RUST_LOG` takes precedence over the level chosen on the command line.
//!
//! ```ignore
//! use gcalcsv_core::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::for_cli(args.debug))?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crates whose events are shown at the configured level.
const LOG_TARGETS: [&str; 4] = [
    "gcalcsv",
    "gcalcsv_core",
    "gcalcsv_providers",
    "gcalcsv_client",
];

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
}

/// How much to log and how to decorate each line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level for the gcalcsv crates when no explicit filter is given.
    pub level: Level,
    /// Prefix lines with file, line and module target.
    pub source_locations: bool,
    /// Prefix lines with a timestamp.
    pub timestamps: bool,
    /// Explicit filter directive, overriding both `level` and `RUST_LOG`.
    pub directive: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_cli(false)
    }
}

impl TracingConfig {
    /// Quiet (warnings only) by default, fully decorated debug output with
    /// `debug`.
    #[must_use]
    pub fn for_cli(debug: bool) -> Self {
        Self {
            level: if debug { Level::DEBUG } else { Level::WARN },
            source_locations: debug,
            timestamps: debug,
            directive: None,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    /// Directive applied when neither `directive` nor `RUST_LOG` is set,
    /// e.g. `gcalcsv=WARN,gcalcsv_core=WARN,...`.
    pub fn level_directive(&self) -> String {
        let level = self.level;
        LOG_TARGETS
            .map(|target| format!("{target}={level}"))
            .join(",")
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.directive {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level_directive()))),
        }
    }
}

/// Installs the global subscriber. Call once, before any work starts.
///
/// # Errors
///
/// Fails if a global subscriber is already installed or if the explicit
/// directive does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_file(config.source_locations)
        .with_line_number(config.source_locations)
        .with_target(config.source_locations);

    let layer = if config.timestamps {
        layer.boxed()
    } else {
        layer.without_time().boxed()
    };

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(config.env_filter()?)
            .with(layer),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        let config = TracingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.source_locations);
        assert!(!config.timestamps);
        assert_eq!(config, TracingConfig::for_cli(false));
    }

    #[test]
    fn debug_flag_raises_level_and_decorates() {
        let config = TracingConfig::for_cli(true);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.source_locations);
        assert!(config.level_directive().contains("gcalcsv_providers=DEBUG"));
    }

    #[test]
    fn level_directive_covers_every_crate() {
        let directive = TracingConfig::default().with_level(Level::INFO).level_directive();
        assert_eq!(
            directive,
            "gcalcsv=INFO,gcalcsv_core=INFO,gcalcsv_providers=INFO,gcalcsv_client=INFO"
        );
        assert!(EnvFilter::try_new(&directive).is_ok());
    }

    #[test]
    fn explicit_directive_is_validated() {
        let config = TracingConfig::default().with_directive("gcalcsv=trace");
        assert!(config.env_filter().is_ok());

        let config = TracingConfig::default().with_directive("gcalcsv=loud");
        assert!(matches!(config.env_filter(), Err(TracingError::Filter(_))));
    }
}
