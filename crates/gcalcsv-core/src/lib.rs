//! Core types: query window, durations, event records, tracing

pub mod duration;
pub mod error;
pub mod event;
pub mod tracing;
pub mod window;

pub use duration::parse_signed_duration;
pub use error::WindowError;
pub use event::{EventRecord, EventStart};
pub use self::tracing::{init_tracing, TracingConfig, TracingError};
pub use window::{format_rfc3339, resolve_window, QueryWindow, WindowInputs};
