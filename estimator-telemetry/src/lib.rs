//! # estimator-telemetry
//!
//! Structured logging and metrics shared by the estimator binaries.
//!
//! ```rust
//! use estimator_telemetry::{init_telemetry, LogFormat, LogSettings};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry("estimator", &LogSettings::default().with_format(LogFormat::Pretty))?;
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod metrics;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Span, debug, error, info, instrument, trace, warn};

pub use init::{LogFormat, LogSettings, init_telemetry};
pub use metrics::{EstimatorMetrics, metrics};
pub use spans::*;
