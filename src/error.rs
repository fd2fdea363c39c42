//! Errors raised at the edges of the library.
//!
//! Parsing a timing plan, computing a phase and correlating graphics never
//! fail; malformed documents degrade to partial tables. The only fallible
//! operations are turning user input into typed values (query times,
//! weekday numbers) and loading configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for timing-plan operations.
pub type Result<T, E = TimingPlanError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TimingPlanError {
    #[error("Invalid clock time {input:?}: expected HH:MM:SS or HH:MM")]
    InvalidClockTime { input: String },

    #[error("Invalid weekday {0}: expected 1 (Monday) to 7 (Sunday)")]
    InvalidWeekday(u8),

    #[error("Failed to read config file {}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl TimingPlanError {
    pub fn invalid_clock_time(input: impl Into<String>) -> Self {
        Self::InvalidClockTime {
            input: input.into(),
        }
    }
}
