//! Error type for the compatibility check.

use apicompat_repository::{CoordinateError, RepositoryError};
use thiserror::Error;

/// Everything that can stop a compatibility check.
///
/// `Configuration` and `InvalidCoordinate` are configuration errors, never
/// retried. `AnalysisFailed` is the only variant produced by normal operation:
/// the tool ran and reported incompatibilities while `fail_on_error` was set.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invalid previous artifact {coordinate}")]
    InvalidCoordinate {
        coordinate: String,
        #[source]
        source: CoordinateError,
    },

    #[error("{message}")]
    Resolution {
        message: String,
        #[source]
        source: Option<RepositoryError>,
    },

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {program}")]
    ProcessStart {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid execution environment: {message}")]
    InvalidEnvironment { message: String },

    #[error("{message}")]
    AnalysisFailed { message: String },

    #[error("interrupted; {program} was stopped or never started")]
    Interrupted { program: String },
}

impl CheckError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Whether this error belongs to the configuration category.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::InvalidCoordinate { .. }
        )
    }
}
