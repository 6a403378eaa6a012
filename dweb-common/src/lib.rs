//! Common types shared across the dweb crates.
//!
//! This crate holds the shared error type and the logging initialiser. It is
//! kept small so every other crate can depend on it.
//!
//! # Overview
//!
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`DwebError`] and [`Result`]: shared error handling
//! - [`DEFAULT_PROGRAM_NAME`]: prefix used for user-facing error lines
//!
//! # Examples
//!
//! ```rust
//! use dweb_common::DwebError;
//!
//! let err = DwebError::Input("stream closed".into());
//! assert_eq!(err.to_string(), "input error: stream closed");
//! ```
use std::io;

pub mod observability;

/// Name printed in front of user-facing error messages when `argv[0]` is unavailable.
pub const DEFAULT_PROGRAM_NAME: &str = "dweb";

/// Error types used across the dweb workspace.
#[derive(thiserror::Error, Debug)]
pub enum DwebError {
    /// An external program (browser or pager) could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to a child process failed.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// Standard input could not be read.
    #[error("input error: {0}")]
    Input(String),

    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DwebError {
    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }
}

/// Convenient alias for results that use [`DwebError`].
pub type Result<T> = std::result::Result<T, DwebError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_error_names_the_program() {
        let err = DwebError::spawn("w3m", io::Error::from(io::ErrorKind::NotFound));
        let msg = err.to_string();
        assert!(msg.starts_with("failed to start w3m: "), "{msg}");
    }

    #[test]
    fn io_errors_convert() {
        let err: DwebError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(matches!(err, DwebError::Io(_)));
        assert_eq!(err.to_string(), "pipe closed");
    }
}
