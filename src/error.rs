//! Error types for the fallible edges of the check-in core
//!
//! Scan outcomes are not errors (see [`crate::Outcome`]); these types cover
//! the places where the tool cannot continue: loading or saving the roster,
//! reading a capture, loading configuration, and operator login.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading, validating or saving the attendee roster.
#[derive(Error, Debug)]
pub enum RosterError {
    /// Underlying file I/O failed
    #[error("roster I/O error on {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Original error
        #[source]
        source: std::io::Error,
    },

    /// CSV could not be parsed or written
    #[error("roster CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column could not be found in the header row
    #[error("roster has no {0} column")]
    MissingColumn(&'static str),

    /// The `Scanned` column holds something that is not a boolean
    #[error("invalid Scanned value {value:?} on line {line}")]
    InvalidFlag {
        /// 1-based line number in the file (header is line 1)
        line: usize,
        /// Offending text
        value: String,
    },

    /// Duplicate roll identifiers while the reject policy is active
    #[error("duplicate roll identifiers in roster: {}", .0.join(", "))]
    DuplicateRoll(Vec<String>),

    /// Store refused the write (used by in-memory stores)
    #[error("roster store unavailable: {0}")]
    Unavailable(String),
}

/// Failures while turning a capture into a [`crate::Frame`].
#[derive(Error, Debug)]
pub enum FrameError {
    /// Pixel buffer does not match the stated dimensions
    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    BufferSize {
        /// Bytes required by width * height * channels
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// Image file could not be opened or decoded
    #[error("failed to load image {path}: {source}")]
    Image {
        /// Path that failed
        path: PathBuf,
        /// Original error
        #[source]
        source: image::ImageError,
    },
}

/// Failures while loading the tool configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Original error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for [`crate::Config`]
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// No operator may log in with this config
    #[error("config has an empty operator table")]
    NoOperators,

    /// An environment override could not be parsed
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },
}

/// Operator login failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown username or wrong password; the two are reported the same way
    #[error("invalid username or password")]
    InvalidCredentials,
}
