//! Unified error types for the blinkd daemon.
//!
//! Only configuration loading propagates errors out of the core; everything
//! else (backend writes, I²C transactions, signal emission) is logged at the
//! failure site and reported as a plain success/failure bool, so the arbiter
//! never sees hardware trouble.

use core::fmt;

/// Why a pattern definition or the whole keyfile was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The keyfile could not be read from disk.
    Io(String),
    /// A required key is absent from its section.
    MissingKey { section: String, key: String },
    /// The backend tag in the keyfile is not a known family.
    UnknownBackend(String),
    /// A pattern definition has the wrong number of fields for its family.
    FieldCount { expected: usize, got: usize },
    /// A numeric field failed to parse.
    BadNumber(&'static str),
    /// The visibility policy number is outside the closed 1..=7 set.
    BadPolicy(u8),
    /// An engine micro-program is too long, odd-length, or not hex.
    ProgramInvalid(&'static str),
    /// A mux field assigns the same LED to both engines.
    MuxOverlap,
    /// A numeric field parsed but is outside its allowed range.
    ValueRange(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "config I/O: {msg}"),
            Self::MissingKey { section, key } => {
                write!(f, "missing key {key} in section [{section}]")
            }
            Self::UnknownBackend(tag) => write!(f, "unknown backend family '{tag}'"),
            Self::FieldCount { expected, got } => {
                write!(f, "expected {expected} fields, got {got}")
            }
            Self::BadNumber(field) => write!(f, "field '{field}' is not a number"),
            Self::BadPolicy(n) => write!(f, "visibility policy {n} is out of range"),
            Self::ProgramInvalid(reason) => write!(f, "engine program: {reason}"),
            Self::MuxOverlap => write!(f, "mux assigns the same LED to both engines"),
            Self::ValueRange(field) => write!(f, "field '{field}' is out of range"),
        }
    }
}

impl std::error::Error for ConfigError {}
