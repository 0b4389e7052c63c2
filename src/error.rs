//! Hard failures surfaced to callers.
//!
//! Everything that is a property of the *data* (a cell that will not cast, a
//! line with an unbalanced quote, a ragged row) is absorbed and recorded in the
//! [`ErrorLog`](crate::errorlog::ErrorLog) instead. The variants here describe
//! misuse of the reader or a source that cannot serve a request.

use thiserror::Error;

/// Errors returned by sniffing, tab declaration and reading.
#[derive(Error, Debug)]
pub enum TabError {
    /// A tab or column selection names a column absent from the header.
    #[error("unknown column '{name}'; header columns are {available:?}")]
    UnknownColumn { name: String, available: Vec<String> },

    /// A read was requested on a single-pass source past its replay window.
    #[error("source exhausted: line {line} is no longer available and the source cannot reseek")]
    SourceExhausted { line: usize },

    /// Chunks must hold at least one row.
    #[error("chunksize must be greater than 0, got {0}")]
    InvalidChunksize(usize),

    /// Samples must hold at least one line.
    #[error("sample amount must be greater than 0, got {0}")]
    InvalidAmount(usize),

    /// `read` was given an explicit start line but no explicit header.
    #[error("an explicit header is required when reading from start line {start}")]
    HeaderRequired { start: usize },

    /// A header override does not match the sniffed column count.
    #[error("header has {got} names but the sniffed data has {expected} columns")]
    HeaderLength { expected: usize, got: usize },

    /// A comparison expression could not be parsed.
    #[error("invalid comparison expression '{expression}': {reason}")]
    InvalidComparison { expression: String, reason: String },

    /// A regular expression failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The source holds no lines to sniff.
    #[error("source contains no readable lines")]
    EmptySource,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure opening or decoding a path-backed source.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TabError>;
