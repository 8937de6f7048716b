//! Load-time error types.
//!
//! Every failure mode has a named variant. Load errors are fatal at session
//! start; everything downstream of a successful load is a total function and
//! reports "no data" as an empty result, never as an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to open '{file}': {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// Bad delimiter, missing column, unparseable number or date.
    /// `line` is the 1-based line in the source file, counting the header.
    #[error("malformed record in '{file}' at line {line}: {message}")]
    Malformed {
        file: String,
        line: usize,
        message: String,
    },
}

/// Result type alias for loader operations.
pub type LoadResult<T> = Result<T, DataLoadError>;
