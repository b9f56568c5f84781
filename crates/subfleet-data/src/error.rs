//! Errors raised while reading the data directory.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reading or writing files under a [`DataLayout`](crate::DataLayout).
#[derive(Debug, Error)]
pub enum DataError {
    /// A file or directory could not be read or written.
    #[error("{path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// A required file does not exist.
    #[error("missing file {0}")]
    MissingFile(PathBuf),

    /// The path exists but is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::MissingFile(path)
        } else {
            Self::Io { path, source }
        }
    }
}
