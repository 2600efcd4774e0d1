//! Error types for the download/extract/build pipeline.
//!
//! Callers can match on the variants to distinguish recoverable conditions
//! (an extraction destination that already exists) from fatal ones.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Transport or connection failure while fetching the source archive.
    #[error("download failed for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Corrupt or unreadable source archive.
    #[error("cannot read archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Extraction destination present and overwrite was disallowed.
    ///
    /// Recoverable: pick a different root or allow overwriting.
    #[error("folder '{0}' already exists")]
    DestinationExists(PathBuf),

    /// Filesystem failure (directory creation, chmod, file writes).
    #[error("{context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The external cmake invocation could not be started or exited non-zero.
    #[error("{0}")]
    Build(String),

    #[error(transparent)]
    Version(#[from] crate::version::VersionError),
}

impl Error {
    /// Wrap an `io::Error` with a human-readable context line.
    pub(crate) fn fs(context: impl Into<String>) -> impl FnOnce(io::Error) -> Error {
        let context = context.into();
        move |source| Error::Filesystem { context, source }
    }
}
