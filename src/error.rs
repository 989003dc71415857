// src/error.rs

//! Error types for pharpack
//!
//! Every failure aborts the build in progress. Errors carry the phase that
//! failed and the offending path so the caller can report both.

use crate::manifest::ManifestError;
use crate::phar::WriterState;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pharpack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Build phase an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    ManifestResolution,
    ArchiveCreation,
    FileSelection,
    Ingestion,
    Compression,
    Commit,
    Inspection,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManifestResolution => "manifest resolution",
            Self::ArchiveCreation => "archive creation",
            Self::FileSelection => "file selection",
            Self::Ingestion => "ingestion",
            Self::Compression => "compression",
            Self::Commit => "commit",
            Self::Inspection => "inspection",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while assembling or reading an archive
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing input (bad directory, bad configuration value)
    #[error("[{phase}] invalid input: {message}")]
    InvalidInput { phase: BuildPhase, message: String },

    /// The dependency manifest could not be resolved
    #[error("[manifest resolution] {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    /// Output path not writable, or a previous artifact could not be removed
    #[error("[archive creation] cannot create artifact {}: {source}", path.display())]
    ArtifactCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A selected file could not be read or compressed, or a walk failed
    #[error("[{phase}] {}: {source}", path.display())]
    Ingestion {
        phase: BuildPhase,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Final write or rename of the artifact failed
    #[error("[commit] failed to write artifact {}: {source}", path.display())]
    Commit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Archive writer used outside the buffering state
    #[error("archive writer is {0}, expected buffering")]
    InvalidState(WriterState),

    /// An artifact being read does not follow the PHAR layout
    #[error("[inspection] malformed archive {}: {reason}", path.display())]
    MalformedArchive { path: PathBuf, reason: String },
}

impl Error {
    /// Phase the error belongs to
    pub fn phase(&self) -> BuildPhase {
        match self {
            Self::InvalidInput { phase, .. } | Self::Ingestion { phase, .. } => *phase,
            Self::Manifest { .. } => BuildPhase::ManifestResolution,
            Self::ArtifactCreate { .. } => BuildPhase::ArchiveCreation,
            Self::Commit { .. } | Self::InvalidState(_) => BuildPhase::Commit,
            Self::MalformedArchive { .. } => BuildPhase::Inspection,
        }
    }

    pub(crate) fn invalid_input(phase: BuildPhase, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            phase,
            message: message.into(),
        }
    }

    pub(crate) fn ingestion(phase: BuildPhase, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Ingestion {
            phase,
            path: path.into(),
            source,
        }
    }
}
