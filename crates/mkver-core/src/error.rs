use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MkverError {
    #[error("No commit identifier for HEAD under {}: {reason}", .dir.display())]
    NoCommitIdentifier { dir: PathBuf, reason: String },
    #[error("Manifest {} is unreadable: {reason}", .path.display())]
    ManifestUnreadable { path: PathBuf, reason: String },
    #[error("Cannot write {}: {reason}", .path.display())]
    WritePathInvalid { path: PathBuf, reason: String },
    #[error("Unsupported output file {} (expected .js, .cjs, .mjs, .ts, .json or .rs)", .path.display())]
    UnsupportedOutput { path: PathBuf },
    #[error("Generated module is unreadable: {0}")]
    GeneratedUnreadable(String),
}

impl MkverError {
    pub(crate) fn no_commit(dir: &Path, reason: impl Into<String>) -> Self {
        Self::NoCommitIdentifier {
            dir: dir.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn manifest(path: &Path, reason: impl Into<String>) -> Self {
        Self::ManifestUnreadable {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn write_path(path: &Path, reason: impl Into<String>) -> Self {
        Self::WritePathInvalid {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
