use std::io;
use std::path::PathBuf;

use dup_core::DriveError;
use thiserror::Error;

use crate::storage::CursorError;

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("not a folder: {0}")]
    NotAFolder(String),
    #[error("cannot download folders yet; '{0}' is a folder")]
    IsAFolder(String),
    #[error("connection error after {attempts} attempts, please check your internet connection")]
    ConnectivityExhausted {
        attempts: u32,
        #[source]
        source: DriveError,
    },
    #[error("cannot download native document of type {0}")]
    UnsupportedExport(String),
    #[error("not authenticated with Google Drive; run `dup login` to authenticate")]
    AuthRequired,
    #[error("invalid local path: {}", .0.display())]
    InvalidLocalPath(PathBuf),
    #[error("download integrity check failed: expected {expected_md5}, got {actual_md5}")]
    IntegrityMismatch {
        expected_md5: String,
        actual_md5: String,
    },
    #[error("drive request failed: {0}")]
    Drive(#[from] DriveError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Cursor(#[from] CursorError),
}
