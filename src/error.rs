//! Crate-wide error taxonomy.
//!
//! Synchronous registry operations only ever fail with [`CodexError::InvalidInput`];
//! every other kind is recovered locally (retried, skipped, or logged) by the
//! subsystem that encountered it and never unwinds into a caller's in-memory write.

use std::io;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, CodexError>;

#[derive(Debug, Error)]
pub enum CodexError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("backend corrupt: {0}")]
    BackendCorrupt(String),

    #[error("content adapter failed: {0}")]
    AdapterFailure(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for CodexError {
    fn from(e: rusqlite::Error) -> Self {
        CodexError::BackendUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for CodexError {
    fn from(e: serde_json::Error) -> Self {
        CodexError::Serialization(e.to_string())
    }
}

/// Acquire a `std::sync::Mutex`, treating poisoning as fatal corruption.
///
/// Most interior mutability in this crate uses `parking_lot`, which does not
/// poison; this helper exists for the handful of `std::sync::Mutex` uses
/// (e.g. around a raw `rusqlite::Connection`) where poisoning is possible.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| {
        error!("lock poisoned - fatal error");
        CodexError::BackendCorrupt("lock poisoned".into())
    })
}
