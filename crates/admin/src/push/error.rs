//! Push-related errors.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur when delivering push notifications.
#[derive(Debug, Error)]
pub enum PushError {
    /// Every token in a multicast failed at the request level: FCM was
    /// unreachable or refused the request (auth, quota, payload).
    #[error("push dispatch failed for all {attempted} devices: {reason}")]
    DispatchFailed { attempted: usize, reason: String },

    /// Device bookkeeping failed.
    #[error("device store error: {0}")]
    Store(#[from] RepositoryError),
}
