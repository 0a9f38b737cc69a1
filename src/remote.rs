//! Boundary to the backing service.

use async_trait::async_trait;

use crate::{
    record::{Record, UserProfile},
    types::RecordId,
};

/// Opaque failure of one remote apply. Every variant is retriable until the
/// entry's retry budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Service could not be reached.
    #[error("remote unreachable: {0}")]
    Unreachable(String),
    /// Service refused the mutation.
    #[error("remote rejected mutation: {0}")]
    Rejected(String),
    /// No answer within the configured timeout.
    #[error("remote call timed out")]
    Timeout,
}

/// Remote apply operations consumed by the sync engine.
#[async_trait]
pub trait RemoteService: Send + Sync + 'static {
    /// Creates `record` remotely and returns its canonical id.
    async fn apply_create(&self, record: &Record) -> Result<RecordId, RemoteError>;

    /// Overwrites the remote record `id` with `record`.
    async fn apply_update(&self, id: &RecordId, record: &Record) -> Result<(), RemoteError>;

    /// Overwrites the remote profile. Idempotent.
    async fn apply_profile_update(&self, profile: &UserProfile) -> Result<(), RemoteError>;
}
