//! Storage Trait
//!
//! This module defines the `Storage` trait, the hand-off point between the
//! capture pipeline and whatever keeps findings around for later review.
//!
//! Implementors of this trait are responsible for:
//! - Persisting the batch produced by one capture session
//! - Returning stored findings for review, optionally filtered
//! - Cleaning up old findings
//!
//! All methods return a `Result` to handle potential storage errors.

use crate::error_handling::types::StorageError;
use crate::storage::types::{Finding, FindingFilter};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The `Storage` trait defines the interface for finding storage backends.
///
/// A capture session calls [`Storage::save_findings`] exactly once with its
/// deduplicated batch. The call is treated as a single write: a failure
/// aborts the session and the batch is not retried.
pub trait Storage: Send + Sync {
    /// Saves the batch of distinct findings produced by session `session_id`.
    ///
    /// An empty batch is a no-op.
    fn save_findings(&self, session_id: Uuid, findings: &[Finding]) -> Result<(), StorageError>;

    /// Retrieves stored findings ordered by capture time, optionally filtered.
    fn get_findings(&self, filter: Option<FindingFilter>) -> Result<Vec<Finding>, StorageError>;

    /// Removes findings captured before `older_than` and returns how many were removed.
    fn cleanup_old_findings(&self, older_than: DateTime<Utc>) -> Result<usize, StorageError>;
}
