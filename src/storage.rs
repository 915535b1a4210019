//! Storage subsystem
//!
//! This module provides the persistence hand-off for capture sessions and
//! read access for reviewing what was found.
//!
//! Components:
//! - `storage_trait`: the Storage trait defining a uniform API.
//! - `types`: the `Finding` record and review filters.
//! - `database_storage`: ORM-based SQLite implementation using SeaORM.
//! - `file_storage`: filesystem-backed implementation for simple persistence and inspection.
//! - `finding_filter`: helpers to build and evaluate finding queries.
//! - `db_entities`: SeaORM entity models for the database backend.

pub mod database_storage;
pub mod db_entities;
pub mod file_storage;
pub mod finding_filter;
pub mod storage_trait;
pub mod types;

use std::sync::Arc;

use crate::configuration::types::{StorageBackend, StorageConfig};
use crate::error_handling::types::StorageError;

pub use database_storage::DatabaseStorage;
pub use file_storage::FileStorage;
pub use storage_trait::Storage;
pub use types::{Finding, FindingFilter, FindingKey};

/// Opens the backend selected in the configuration.
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    match config.backend {
        StorageBackend::File => Ok(Arc::new(FileStorage::new(&config.path)?)),
        StorageBackend::Database => Ok(Arc::new(DatabaseStorage::new_file(&config.path)?)),
    }
}
