use std::future::Future;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Schema,
};
use uuid::Uuid;

use crate::error_handling::types::StorageError;
use crate::storage::db_entities::findings as finding_entity;
use crate::storage::storage_trait::Storage;
use crate::storage::types::{Finding, FindingFilter};

impl From<finding_entity::Model> for Finding {
    fn from(row: finding_entity::Model) -> Self {
        Finding {
            captured_at_epoch_millis: row.captured_at_epoch_millis,
            timezone_id: row.timezone_id,
            request_path: row.request_path,
            host: row.host,
            referer: row.referer,
        }
    }
}

/// SQLite storage through SeaORM.
///
/// The [`Storage`] trait is synchronous, so the backend drives its own
/// single-threaded runtime. Calls must come from a thread that is not
/// running async tasks (plain threads or `spawn_blocking`).
pub struct DatabaseStorage {
    rt: Option<tokio::runtime::Runtime>,
    db: DatabaseConnection,
}

impl DatabaseStorage {
    pub fn new_file<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|_| StorageError::ConnectionFailed)?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|_| StorageError::WriteFailed)?;
        }
        let url = format!("sqlite://{}?mode=rwc", path.display());

        let db = rt.block_on(async {
            let mut opts = ConnectOptions::new(url);
            opts.max_connections(5).sqlx_logging(false);
            let db = Database::connect(opts).await.map_err(|e| {
                error!("Unable to open database {}: {}", path.display(), e);
                StorageError::ConnectionFailed
            })?;

            let backend = db.get_database_backend();
            let mut table = Schema::new(backend).create_table_from_entity(finding_entity::Entity);
            table.if_not_exists();
            db.execute(backend.build(&table)).await.map_err(|e| {
                error!("Unable to create findings table: {}", e);
                StorageError::WriteFailed
            })?;
            Ok::<_, StorageError>(db)
        })?;

        info!("DatabaseStorage initialized at {}", path.display());
        Ok(Self { rt: Some(rt), db })
    }

    fn block_on<F: Future>(&self, fut: F) -> Result<F::Output, StorageError> {
        match self.rt {
            Some(ref rt) => Ok(rt.block_on(fut)),
            None => Err(StorageError::ConnectionFailed),
        }
    }
}

impl Drop for DatabaseStorage {
    fn drop(&mut self) {
        // the owner may be dropped from inside an async task, where a blocking shutdown panics
        if let Some(rt) = self.rt.take() {
            rt.shutdown_background();
        }
    }
}

impl Storage for DatabaseStorage {
    fn save_findings(&self, session_id: Uuid, findings: &[Finding]) -> Result<(), StorageError> {
        if findings.is_empty() {
            debug!("[{}] Empty batch, nothing to save", session_id);
            return Ok(());
        }
        let rows: Vec<finding_entity::ActiveModel> = findings
            .iter()
            .map(|f| finding_entity::ActiveModel {
                id: NotSet,
                session_id: Set(session_id.to_string()),
                captured_at_epoch_millis: Set(f.captured_at_epoch_millis),
                timezone_id: Set(f.timezone_id.clone()),
                request_path: Set(f.request_path.clone()),
                host: Set(f.host.clone()),
                referer: Set(f.referer.clone()),
            })
            .collect();

        // single multi-row INSERT, so the batch lands entirely or not at all
        self.block_on(async {
            finding_entity::Entity::insert_many(rows)
                .exec(&self.db)
                .await
                .map_err(|e| {
                    error!("[{}] Failed to insert findings: {}", session_id, e);
                    StorageError::WriteFailed
                })
        })??;

        info!("[{}] Saved {} finding(s) to database", session_id, findings.len());
        Ok(())
    }

    fn get_findings(&self, filter: Option<FindingFilter>) -> Result<Vec<Finding>, StorageError> {
        let mut query = finding_entity::Entity::find();
        if let Some(f) = filter {
            if let Some(since) = f.since {
                query = query.filter(
                    finding_entity::Column::CapturedAtEpochMillis.gte(since.timestamp_millis()),
                );
            }
            if let Some(until) = f.until {
                query = query.filter(
                    finding_entity::Column::CapturedAtEpochMillis.lte(until.timestamp_millis()),
                );
            }
            if let Some(host) = f.host {
                query = query.filter(finding_entity::Column::Host.eq(host.into_bytes()));
            }
        }

        let rows = self.block_on(async {
            query
                .order_by_asc(finding_entity::Column::CapturedAtEpochMillis)
                .order_by_asc(finding_entity::Column::Id)
                .all(&self.db)
                .await
                .map_err(|e| {
                    error!("Failed to read findings: {}", e);
                    StorageError::ReadFailed
                })
        })??;

        debug!("Loaded {} finding(s) from database", rows.len());
        Ok(rows.into_iter().map(Finding::from).collect())
    }

    fn cleanup_old_findings(&self, older_than: DateTime<Utc>) -> Result<usize, StorageError> {
        let cutoff = older_than.timestamp_millis();
        let result = self.block_on(async {
            finding_entity::Entity::delete_many()
                .filter(finding_entity::Column::CapturedAtEpochMillis.lt(cutoff))
                .exec(&self.db)
                .await
                .map_err(|e| {
                    error!("Failed to delete old findings: {}", e);
                    StorageError::WriteFailed
                })
        })??;

        info!(
            "Removed {} old finding(s) (cutoff: {})",
            result.rows_affected,
            older_than.to_rfc3339()
        );
        Ok(result.rows_affected as usize)
    }
}
