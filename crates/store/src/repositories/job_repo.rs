//! Job records keyed under the `dataaction` namespace.
//!
//! Records are whole JSON documents, rewritten on every update with a fresh
//! TTL. Lookups scan by selector prefix, so any segment may be `*`.

use std::time::Duration;

use dataops_core::error::CoreError;
use dataops_core::job::{sort_by_update_time, JobRecord, JobSelector, NewJob};
use serde_json::{Map, Value};

use crate::kv::KvStore;

/// Default lifetime of a job record.
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Fields changed by a job update.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: String,
    pub progress: i64,
    pub add_payload: Map<String, Value>,
}

/// Provides CRUD operations for job records.
pub struct JobRepo;

impl JobRepo {
    /// Records matching `selector`, newest first when `sort` is set.
    ///
    /// Stored values that do not decode as job records are skipped.
    pub async fn find(
        store: &dyn KvStore,
        selector: &JobSelector,
        sort: bool,
    ) -> Result<Vec<JobRecord>, CoreError> {
        let raw = store.mget_by_prefix(&selector.prefix()).await?;

        let mut records: Vec<JobRecord> = raw
            .iter()
            .filter_map(|value| match serde_json::from_str(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable job record");
                    None
                }
            })
            .collect();

        if sort {
            sort_by_update_time(&mut records);
        }
        Ok(records)
    }

    /// Register a new job. Fails if a job with the same identity exists.
    pub async fn create(
        store: &dyn KvStore,
        job: NewJob,
        ttl: Duration,
    ) -> Result<JobRecord, CoreError> {
        let selector = job.selector();
        if !store.scan_keys_by_prefix(&selector.prefix()).await?.is_empty() {
            return Err(CoreError::AlreadyExists(format!(
                "Job {} already exists",
                selector.job_id
            )));
        }

        let record = job.into_record(chrono::Utc::now().timestamp());
        Self::save(store, &record, ttl).await?;

        tracing::info!(key = %record.key(), "Job created");
        Ok(record)
    }

    /// Apply `update` to the newest record matching `selector`.
    pub async fn update(
        store: &dyn KvStore,
        selector: &JobSelector,
        update: JobUpdate,
        ttl: Duration,
    ) -> Result<JobRecord, CoreError> {
        let mut record = Self::find(store, selector, true)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                CoreError::NotFound(format!("Job {} not found", selector.job_id))
            })?;

        record.status = update.status;
        record.progress = Value::from(update.progress);
        record.merge_payload(&update.add_payload);
        record.update_timestamp = chrono::Utc::now().timestamp().to_string();

        Self::save(store, &record, ttl).await?;

        tracing::info!(key = %record.key(), status = %record.status, "Job updated");
        Ok(record)
    }

    /// Remove every record matching `selector`. Returns the removed keys.
    pub async fn delete(
        store: &dyn KvStore,
        selector: &JobSelector,
    ) -> Result<Vec<String>, CoreError> {
        let deleted = store.delete_all_by_prefix(&selector.prefix()).await?;
        tracing::info!(prefix = %selector.prefix(), count = deleted.len(), "Jobs deleted");
        Ok(deleted)
    }

    async fn save(store: &dyn KvStore, record: &JobRecord, ttl: Duration) -> Result<(), CoreError> {
        let encoded = serde_json::to_string(record)
            .map_err(|e| CoreError::Unhandled(format!("Failed to encode job record: {e}")))?;
        store.set(&record.key(), &encoded, Some(ttl)).await?;
        Ok(())
    }
}
