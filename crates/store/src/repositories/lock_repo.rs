//! Reader/writer locks on resource keys.
//!
//! Every operation reads the current counters, computes the next state and
//! writes it back as separate store calls. Two racing acquires can both be
//! granted; callers that need strict exclusion must serialize upstream.

use dataops_core::error::CoreError;
use dataops_core::lock::{LockCounters, LockOperation, ReleaseOutcome};

use crate::kv::KvStore;

/// Per-key outcome of a bulk lock call.
pub type KeyOutcome = (String, bool);

/// Lock state persistence for resource keys.
pub struct ResourceLockRepo;

impl ResourceLockRepo {
    async fn read_counters(
        store: &dyn KvStore,
        key: &str,
    ) -> Result<Option<LockCounters>, CoreError> {
        store
            .get(key)
            .await?
            .map(|raw| LockCounters::parse(&raw))
            .transpose()
    }

    /// Try to take a lock on `key`. Returns whether it was granted.
    pub async fn acquire(
        store: &dyn KvStore,
        key: &str,
        op: LockOperation,
    ) -> Result<bool, CoreError> {
        let current = Self::read_counters(store, key).await?;
        match LockCounters::acquire(current, op) {
            Some(next) => {
                store.set(key, &next.encode(), None).await?;
                tracing::info!(key, operation = op.as_str(), state = %next.encode(), "Lock acquired");
                Ok(true)
            }
            None => {
                tracing::info!(key, operation = op.as_str(), "Lock denied");
                Ok(false)
            }
        }
    }

    /// Release a lock held on `key`. Returns whether the release applied.
    pub async fn release(
        store: &dyn KvStore,
        key: &str,
        op: LockOperation,
    ) -> Result<bool, CoreError> {
        let current = Self::read_counters(store, key).await?;
        match LockCounters::release(current, op) {
            ReleaseOutcome::Update(next) => {
                store.set(key, &next.encode(), None).await?;
                tracing::info!(key, operation = op.as_str(), state = %next.encode(), "Lock released");
                Ok(true)
            }
            ReleaseOutcome::Clear => {
                store.delete(key).await?;
                tracing::info!(key, operation = op.as_str(), "Lock cleared");
                Ok(true)
            }
            ReleaseOutcome::Denied => {
                tracing::info!(key, operation = op.as_str(), "Release denied");
                Ok(false)
            }
        }
    }

    /// Acquire `op` on every key, in sorted order, stopping at the first
    /// denial. Keys granted before the denial stay locked; keys after it
    /// are not attempted and are reported as not granted.
    pub async fn bulk_acquire(
        store: &dyn KvStore,
        keys: &[String],
        op: LockOperation,
    ) -> Result<Vec<KeyOutcome>, CoreError> {
        let mut sorted = keys.to_vec();
        sorted.sort();

        let mut outcomes = Vec::with_capacity(sorted.len());
        let mut denied = false;
        for key in sorted {
            if denied {
                outcomes.push((key, false));
                continue;
            }
            let granted = Self::acquire(store, &key, op).await?;
            denied = !granted;
            outcomes.push((key, granted));
        }
        Ok(outcomes)
    }

    /// Release `op` on every key, in sorted order, continuing past failures.
    pub async fn bulk_release(
        store: &dyn KvStore,
        keys: &[String],
        op: LockOperation,
    ) -> Result<Vec<KeyOutcome>, CoreError> {
        let mut sorted = keys.to_vec();
        sorted.sort();

        let mut outcomes = Vec::with_capacity(sorted.len());
        for key in sorted {
            let released = Self::release(store, &key, op).await?;
            outcomes.push((key, released));
        }
        Ok(outcomes)
    }

    /// Raw stored state for `key`, `None` when idle.
    pub async fn status(store: &dyn KvStore, key: &str) -> Result<Option<String>, CoreError> {
        Ok(store.get(key).await?)
    }
}
