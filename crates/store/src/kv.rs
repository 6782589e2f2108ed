//! The store adapter seam.
//!
//! Backends implement the primitive commands; the prefix helpers are
//! provided on top of them so every backend pages through SCAN the same way.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Page size used when a caller does not pick one.
pub const DEFAULT_SCAN_COUNT: usize = 100;

/// Which kind of key a SCAN should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Plain string values.
    Value,
    /// Append-only logs (streams).
    Log,
}

/// One stored log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Store-assigned id, `<millis>-<seq>`, strictly increasing per log.
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Remove a key of either kind. Returns whether it existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Fetch several values at once, positionally aligned with `keys`.
    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;

    /// One SCAN step. Returns the next cursor (0 when finished) and the
    /// page of matching key names. Pages may be empty before the end and
    /// may repeat names across pages.
    async fn scan_page(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
        kind: KeyKind,
    ) -> StoreResult<(u64, Vec<String>)>;

    /// Append an entry to a log, creating the log if needed. `id` is `*`
    /// for a store-generated id. Returns the assigned id.
    async fn append_to_log(
        &self,
        log_key: &str,
        fields: &[(String, String)],
        id: &str,
    ) -> StoreResult<String>;

    /// Entries with ids strictly greater than `offset`, oldest first.
    ///
    /// With `block` set, waits up to that long for the first new entry when
    /// none are available; a zero duration waits indefinitely.
    async fn read_log_from(
        &self,
        log_key: &str,
        offset: &str,
        block: Option<Duration>,
        count: Option<usize>,
    ) -> StoreResult<Vec<LogEntry>>;

    async fn ping(&self) -> StoreResult<()>;

    // -----------------------------------------------------------------------
    // Prefix helpers
    // -----------------------------------------------------------------------

    /// All value keys matching `{prefix}:*`, de-duplicated.
    async fn scan_keys_by_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let pattern = format!("{prefix}:*");
        let keys = scan_all(self, 0, &pattern, DEFAULT_SCAN_COUNT, KeyKind::Value).await?;
        Ok(keys.into_iter().collect())
    }

    /// Values of every key matching `{prefix}:*`. Keys that vanish between
    /// the scan and the fetch are skipped.
    async fn mget_by_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let keys = self.scan_keys_by_prefix(prefix).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let values = self.mget(&keys).await?;
        Ok(values.into_iter().flatten().collect())
    }

    /// Delete every key matching `{prefix}:*`. Returns the keys removed.
    async fn delete_all_by_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let keys = self.scan_keys_by_prefix(prefix).await?;
        let mut deleted = Vec::with_capacity(keys.len());
        for key in keys {
            if self.delete(&key).await? {
                deleted.push(key);
            }
        }
        Ok(deleted)
    }

    /// Names of all logs matching `pattern`, starting from `cursor` and
    /// following the cursor until the scan completes.
    async fn scan_log_names(
        &self,
        cursor: u64,
        pattern: &str,
        page_size: usize,
    ) -> StoreResult<BTreeSet<String>> {
        scan_all(self, cursor, pattern, page_size, KeyKind::Log).await
    }
}

async fn scan_all<S: KvStore + ?Sized>(
    store: &S,
    mut cursor: u64,
    pattern: &str,
    count: usize,
    kind: KeyKind,
) -> StoreResult<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    loop {
        let (next, page) = store.scan_page(cursor, pattern, count, kind).await?;
        names.extend(page);
        if next == 0 {
            return Ok(names);
        }
        cursor = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays canned SCAN pages; every other command is unused.
    struct PagedScan(Vec<(u64, Vec<&'static str>)>);

    #[async_trait]
    impl KvStore for PagedScan {
        async fn get(&self, _: &str) -> StoreResult<Option<String>> {
            unimplemented!()
        }
        async fn set(&self, _: &str, _: &str, _: Option<Duration>) -> StoreResult<()> {
            unimplemented!()
        }
        async fn delete(&self, _: &str) -> StoreResult<bool> {
            unimplemented!()
        }
        async fn exists(&self, _: &str) -> StoreResult<bool> {
            unimplemented!()
        }
        async fn mget(&self, _: &[String]) -> StoreResult<Vec<Option<String>>> {
            unimplemented!()
        }
        async fn scan_page(
            &self,
            cursor: u64,
            _: &str,
            _: usize,
            _: KeyKind,
        ) -> StoreResult<(u64, Vec<String>)> {
            let (next, page) = &self.0[cursor as usize];
            Ok((*next, page.iter().map(|s| s.to_string()).collect()))
        }
        async fn append_to_log(&self, _: &str, _: &[(String, String)], _: &str) -> StoreResult<String> {
            unimplemented!()
        }
        async fn read_log_from(
            &self,
            _: &str,
            _: &str,
            _: Option<Duration>,
            _: Option<usize>,
        ) -> StoreResult<Vec<LogEntry>> {
            unimplemented!()
        }
        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn log_names_follow_cursor_and_drop_repeats() {
        let store = PagedScan(vec![
            (1, vec!["admin-1", "admin-2"]),
            (2, vec![]),
            (0, vec!["admin-2", "admin-3"]),
        ]);

        let names = store.scan_log_names(0, "admin*", 50).await.unwrap();
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["admin-1", "admin-2", "admin-3"]
        );
    }
}
