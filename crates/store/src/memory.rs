//! In-process store with the same observable semantics as the Redis backend:
//! paginated SCAN with cursors, lazy key expiry, monotonic log ids and
//! blocking log reads.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::error::{StoreError, StoreResult};
use crate::kv::{KeyKind, KvStore, LogEntry};

/// Log entry id, ordered by `(millis, seq)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
struct EntryId {
    millis: u64,
    seq: u64,
}

impl EntryId {
    fn parse(raw: &str) -> Option<Self> {
        match raw.split_once('-') {
            Some((millis, seq)) => Some(Self {
                millis: millis.parse().ok()?,
                seq: seq.parse().ok()?,
            }),
            None => Some(Self {
                millis: raw.parse().ok()?,
                seq: 0,
            }),
        }
    }

    /// Next id after `last`, following the wall clock when it moves forward.
    fn next_after(last: Self) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        if now > last.millis {
            Self { millis: now, seq: 0 }
        } else {
            Self {
                millis: last.millis,
                seq: last.seq + 1,
            }
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Log {
    last_id: EntryId,
    entries: Vec<(EntryId, BTreeMap<String, String>)>,
}

#[derive(Default)]
struct Inner {
    values: BTreeMap<String, StoredValue>,
    logs: BTreeMap<String, Log>,
}

impl Inner {
    fn purge_expired(&mut self) {
        let now = Instant::now();
        self.values.retain(|_, v| v.is_live(now));
    }

    /// Every key in the keyspace, in a stable order.
    fn all_keys(&self) -> Vec<(&str, KeyKind)> {
        let mut keys: Vec<(&str, KeyKind)> = self
            .values
            .keys()
            .map(|k| (k.as_str(), KeyKind::Value))
            .chain(self.logs.keys().map(|k| (k.as_str(), KeyKind::Log)))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));
        keys
    }

    fn entries_after(
        &self,
        log_key: &str,
        offset: EntryId,
        count: Option<usize>,
    ) -> Vec<LogEntry> {
        let Some(log) = self.logs.get(log_key) else {
            return Vec::new();
        };
        log.entries
            .iter()
            .filter(|(id, _)| *id > offset)
            .take(count.unwrap_or(usize::MAX))
            .map(|(id, fields)| LogEntry {
                id: id.to_string(),
                fields: fields.clone(),
            })
            .collect()
    }
}

/// Store kept entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    appended: Notify,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut inner = self.inner.lock().await;
        inner.purge_expired();
        Ok(inner.values.get(key).map(|v| v.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.logs.remove(key);
        inner.values.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        inner.purge_expired();
        let removed_value = inner.values.remove(key).is_some();
        let removed_log = inner.logs.remove(key).is_some();
        Ok(removed_value || removed_log)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        inner.purge_expired();
        Ok(inner.values.contains_key(key) || inner.logs.contains_key(key))
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let mut inner = self.inner.lock().await;
        inner.purge_expired();
        Ok(keys
            .iter()
            .map(|k| inner.values.get(k).map(|v| v.value.clone()))
            .collect())
    }

    async fn scan_page(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
        kind: KeyKind,
    ) -> StoreResult<(u64, Vec<String>)> {
        let matcher = compile_match_pattern(pattern)?;
        let mut inner = self.inner.lock().await;
        inner.purge_expired();

        // Like Redis, the page walks the whole keyspace and the pattern and
        // type filters apply afterwards, so a page can come back empty.
        let keys = inner.all_keys();
        let start = (cursor as usize).min(keys.len());
        let end = start.saturating_add(count.max(1)).min(keys.len());

        let page = keys[start..end]
            .iter()
            .filter(|(name, k)| *k == kind && matcher.is_match(*name))
            .map(|(name, _)| name.to_string())
            .collect();
        let next = if end >= keys.len() { 0 } else { end as u64 };
        Ok((next, page))
    }

    async fn append_to_log(
        &self,
        log_key: &str,
        fields: &[(String, String)],
        id: &str,
    ) -> StoreResult<String> {
        if fields.is_empty() {
            return Err(StoreError::Rejected("log entries need at least one field".into()));
        }

        let mut inner = self.inner.lock().await;
        let last_id = inner.logs.get(log_key).map(|l| l.last_id).unwrap_or_default();

        let assigned = if id == "*" {
            EntryId::next_after(last_id)
        } else {
            let explicit = EntryId::parse(id)
                .ok_or_else(|| StoreError::Rejected(format!("invalid log entry id '{id}'")))?;
            if explicit <= last_id {
                return Err(StoreError::Rejected(format!(
                    "log entry id {explicit} is not greater than the last id {last_id}"
                )));
            }
            explicit
        };

        inner.values.remove(log_key);
        let log = inner.logs.entry(log_key.to_string()).or_default();
        log.last_id = assigned;
        log.entries.push((
            assigned,
            fields.iter().cloned().collect::<BTreeMap<_, _>>(),
        ));
        drop(inner);

        self.appended.notify_waiters();
        Ok(assigned.to_string())
    }

    async fn read_log_from(
        &self,
        log_key: &str,
        offset: &str,
        block: Option<Duration>,
        count: Option<usize>,
    ) -> StoreResult<Vec<LogEntry>> {
        let deadline = block.filter(|d| !d.is_zero()).map(|d| Instant::now() + d);

        // `$` means "only entries appended from now on".
        let offset = {
            let inner = self.inner.lock().await;
            if offset == "$" {
                inner.logs.get(log_key).map(|l| l.last_id).unwrap_or_default()
            } else {
                EntryId::parse(offset).ok_or_else(|| {
                    StoreError::Rejected(format!("invalid log offset '{offset}'"))
                })?
            }
        };

        loop {
            let notified = self.appended.notified();

            let entries = self.inner.lock().await.entries_after(log_key, offset, count);
            if !entries.is_empty() || block.is_none() {
                return Ok(entries);
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Ok(Vec::new());
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Compile a Redis MATCH pattern.
///
/// Redis negates classes with `[^..]` where globset expects `[!..]`.
/// Braces are literal in Redis, so they are wrapped in classes before the
/// pattern reaches globset.
fn compile_match_pattern(pattern: &str) -> StoreResult<GlobMatcher> {
    let mut glob = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                glob.push('\\');
                if let Some(escaped) = chars.next() {
                    glob.push(escaped);
                }
            }
            '[' if !in_class => {
                in_class = true;
                glob.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    glob.push('!');
                }
            }
            ']' if in_class => {
                in_class = false;
                glob.push(']');
            }
            '{' | '}' if !in_class => {
                glob.push('[');
                glob.push(c);
                glob.push(']');
            }
            _ => glob.push(c),
        }
    }

    GlobBuilder::new(&glob)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| StoreError::Rejected(format!("Invalid match pattern {pattern}: {e}")))
}
