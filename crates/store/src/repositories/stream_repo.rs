//! Per-session status logs.
//!
//! Each session id is the key of an append-only log. Writers append
//! validated events; readers replay from an offset or tail the log by
//! polling past the last id they have seen.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dataops_core::error::CoreError;
use dataops_core::stream::{StatusEvent, StatusEventInput, StatusFilter};
use futures::Stream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::kv::{KvStore, LogEntry};

/// Offset that replays a log from the beginning.
pub const OFFSET_START: &str = "0";

/// Page size used when scanning for a user's logs.
const PURGE_SCAN_COUNT: usize = 50;

/// Polling behaviour of a live tail.
#[derive(Debug, Clone, Copy)]
pub struct TailOptions {
    /// Pause between reads.
    pub poll_interval: Duration,
    /// Stop after this long. `None` tails until cancelled.
    pub timeout: Option<Duration>,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: None,
        }
    }
}

/// Status log persistence.
pub struct StatusStreamRepo;

impl StatusStreamRepo {
    /// Validate and append an event submitted by a writer.
    pub async fn append(
        store: &dyn KvStore,
        input: StatusEventInput,
    ) -> Result<StatusEvent, CoreError> {
        let event = input.validate()?;
        Self::append_event(store, event).await
    }

    /// Append an already validated event. Returns it with its entry id set.
    pub async fn append_event(
        store: &dyn KvStore,
        mut event: StatusEvent,
    ) -> Result<StatusEvent, CoreError> {
        let entry_id = store
            .append_to_log(&event.session_id, &event.to_fields(), "*")
            .await?;
        tracing::debug!(
            session_id = %event.session_id,
            entry_id = %entry_id,
            status = event.status.as_str(),
            "Status event appended"
        );
        event.entry_id = Some(entry_id);
        Ok(event)
    }

    /// Every event after `offset`, oldest first.
    pub async fn replay(
        store: &dyn KvStore,
        session_id: &str,
        offset: &str,
    ) -> Result<Vec<StatusEvent>, CoreError> {
        let entries = store.read_log_from(session_id, offset, None, None).await?;
        Ok(decode_entries(session_id, &entries))
    }

    /// Follow a session log, yielding matching events as they are appended.
    ///
    /// The first read starts at `offset`. The stream ends when `cancel`
    /// fires or the timeout elapses; a store error is yielded once and then
    /// the stream ends.
    pub fn tail(
        store: Arc<dyn KvStore>,
        session_id: String,
        offset: String,
        filter: StatusFilter,
        options: TailOptions,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<StatusEvent, CoreError>> + Send + 'static {
        let state = TailState {
            store,
            session_id,
            offset,
            filter,
            options,
            cancel,
            started: Instant::now(),
            pending: VecDeque::new(),
            polled: false,
            done: false,
        };
        futures::stream::unfold(state, |mut st| async move {
            loop {
                if let Some(event) = st.pending.pop_front() {
                    return Some((Ok(event), st));
                }
                if st.done {
                    return None;
                }

                if st.polled {
                    tokio::select! {
                        _ = st.cancel.cancelled() => return None,
                        _ = tokio::time::sleep(st.options.poll_interval) => {}
                    }
                }
                st.polled = true;

                if st.cancel.is_cancelled() || st.expired() {
                    tracing::debug!(session_id = %st.session_id, "Status tail finished");
                    return None;
                }

                match st
                    .store
                    .read_log_from(&st.session_id, &st.offset, None, None)
                    .await
                {
                    Ok(entries) => {
                        if let Some(last) = entries.last() {
                            st.offset = last.id.clone();
                        }
                        let events = decode_entries(&st.session_id, &entries);
                        st.pending
                            .extend(events.into_iter().filter(|e| st.filter.matches(e)));
                    }
                    Err(e) => {
                        tracing::error!(session_id = %st.session_id, error = %e, "Status tail read failed");
                        st.done = true;
                        return Some((Err(e.into()), st));
                    }
                }
            }
        })
    }

    /// Delete every log whose name starts with `user`. Returns the names
    /// removed.
    pub async fn purge_user(store: &dyn KvStore, user: &str) -> Result<Vec<String>, CoreError> {
        let pattern = format!("{user}*");
        let names = store.scan_log_names(0, &pattern, PURGE_SCAN_COUNT).await?;

        if names.is_empty() {
            tracing::warn!(user, "No status logs found to purge");
            return Ok(Vec::new());
        }

        let mut removed = Vec::with_capacity(names.len());
        for name in names {
            if store.delete(&name).await? {
                removed.push(name);
            }
        }
        tracing::info!(user, count = removed.len(), "Status logs purged");
        Ok(removed)
    }
}

struct TailState {
    store: Arc<dyn KvStore>,
    session_id: String,
    offset: String,
    filter: StatusFilter,
    options: TailOptions,
    cancel: CancellationToken,
    started: Instant,
    pending: VecDeque<StatusEvent>,
    polled: bool,
    done: bool,
}

impl TailState {
    fn expired(&self) -> bool {
        self.options
            .timeout
            .is_some_and(|limit| self.started.elapsed() >= limit)
    }
}

/// Decode log entries, skipping any that no longer parse as events.
fn decode_entries(session_id: &str, entries: &[LogEntry]) -> Vec<StatusEvent> {
    entries
        .iter()
        .filter_map(|entry| {
            match StatusEvent::from_fields(session_id, &entry.id, &entry.fields) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(session_id, entry_id = %entry.id, error = %e, "Skipping malformed status entry");
                    None
                }
            }
        })
        .collect()
}
