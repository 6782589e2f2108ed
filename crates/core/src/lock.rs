//! Reader/writer lock state for a single resource key.
//!
//! A held lock is a `(read_count, write_count)` pair persisted as the
//! string `"<read>,<write>"`; an idle resource has no stored value at all.
//! The transitions here are pure: the repository reads the current pair,
//! asks this module for the next state, and writes it back.
//!
//! ```text
//! IDLE        -(read)---------------> READING(1)
//! READING(n)  -(read)---------------> READING(n+1)
//! READING(n)  -(read release, n>1)--> READING(n-1)
//! READING(1)  -(read release)-------> IDLE
//! IDLE        -(write)--------------> WRITING
//! WRITING     -(write release)------> IDLE
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kind of access requested on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockOperation {
    Read,
    Write,
}

impl LockOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Stored counter pair for a locked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockCounters {
    pub read: u64,
    pub write: u64,
}

/// Result of applying a release to the current lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The release is not valid for the current state; nothing changes.
    Denied,
    /// Persist the decremented counters.
    Update(LockCounters),
    /// Last holder released; remove the key.
    Clear,
}

impl LockCounters {
    pub const fn new(read: u64, write: u64) -> Self {
        Self { read, write }
    }

    /// Parse the stored `"<read>,<write>"` encoding.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (read, write) = raw
            .split_once(',')
            .ok_or_else(|| CoreError::Unhandled(format!("Malformed lock value '{raw}'")))?;

        let read = read
            .trim()
            .parse()
            .map_err(|_| CoreError::Unhandled(format!("Malformed read count in '{raw}'")))?;
        let write = write
            .trim()
            .parse()
            .map_err(|_| CoreError::Unhandled(format!("Malformed write count in '{raw}'")))?;

        Ok(Self { read, write })
    }

    /// Storage encoding, compatible with records written by earlier deployments.
    pub fn encode(&self) -> String {
        format!("{},{}", self.read, self.write)
    }

    /// Compute the state after an acquire, or `None` if the acquire is denied.
    ///
    /// `current` is `None` when the resource is idle.
    pub fn acquire(current: Option<Self>, op: LockOperation) -> Option<Self> {
        let state = current.unwrap_or_default();

        if state.write > 0 || (op == LockOperation::Write && state.read > 0) {
            return None;
        }

        match op {
            LockOperation::Read => Some(Self::new(state.read + 1, state.write)),
            LockOperation::Write => Some(Self::new(0, 1)),
        }
    }

    /// Compute the outcome of a release against the current state.
    ///
    /// A read release on a pair with `read <= 1` clears the key even if a
    /// write count is recorded; the stored value is treated as belonging to
    /// the caller.
    pub fn release(current: Option<Self>, op: LockOperation) -> ReleaseOutcome {
        let Some(state) = current else {
            return ReleaseOutcome::Denied;
        };

        match op {
            LockOperation::Read if state.read > 1 => {
                ReleaseOutcome::Update(Self::new(state.read - 1, state.write))
            }
            LockOperation::Read => ReleaseOutcome::Clear,
            // Readers still recorded: a write release here is a caller bug.
            LockOperation::Write if state.read > 0 => ReleaseOutcome::Denied,
            LockOperation::Write => ReleaseOutcome::Clear,
        }
    }
}
