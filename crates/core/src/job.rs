//! Job records for dispatched operations, keyed per user session.
//!
//! A record lives under
//! `dataaction:{session_id}:{label}:{job_id}:{action}:{code}:{operator}:{source}`.
//! Lookups use the first six segments as a prefix so that any segment can
//! be replaced by the `*` wildcard.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Namespace for job keys in the shared store.
pub const JOB_KEY_NAMESPACE: &str = "dataaction";

/// Wildcard accepted in any selector segment.
pub const WILDCARD: &str = "*";

pub const DEFAULT_LABEL: &str = "Container";
pub const DEFAULT_TASK_ID: &str = "default_task";
pub const DEFAULT_STATUS: &str = "INIT";

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

fn default_task_id() -> String {
    DEFAULT_TASK_ID.to_string()
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

fn wildcard() -> String {
    WILDCARD.to_string()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A stored job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub session_id: String,
    pub label: String,
    pub task_id: String,
    pub job_id: String,
    pub source: String,
    pub action: String,
    pub status: String,
    pub code: String,
    pub operator: String,
    /// Integer for most writers, free-form string for some.
    pub progress: Value,
    #[serde(default = "empty_object")]
    pub payload: Value,
    /// Unix seconds, string-encoded.
    pub update_timestamp: String,
}

/// Request to register a new job.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub session_id: String,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_task_id")]
    pub task_id: String,
    pub job_id: String,
    pub source: String,
    pub action: String,
    #[serde(default = "default_status")]
    pub target_status: String,
    pub code: String,
    pub operator: String,
    #[serde(default)]
    pub progress: i64,
    #[serde(default = "empty_object")]
    pub payload: Value,
}

/// Six-segment key prefix used to find, update and delete jobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobSelector {
    pub session_id: String,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "wildcard")]
    pub job_id: String,
    #[serde(default = "wildcard")]
    pub action: String,
    #[serde(default = "wildcard")]
    pub code: String,
    #[serde(default = "wildcard")]
    pub operator: String,
}

impl JobSelector {
    /// Selector matching every job of a session under `label`.
    pub fn session(session_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            label: label.into(),
            job_id: wildcard(),
            action: wildcard(),
            code: wildcard(),
            operator: wildcard(),
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = job_id.into();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    /// Store key prefix; the store appends `:*` when scanning.
    pub fn prefix(&self) -> String {
        format!(
            "{JOB_KEY_NAMESPACE}:{}:{}:{}:{}:{}:{}",
            self.session_id, self.label, self.job_id, self.action, self.code, self.operator
        )
    }
}

impl NewJob {
    /// Selector identifying duplicates of this job.
    pub fn selector(&self) -> JobSelector {
        JobSelector {
            session_id: self.session_id.clone(),
            label: self.label.clone(),
            job_id: self.job_id.clone(),
            action: self.action.clone(),
            code: self.code.clone(),
            operator: self.operator.clone(),
        }
    }

    /// Materialize the record as of `now` (unix seconds).
    pub fn into_record(self, now: i64) -> JobRecord {
        JobRecord {
            session_id: self.session_id,
            label: self.label,
            task_id: self.task_id,
            job_id: self.job_id,
            source: self.source,
            action: self.action,
            status: self.target_status,
            code: self.code,
            operator: self.operator,
            progress: Value::from(self.progress),
            payload: self.payload,
            update_timestamp: now.to_string(),
        }
    }
}

impl JobRecord {
    /// Full seven-segment store key.
    pub fn key(&self) -> String {
        format!(
            "{JOB_KEY_NAMESPACE}:{}:{}:{}:{}:{}:{}:{}",
            self.session_id,
            self.label,
            self.job_id,
            self.action,
            self.code,
            self.operator,
            self.source
        )
    }

    /// Numeric view of `update_timestamp`; unparsable values count as 0.
    pub fn updated_at(&self) -> i64 {
        self.update_timestamp.trim().parse().unwrap_or(0)
    }

    /// Shallow-merge `additions` into the stored payload.
    ///
    /// A non-object payload is replaced by an object holding the additions.
    pub fn merge_payload(&mut self, additions: &Map<String, Value>) {
        if !self.payload.is_object() {
            self.payload = empty_object();
        }
        if let Value::Object(existing) = &mut self.payload {
            for (k, v) in additions {
                existing.insert(k.clone(), v.clone());
            }
        }
    }
}

/// Order records newest first. Ties keep their original order.
pub fn sort_by_update_time(records: &mut [JobRecord]) {
    records.sort_by_key(|r| std::cmp::Reverse(r.updated_at()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_job() -> NewJob {
        serde_json::from_value(json!({
            "session_id": "admin-1",
            "job_id": "job-1",
            "source": "src-geid",
            "action": "data_transfer",
            "code": "project1",
            "operator": "admin",
        }))
        .unwrap()
    }

    fn record(ts: &str) -> JobRecord {
        let mut r = new_job().into_record(0);
        r.update_timestamp = ts.into();
        r
    }

    #[test]
    fn new_job_defaults() {
        let job = new_job();
        assert_eq!(job.label, "Container");
        assert_eq!(job.task_id, "default_task");
        assert_eq!(job.target_status, "INIT");
        assert_eq!(job.progress, 0);
        assert_eq!(job.payload, json!({}));
    }

    #[test]
    fn record_key_and_selector_prefix_agree() {
        let job = new_job();
        let prefix = job.selector().prefix();
        let record = job.into_record(1_700_000_000);

        assert_eq!(
            prefix,
            "dataaction:admin-1:Container:job-1:data_transfer:project1:admin"
        );
        assert_eq!(record.key(), format!("{prefix}:src-geid"));
        assert_eq!(record.update_timestamp, "1700000000");
        assert_eq!(record.status, "INIT");
    }

    #[test]
    fn selector_defaults_to_wildcards() {
        let sel: JobSelector = serde_json::from_value(json!({ "session_id": "s" })).unwrap();
        assert_eq!(sel.prefix(), "dataaction:s:Container:*:*:*:*");
        assert_eq!(sel, JobSelector::session("s", "Container"));

        let narrowed = JobSelector::session("s", "Container")
            .with_job_id("j")
            .with_code("c");
        assert_eq!(narrowed.prefix(), "dataaction:s:Container:j:*:c:*");
    }

    #[test]
    fn merge_payload_adds_and_overwrites() {
        let mut r = record("1");
        r.payload = json!({ "a": 1, "b": 2 });
        let add = json!({ "b": 3, "c": 4 });
        r.merge_payload(add.as_object().unwrap());
        assert_eq!(r.payload, json!({ "a": 1, "b": 3, "c": 4 }));

        r.payload = json!("legacy");
        r.merge_payload(add.as_object().unwrap());
        assert_eq!(r.payload, json!({ "b": 3, "c": 4 }));
    }

    #[test]
    fn sort_is_numeric_and_descending() {
        let mut records = vec![record("9"), record("100"), record("junk"), record("20")];
        sort_by_update_time(&mut records);
        let order: Vec<&str> = records.iter().map(|r| r.update_timestamp.as_str()).collect();
        assert_eq!(order, vec!["100", "20", "9", "junk"]);
    }
}
