//! Status events appended to per-session logs.
//!
//! An event describes progress of one operation on one or more targets
//! inside a container. Events are validated before they are appended and
//! are never modified afterwards. Each session id doubles as the log key,
//! so it must carry the owner's identity prefix followed by a UUID.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

static SESSION_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"-[0-9a-fA-F]{8}\b-[0-9a-fA-F]{4}\b-[0-9a-fA-F]{4}\b-[0-9a-fA-F]{4}\b-[0-9a-fA-F]{12}",
    )
    .expect("valid regex")
});

// ---------------------------------------------------------------------------
// Stored field names
// ---------------------------------------------------------------------------

pub const FIELD_TARGET_NAMES: &str = "target_names";
pub const FIELD_TARGET_TYPE: &str = "target_type";
pub const FIELD_CONTAINER_CODE: &str = "container_code";
pub const FIELD_CONTAINER_TYPE: &str = "container_type";
pub const FIELD_ACTION_TYPE: &str = "action_type";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_JOB_ID: &str = "job_id";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What the event's targets are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    File,
    Folder,
    Batch,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
            Self::Batch => "batch",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            "batch" => Ok(Self::Batch),
            other => Err(CoreError::Validation(format!("Invalid target_type {other}"))),
        }
    }
}

/// Kind of container the targets live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerType {
    Project,
    Dataset,
}

impl ContainerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Dataset => "dataset",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "project" => Ok(Self::Project),
            "dataset" => Ok(Self::Dataset),
            other => Err(CoreError::Validation(format!(
                "Invalid container_type {other}"
            ))),
        }
    }
}

/// Operation being reported on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    DataUpload,
    DataDownload,
    DataTransfer,
    DataDelete,
    DataImport,
    DataRename,
    DataValidate,
}

impl ActionType {
    pub const ALL: [ActionType; 7] = [
        Self::DataUpload,
        Self::DataDownload,
        Self::DataTransfer,
        Self::DataDelete,
        Self::DataImport,
        Self::DataRename,
        Self::DataValidate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataUpload => "data_upload",
            Self::DataDownload => "data_download",
            Self::DataTransfer => "data_transfer",
            Self::DataDelete => "data_delete",
            Self::DataImport => "data_import",
            Self::DataRename => "data_rename",
            Self::DataValidate => "data_validate",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid action_type {s}")))
    }
}

/// Progress state of the operation on its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    Waiting,
    Running,
    Succeed,
    Failed,
    ChunkUploaded,
}

impl FileStatus {
    pub const ALL: [FileStatus; 5] = [
        Self::Waiting,
        Self::Running,
        Self::Succeed,
        Self::Failed,
        Self::ChunkUploaded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Running => "RUNNING",
            Self::Succeed => "SUCCEED",
            Self::Failed => "FAILED",
            Self::ChunkUploaded => "CHUNK_UPLOADED",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid status {s}")))
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Unvalidated event as submitted by a writer.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEventInput {
    pub session_id: String,
    pub target_names: Vec<String>,
    pub target_type: String,
    pub container_code: String,
    pub container_type: String,
    pub action_type: String,
    pub status: String,
    #[serde(default)]
    pub job_id: Option<String>,
}

/// A validated status event. `entry_id` is set once the log has stored it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub session_id: String,
    pub target_names: Vec<String>,
    pub target_type: TargetType,
    pub container_code: String,
    pub container_type: ContainerType,
    pub action_type: ActionType,
    pub status: FileStatus,
    pub job_id: Uuid,
    pub entry_id: Option<String>,
}

/// Check that a session id is `<prefix>-<UUID>`.
pub fn validate_session_id(session_id: &str) -> Result<(), CoreError> {
    if SESSION_ID_RE.is_match(session_id) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid session_id {session_id}"
        )))
    }
}

/// Only `batch` events may carry more than one target name.
fn validate_target_names(target_type: TargetType, names: &[String]) -> Result<(), CoreError> {
    if target_type != TargetType::Batch && names.len() > 1 {
        return Err(CoreError::Validation(format!(
            "Too many target_names for target_type {}",
            target_type.as_str()
        )));
    }
    Ok(())
}

impl StatusEventInput {
    /// Validate every field and produce a typed event.
    ///
    /// A missing `job_id` is replaced by a freshly generated one.
    pub fn validate(self) -> Result<StatusEvent, CoreError> {
        validate_session_id(&self.session_id)?;

        let target_type = TargetType::from_str(&self.target_type)?;
        validate_target_names(target_type, &self.target_names)?;

        let container_type = ContainerType::from_str(&self.container_type)?;
        let action_type = ActionType::from_str(&self.action_type)?;
        let status = FileStatus::from_str(&self.status)?;

        let job_id = match self.job_id.as_deref() {
            None | Some("") => Uuid::new_v4(),
            Some(raw) => Uuid::parse_str(raw)
                .map_err(|_| CoreError::Validation(format!("Invalid job_id {raw}")))?,
        };

        Ok(StatusEvent {
            session_id: self.session_id,
            target_names: self.target_names,
            target_type,
            container_code: self.container_code,
            container_type,
            action_type,
            status,
            job_id,
            entry_id: None,
        })
    }
}

impl StatusEvent {
    /// Flat field list written to the session log.
    ///
    /// `session_id` is the log key and `entry_id` is assigned by the store,
    /// so neither is part of the stored fields.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let names = serde_json::to_string(&self.target_names).unwrap_or_else(|_| "[]".into());
        vec![
            (FIELD_TARGET_NAMES.into(), names),
            (FIELD_TARGET_TYPE.into(), self.target_type.as_str().into()),
            (FIELD_CONTAINER_CODE.into(), self.container_code.clone()),
            (FIELD_CONTAINER_TYPE.into(), self.container_type.as_str().into()),
            (FIELD_ACTION_TYPE.into(), self.action_type.as_str().into()),
            (FIELD_STATUS.into(), self.status.as_str().into()),
            (FIELD_JOB_ID.into(), self.job_id.to_string()),
        ]
    }

    /// Rebuild an event from a stored log entry.
    pub fn from_fields(
        session_id: &str,
        entry_id: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<Self, CoreError> {
        let field = |name: &str| {
            fields
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| CoreError::Validation(format!("Missing field {name}")))
        };

        let target_names: Vec<String> = serde_json::from_str(field(FIELD_TARGET_NAMES)?)
            .map_err(|e| CoreError::Validation(format!("Malformed target_names: {e}")))?;
        let job_id = Uuid::parse_str(field(FIELD_JOB_ID)?)
            .map_err(|e| CoreError::Validation(format!("Malformed job_id: {e}")))?;

        Ok(Self {
            session_id: session_id.to_string(),
            target_names,
            target_type: TargetType::from_str(field(FIELD_TARGET_TYPE)?)?,
            container_code: field(FIELD_CONTAINER_CODE)?.to_string(),
            container_type: ContainerType::from_str(field(FIELD_CONTAINER_TYPE)?)?,
            action_type: ActionType::from_str(field(FIELD_ACTION_TYPE)?)?,
            status: FileStatus::from_str(field(FIELD_STATUS)?)?,
            job_id,
            entry_id: Some(entry_id.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Predicate over events. Empty or absent fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusFilter {
    pub container_code: Option<String>,
    pub container_type: Option<String>,
    pub action_type: Option<String>,
    pub target_names: Option<Vec<String>>,
    pub job_id: Option<String>,
}

fn constrains(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl StatusFilter {
    pub fn matches(&self, event: &StatusEvent) -> bool {
        if let Some(code) = constrains(&self.container_code) {
            if event.container_code != code {
                return false;
            }
        }
        if let Some(kind) = constrains(&self.container_type) {
            if event.container_type.as_str() != kind {
                return false;
            }
        }
        if let Some(action) = constrains(&self.action_type) {
            if event.action_type.as_str() != action {
                return false;
            }
        }
        if let Some(names) = self.target_names.as_ref().filter(|n| !n.is_empty()) {
            if &event.target_names != names {
                return false;
            }
        }
        if let Some(job_id) = constrains(&self.job_id) {
            let same = match Uuid::parse_str(job_id) {
                Ok(parsed) => parsed == event.job_id,
                Err(_) => false,
            };
            if !same {
                return false;
            }
        }
        true
    }
}

/// Keep the events matching `filter`, preserving order.
pub fn filter_events(events: Vec<StatusEvent>, filter: &StatusFilter) -> Vec<StatusEvent> {
    events.into_iter().filter(|e| filter.matches(e)).collect()
}
