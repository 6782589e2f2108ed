//! Resource operation vocabulary: item kinds, archive status, and the
//! rules used to accept or reject a copy/delete request.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::stream::{ActionType, TargetType};

pub const RESOURCE_NAME_FOLDER: &str = "name_folder";
pub const RESOURCE_FILE: &str = "file";
pub const RESOURCE_FOLDER: &str = "folder";
pub const RESOURCE_CONTAINER: &str = "container";

/// Item kinds that can act as the source or destination of an operation.
pub const VALID_BASE_TYPES: &[&str] = &[RESOURCE_NAME_FOLDER, RESOURCE_FOLDER, RESOURCE_CONTAINER];

/// Item kinds that can be targeted by an operation.
pub const VALID_TARGET_TYPES: &[&str] = &[RESOURCE_FILE, RESOURCE_FOLDER];

/// Archived items are deleted and cannot be operated on.
pub const ITEM_STATUS_ARCHIVED: &str = "ARCHIVED";

/// An item as described by the metadata service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub status: String,
}

/// Long-running operation requested on a set of targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceOperation {
    Copy,
    Delete,
}

impl ResourceOperation {
    /// Queue event type consumed by the pipeline workers.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Copy => "folder_copy",
            Self::Delete => "folder_delete",
        }
    }

    /// Action reported on the status stream.
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Copy => ActionType::DataTransfer,
            Self::Delete => ActionType::DataDelete,
        }
    }
}

/// Source and destination must be folder-like.
pub fn validate_base(item: &MetadataItem) -> Result<(), CoreError> {
    if VALID_BASE_TYPES.contains(&item.item_type.as_str()) {
        Ok(())
    } else {
        Err(CoreError::InvalidInput(format!(
            "Source/destination {} is not a valid resource type: {}",
            item.id, item.item_type
        )))
    }
}

/// Targets must be live files or folders.
pub fn validate_target(item: &MetadataItem) -> Result<(), CoreError> {
    if item.status == ITEM_STATUS_ARCHIVED {
        return Err(CoreError::InvalidInput(format!(
            "Target resource {} is archived",
            item.id
        )));
    }
    if !VALID_TARGET_TYPES.contains(&item.item_type.as_str()) {
        return Err(CoreError::InvalidInput(format!(
            "Target resource {} is not a valid resource type: {}",
            item.id, item.item_type
        )));
    }
    Ok(())
}

/// Stream target type for a validated target set: the item's own type for
/// a single target, `batch` otherwise.
pub fn target_type_of(items: &[MetadataItem]) -> Result<TargetType, CoreError> {
    match items {
        [single] => TargetType::from_str(&single.item_type),
        _ => Ok(TargetType::Batch),
    }
}
