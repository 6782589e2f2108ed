//! Resource operation dispatcher.
//!
//! Validates a copy/delete request against the metadata service, records a
//! RUNNING status event for the new job, and hands the operation to the
//! queue. If the queue rejects it, a FAILED event is appended for the same
//! job and the queue error is returned. A FAILED write that itself fails is
//! only logged.

use std::collections::BTreeSet;
use std::sync::Arc;

use dataops_core::error::CoreError;
use dataops_core::resource::{
    target_type_of, validate_base, validate_target, MetadataItem, ResourceOperation,
};
use dataops_core::stream::{ContainerType, FileStatus, StatusEvent};
use dataops_store::repositories::StatusStreamRepo;
use dataops_store::SharedStore;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::services::metadata::MetadataClient;
use crate::services::queue::{QueueClient, QueueMessage};

/// An item selected for the operation. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationTarget {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationPayload {
    #[serde(default)]
    pub request_info: Option<Value>,
    pub targets: Vec<OperationTarget>,
    /// Id of the folder the targets live in.
    pub source: String,
    /// Id of the destination folder; required for `copy`.
    #[serde(default)]
    pub destination: Option<String>,
}

/// Request body for `POST /v1/files/actions/`.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationRequest {
    pub session_id: String,
    pub payload: OperationPayload,
    pub operator: String,
    pub operation: ResourceOperation,
    pub project_code: String,
}

/// Runs resource operation requests end to end.
pub struct ResourceOperationDispatcher {
    store: SharedStore,
    metadata: Arc<dyn MetadataClient>,
    queue: Arc<dyn QueueClient>,
}

impl ResourceOperationDispatcher {
    pub fn new(
        store: SharedStore,
        metadata: Arc<dyn MetadataClient>,
        queue: Arc<dyn QueueClient>,
    ) -> Self {
        Self {
            store,
            metadata,
            queue,
        }
    }

    /// Validate, record and submit `request` on behalf of the caller whose
    /// bearer token is `access_token`. Returns the RUNNING event written.
    pub async fn execute(
        &self,
        request: &OperationRequest,
        access_token: &str,
    ) -> Result<Vec<StatusEvent>, CoreError> {
        let job_id = Uuid::new_v4();

        if request.operation == ResourceOperation::Copy {
            let destination = request.payload.destination.as_deref().ok_or_else(|| {
                CoreError::InvalidInput("Destination is required for copy".into())
            })?;
            self.check_base(destination).await?;
        }
        self.check_base(&request.payload.source).await?;

        let targets = self.check_targets(&request.payload.targets).await?;

        let running = self
            .record_status(request, &targets, job_id, FileStatus::Running)
            .await?;

        let message = build_message(request, &targets, job_id, access_token);
        if let Err(e) = self.queue.send_message(&message).await {
            tracing::error!(
                session_id = %request.session_id,
                job_id = %job_id,
                error = %e,
                "Operation submission failed, marking job as failed",
            );
            if let Err(record_err) = self
                .record_status(request, &targets, job_id, FileStatus::Failed)
                .await
            {
                tracing::error!(
                    session_id = %request.session_id,
                    job_id = %job_id,
                    error = %record_err,
                    "Could not record failed status",
                );
            }
            return Err(e);
        }

        tracing::info!(
            session_id = %request.session_id,
            job_id = %job_id,
            operation = request.operation.event_type(),
            targets = targets.len(),
            "Resource operation dispatched",
        );
        Ok(vec![running])
    }

    async fn check_base(&self, item_id: &str) -> Result<(), CoreError> {
        let item = self.metadata.get_item(item_id).await?;
        validate_base(&item).inspect_err(|e| {
            tracing::warn!(item_id, error = %e, "Rejected operation base");
        })
    }

    async fn check_targets(
        &self,
        targets: &[OperationTarget],
    ) -> Result<Vec<MetadataItem>, CoreError> {
        let mut fetched = Vec::with_capacity(targets.len());
        for target in targets {
            let item = self.metadata.get_item(&target.id).await?;
            validate_target(&item).inspect_err(|e| {
                tracing::warn!(item_id = %target.id, error = %e, "Rejected operation target");
            })?;
            fetched.push(item);
        }
        Ok(fetched)
    }

    async fn record_status(
        &self,
        request: &OperationRequest,
        targets: &[MetadataItem],
        job_id: Uuid,
        status: FileStatus,
    ) -> Result<StatusEvent, CoreError> {
        let event = StatusEvent {
            session_id: request.session_id.clone(),
            target_names: targets.iter().map(|t| t.name.clone()).collect(),
            target_type: target_type_of(targets)?,
            container_code: request.project_code.clone(),
            container_type: ContainerType::Project,
            action_type: request.operation.action_type(),
            status,
            job_id,
            entry_id: None,
        };
        StatusStreamRepo::append_event(self.store.as_ref(), event).await
    }
}

fn build_message(
    request: &OperationRequest,
    targets: &[MetadataItem],
    job_id: Uuid,
    access_token: &str,
) -> QueueMessage {
    let mut payload = json!({
        "session_id": request.session_id,
        "job_id": job_id.to_string(),
        "source_geid": request.payload.source,
        "include_geids": targets.iter().map(|t| t.id.as_str()).collect::<BTreeSet<_>>(),
        "project": request.project_code,
        "generic": true,
        "operator": request.operator,
        "access_token": access_token,
    });

    if request.operation == ResourceOperation::Copy {
        payload["request_info"] = request
            .payload
            .request_info
            .clone()
            .unwrap_or_else(|| json!({}));
        payload["destination_geid"] = json!(request.payload.destination);
    }

    let now = chrono::Utc::now();
    QueueMessage {
        event_type: request.operation.event_type().to_string(),
        payload,
        create_timestamp: now.timestamp_millis() as f64 / 1000.0,
    }
}
