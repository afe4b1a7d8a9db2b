use crate::event::CorrelationIds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// The single completion signal sent back for a lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletionResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: BTreeMap<String, String>,
}

impl CompletionResponse {
    /// Build a response echoing the correlation ids of the event it answers.
    pub fn new(
        ids: &CorrelationIds,
        status: ResponseStatus,
        reason: impl Into<String>,
        physical_resource_id: impl Into<String>,
        data: BTreeMap<String, String>,
    ) -> Self {
        CompletionResponse {
            status,
            reason: reason.into(),
            physical_resource_id: physical_resource_id.into(),
            stack_id: ids.stack_id.clone(),
            request_id: ids.request_id.clone(),
            logical_resource_id: ids.logical_resource_id.clone(),
            data,
        }
    }
}
