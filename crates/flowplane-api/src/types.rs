//! ---
//! fp_section: "04-external-interfaces"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Request and response shapes exposed to transport layers."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use chrono::{DateTime, SecondsFormat, Utc};
use flowplane_core::{
    ErrorCode, LogEntry, ManagerError, Metric, Parameter, Template, TemplateRef, Workflow,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified failure returned instead of a response.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

pub(crate) fn rfc3339(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl From<Parameter> for ApiParameter {
    fn from(parameter: Parameter) -> Self {
        Self {
            name: parameter.name,
            value: parameter.value,
        }
    }
}

impl From<ApiParameter> for Parameter {
    fn from(parameter: ApiParameter) -> Self {
        Self {
            name: parameter.name,
            value: parameter.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiWorkflowTemplate {
    pub uid: String,
    pub name: String,
    pub version: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manifest: String,
    pub is_latest: bool,
    pub is_archived: bool,
    pub created_at: String,
}

impl From<Template> for ApiWorkflowTemplate {
    fn from(template: Template) -> Self {
        Self {
            uid: template.uid,
            name: template.name,
            version: template.version,
            manifest: template.manifest,
            is_latest: template.is_latest,
            is_archived: template.is_archived,
            created_at: rfc3339(template.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTemplateRef {
    pub uid: String,
    pub version: i32,
}

impl From<TemplateRef> for ApiTemplateRef {
    fn from(template_ref: TemplateRef) -> Self {
        Self {
            uid: template_ref.uid,
            version: template_ref.version,
        }
    }
}

/// Workflow as seen by callers. Absent fields were not populated by the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiWorkflow {
    pub uid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ApiParameter>,
    /// Engine status as an opaque JSON document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_ref: Option<ApiTemplateRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_template: Option<ApiWorkflowTemplate>,
}

impl ApiWorkflow {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

impl From<Workflow> for ApiWorkflow {
    fn from(workflow: Workflow) -> Self {
        Self {
            uid: workflow.uid,
            name: workflow.name,
            phase: workflow.phase.map(|phase| phase.to_string()),
            created_at: workflow.created_at.map(rfc3339),
            finished_at: workflow.finished_at.map(rfc3339),
            parameters: workflow.parameters.into_iter().map(Into::into).collect(),
            status: workflow.status,
            template_ref: workflow.template_ref.map(Into::into),
            workflow_template: workflow.template.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowRequest {
    pub namespace: String,
    pub template_uid: String,
    /// `0` runs the latest version.
    #[serde(default)]
    pub template_version: i32,
    #[serde(default)]
    pub parameters: Vec<ApiParameter>,
}

/// Addresses one workflow instance; used by get, watch, resubmit and terminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowKey {
    pub namespace: String,
    pub name: String,
}

impl WorkflowKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListWorkflowsRequest {
    pub namespace: String,
    #[serde(default)]
    pub template_uid: Option<String>,
    #[serde(default)]
    pub template_version: Option<i32>,
    #[serde(default)]
    pub page: i32,
    #[serde(default)]
    pub page_size: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWorkflowsResponse {
    pub count: u32,
    pub workflows: Vec<ApiWorkflow>,
    pub page: u32,
    pub pages: u32,
    pub total_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWorkflowTemplateRequest {
    pub namespace: String,
    pub name: String,
    pub manifest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWorkflowTemplateVersionRequest {
    pub namespace: String,
    pub uid: String,
    pub manifest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetWorkflowTemplateRequest {
    pub namespace: String,
    pub uid: String,
    /// `0` selects the latest version.
    #[serde(default)]
    pub version: i32,
}

/// Addresses every version of one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateKey {
    pub namespace: String,
    pub uid: String,
}

impl TemplateKey {
    pub fn new(namespace: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            uid: uid.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWorkflowTemplatesResponse {
    pub count: u32,
    pub workflow_templates: Vec<ApiWorkflowTemplate>,
}

impl ListWorkflowTemplatesResponse {
    pub(crate) fn from_templates(templates: Vec<Template>) -> Self {
        Self {
            count: templates.len() as u32,
            workflow_templates: templates.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveWorkflowTemplateResponse {
    pub is_archived: bool,
}

/// Empty `pod_name` follows every pod; empty `container_name` means the main container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWorkflowLogsRequest {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub pod_name: Option<String>,
    #[serde(default)]
    pub container_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLogEntry {
    pub timestamp: String,
    pub content: String,
}

impl From<LogEntry> for ApiLogEntry {
    fn from(entry: LogEntry) -> Self {
        Self {
            timestamp: rfc3339(entry.timestamp),
            content: entry.content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWorkflowMetricsRequest {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub pod_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMetric {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl From<Metric> for ApiMetric {
    fn from(metric: Metric) -> Self {
        Self {
            name: metric.name,
            value: metric.value,
            format: metric.format,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetWorkflowMetricsResponse {
    pub metrics: Vec<ApiMetric>,
}
