//! ---
//! fp_section: "04-external-interfaces"
//! fp_subsection: "crate-root"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Transport-agnostic upward surface of the workflow control plane."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
//! Transports (RPC, REST, CLI) translate their own framing into the request
//! types here and hand them to [`WorkflowService`].

pub mod service;
pub mod types;

pub use service::WorkflowService;
pub use types::{
    ApiError, ApiLogEntry, ApiMetric, ApiParameter, ApiResult, ApiTemplateRef, ApiWorkflow,
    ApiWorkflowTemplate, ArchiveWorkflowTemplateResponse, CreateWorkflowRequest,
    CreateWorkflowTemplateRequest, CreateWorkflowTemplateVersionRequest, GetWorkflowLogsRequest,
    GetWorkflowMetricsRequest, GetWorkflowMetricsResponse, GetWorkflowTemplateRequest,
    ListWorkflowTemplatesResponse, ListWorkflowsRequest, ListWorkflowsResponse, TemplateKey,
    WorkflowKey,
};
