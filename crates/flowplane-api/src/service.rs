//! ---
//! fp_section: "04-external-interfaces"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Workflow service facade mapping core records to response shapes."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use flowplane_common::AppConfig;
use flowplane_core::{
    paginate_with, NewTemplate, PageDefaults, PageRequest, TemplateRef, WorkflowManager,
};
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::debug;

use crate::types::*;

/// Every upward operation in one place. Each call yields either a response
/// or an [`ApiError`], never both.
#[derive(Clone)]
pub struct WorkflowService {
    manager: WorkflowManager,
    page_defaults: PageDefaults,
}

impl WorkflowService {
    pub fn new(manager: WorkflowManager) -> Self {
        Self {
            manager,
            page_defaults: PageDefaults::default(),
        }
    }

    pub fn from_config(manager: WorkflowManager, config: &AppConfig) -> Self {
        Self {
            manager,
            page_defaults: PageDefaults::from(&config.paging),
        }
    }

    pub fn manager(&self) -> &WorkflowManager {
        &self.manager
    }

    pub async fn create_workflow(&self, request: CreateWorkflowRequest) -> ApiResult<ApiWorkflow> {
        let template_ref = TemplateRef::new(request.template_uid, request.template_version);
        let parameters = request.parameters.into_iter().map(Into::into).collect();
        let workflow = self
            .manager
            .create_workflow(&request.namespace, &template_ref, parameters)
            .await?;
        Ok(workflow.into())
    }

    pub async fn get_workflow(&self, request: WorkflowKey) -> ApiResult<ApiWorkflow> {
        let workflow = self
            .manager
            .get_workflow(&request.namespace, &request.name)
            .await?;
        Ok(workflow.into())
    }

    /// Snapshot stream ending after the first finished snapshot or a stream error.
    pub async fn watch_workflow(
        &self,
        request: WorkflowKey,
    ) -> ApiResult<BoxStream<'static, ApiResult<ApiWorkflow>>> {
        let watch = self
            .manager
            .watch_workflow(&request.namespace, &request.name)
            .await?;
        Ok(watch
            .map(|item| item.map(ApiWorkflow::from).map_err(ApiError::from))
            .boxed())
    }

    /// Container output, backlog first; ends when the engine ends the feed.
    pub async fn get_workflow_logs(
        &self,
        request: GetWorkflowLogsRequest,
    ) -> ApiResult<BoxStream<'static, ApiResult<ApiLogEntry>>> {
        let logs = self
            .manager
            .get_workflow_logs(
                &request.namespace,
                &request.name,
                request.pod_name.as_deref(),
                request.container_name.as_deref(),
            )
            .await?;
        Ok(logs
            .map(|item| item.map(ApiLogEntry::from).map_err(ApiError::from))
            .boxed())
    }

    pub async fn get_workflow_metrics(
        &self,
        request: GetWorkflowMetricsRequest,
    ) -> ApiResult<GetWorkflowMetricsResponse> {
        let metrics = self
            .manager
            .get_workflow_metrics(&request.namespace, &request.name, request.pod_name.as_deref())
            .await?;
        Ok(GetWorkflowMetricsResponse {
            metrics: metrics.into_iter().map(Into::into).collect(),
        })
    }

    pub async fn list_workflows(
        &self,
        request: ListWorkflowsRequest,
    ) -> ApiResult<ListWorkflowsResponse> {
        let workflows = self
            .manager
            .list_workflows(
                &request.namespace,
                request.template_uid.as_deref(),
                request.template_version,
            )
            .await?;
        let page = paginate_with(
            workflows,
            PageRequest::new(request.page, request.page_size),
            self.page_defaults,
        );
        debug!(
            namespace = %request.namespace,
            page = page.page,
            pages = page.pages,
            total = page.total_count,
            "listed workflows"
        );
        Ok(ListWorkflowsResponse {
            count: page.count,
            page: page.page,
            pages: page.pages,
            total_count: page.total_count,
            workflows: page.items.into_iter().map(Into::into).collect(),
        })
    }

    pub async fn resubmit_workflow(&self, request: WorkflowKey) -> ApiResult<ApiWorkflow> {
        let workflow = self
            .manager
            .resubmit_workflow(&request.namespace, &request.name)
            .await?;
        Ok(workflow.into())
    }

    pub async fn terminate_workflow(&self, request: WorkflowKey) -> ApiResult<()> {
        self.manager
            .terminate_workflow(&request.namespace, &request.name)
            .await?;
        Ok(())
    }

    pub async fn create_workflow_template(
        &self,
        request: CreateWorkflowTemplateRequest,
    ) -> ApiResult<ApiWorkflowTemplate> {
        let template = self
            .manager
            .create_workflow_template(
                &request.namespace,
                NewTemplate::new(request.name, request.manifest),
            )
            .await?;
        Ok(template.into())
    }

    pub async fn create_workflow_template_version(
        &self,
        request: CreateWorkflowTemplateVersionRequest,
    ) -> ApiResult<ApiWorkflowTemplate> {
        let template = self
            .manager
            .create_workflow_template_version(&request.namespace, &request.uid, request.manifest)
            .await?;
        Ok(template.into())
    }

    pub async fn get_workflow_template(
        &self,
        request: GetWorkflowTemplateRequest,
    ) -> ApiResult<ApiWorkflowTemplate> {
        let template = self
            .manager
            .get_workflow_template(&request.namespace, &request.uid, request.version)
            .await?;
        Ok(template.into())
    }

    pub async fn list_workflow_template_versions(
        &self,
        request: TemplateKey,
    ) -> ApiResult<ListWorkflowTemplatesResponse> {
        let versions = self
            .manager
            .list_workflow_template_versions(&request.namespace, &request.uid)
            .await?;
        Ok(ListWorkflowTemplatesResponse::from_templates(versions))
    }

    pub async fn list_workflow_templates(
        &self,
        namespace: &str,
    ) -> ApiResult<ListWorkflowTemplatesResponse> {
        let templates = self.manager.list_workflow_templates(namespace).await?;
        Ok(ListWorkflowTemplatesResponse::from_templates(templates))
    }

    pub async fn archive_workflow_template(
        &self,
        request: TemplateKey,
    ) -> ApiResult<ArchiveWorkflowTemplateResponse> {
        let is_archived = self
            .manager
            .archive_workflow_template(&request.namespace, &request.uid)
            .await?;
        Ok(ArchiveWorkflowTemplateResponse { is_archived })
    }
}
