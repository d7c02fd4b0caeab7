//! ---
//! fp_section: "02-workflow-lifecycle"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Lifecycle manager composing the template store and the orchestration engine."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use std::sync::Arc;

use flowplane_common::AppConfig;
use tracing::{debug, info, warn};

use crate::collab::{
    EngineWorkflow, ListOptions, LogOptions, OrchestrationClient, TemplateStore, WorkflowOptions,
};
use crate::error::{ManagerError, Result};
use crate::labels::CorrelationLabels;
use crate::logs::{spawn_log_bridge, LogStream, LOG_CHANNEL_CAPACITY};
use crate::model::{Metric, NewTemplate, Parameter, Template, TemplateRef, Workflow};
use crate::watch::{spawn_bridge, WatchSettings, WatchTarget, WorkflowWatch};

const TEMPLATE_KIND: &str = "Workflow template";
const WORKFLOW_KIND: &str = "Workflow";

/// Create/get/list/watch/resubmit/terminate of workflow instances plus
/// template versioning, with every collaborator error classified on the way out.
#[derive(Clone)]
pub struct WorkflowManager {
    store: Arc<dyn TemplateStore>,
    engine: Arc<dyn OrchestrationClient>,
    labels: CorrelationLabels,
    watch: WatchSettings,
}

impl WorkflowManager {
    pub fn new(
        store: Arc<dyn TemplateStore>,
        engine: Arc<dyn OrchestrationClient>,
        labels: CorrelationLabels,
    ) -> Self {
        Self {
            store,
            engine,
            labels,
            watch: WatchSettings::default(),
        }
    }

    pub fn from_config(
        store: Arc<dyn TemplateStore>,
        engine: Arc<dyn OrchestrationClient>,
        config: &AppConfig,
    ) -> Self {
        Self::new(store, engine, CorrelationLabels::from_config(&config.labels))
            .with_watch_settings(WatchSettings::from(&config.watch))
    }

    pub fn with_watch_settings(mut self, settings: WatchSettings) -> Self {
        self.watch = settings;
        self
    }

    pub fn labels(&self) -> &CorrelationLabels {
        &self.labels
    }

    /// Instantiate a template version on the engine.
    ///
    /// A `template_ref` version of `0` runs the latest version; the label
    /// written on the instance always names the concrete version.
    pub async fn create_workflow(
        &self,
        namespace: &str,
        template_ref: &TemplateRef,
        parameters: Vec<Parameter>,
    ) -> Result<Workflow> {
        let template = self
            .require_template(namespace, &template_ref.uid, template_ref.version)
            .await?;
        if template.is_archived {
            warn!(
                namespace,
                template_uid = %template.uid,
                version = template.version,
                "instantiating archived workflow template"
            );
        }

        let mut options = WorkflowOptions {
            parameters: parameters.clone(),
            ..WorkflowOptions::default()
        };
        self.labels
            .stamp(&mut options.labels, &template.uid, template.version);

        let created = self
            .engine
            .create(namespace, template.manifest_bytes(), options)
            .await
            .map_err(|err| ManagerError::from_engine(WORKFLOW_KIND, err))?;
        info!(
            namespace,
            workflow = %created.metadata.name,
            template_uid = %template.uid,
            version = template.version,
            "workflow created"
        );

        Ok(Workflow {
            uid: created.metadata.uid,
            name: created.metadata.name,
            phase: Some(created.status.phase),
            created_at: Some(created.metadata.creation_timestamp),
            finished_at: created.status.finished_at,
            parameters,
            status: None,
            template_ref: Some(template.reference()),
            template: Some(template.without_manifest()),
        })
    }

    pub async fn get_workflow(&self, namespace: &str, name: &str) -> Result<Workflow> {
        let object = self.fetch(namespace, name).await?;
        let template_ref = self.labels.resolve(&object.metadata.labels)?;
        let template = self
            .require_template(namespace, &template_ref.uid, template_ref.version)
            .await?;
        let status = serde_json::to_string(&object.status)
            .map_err(|err| ManagerError::unknown(format!("{}: {}", WORKFLOW_KIND, err)))?;

        Ok(Workflow {
            uid: object.metadata.uid,
            name: object.metadata.name,
            phase: Some(object.status.phase),
            created_at: Some(object.metadata.creation_timestamp),
            finished_at: object.status.finished_at,
            parameters: object.parameters,
            status: Some(status),
            template_ref: Some(template_ref),
            template: Some(template),
        })
    }

    /// Open a snapshot stream that ends after the first terminal snapshot.
    ///
    /// Template context is resolved once here; a failure to resolve it or to
    /// open the engine subscription is returned before any stream exists.
    pub async fn watch_workflow(&self, namespace: &str, name: &str) -> Result<WorkflowWatch> {
        let initial = self.get_workflow(namespace, name).await?;
        let subscription = self
            .engine
            .watch(namespace, name)
            .await
            .map_err(|err| ManagerError::from_engine(WORKFLOW_KIND, err))?;
        info!(namespace, workflow = name, "workflow watch opened");

        let target = WatchTarget {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            template_ref: initial.template_ref,
            template: initial.template.as_ref().map(Template::without_manifest),
        };
        Ok(spawn_bridge(target, subscription, self.watch))
    }

    /// Name and uid of every instance, optionally narrowed to one template (and version).
    pub async fn list_workflows(
        &self,
        namespace: &str,
        template_uid: Option<&str>,
        template_version: Option<i32>,
    ) -> Result<Vec<Workflow>> {
        let label_selector = template_uid
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .map(|uid| {
                self.labels
                    .selector(uid, template_version.filter(|version| *version > 0))
            })
            .transpose()?;
        debug!(namespace, selector = ?label_selector, "listing workflows");

        let objects = self
            .engine
            .list(namespace, &ListOptions { label_selector })
            .await
            .map_err(|err| ManagerError::from_engine("Workflows", err))?;
        Ok(objects
            .into_iter()
            .map(|object| Workflow {
                uid: object.metadata.uid,
                name: object.metadata.name,
                ..Workflow::default()
            })
            .collect())
    }

    /// Start a fresh instance from an existing one.
    ///
    /// The engine copies labels onto the new instance, so its template
    /// reference is read back from there without a store lookup.
    pub async fn resubmit_workflow(&self, namespace: &str, name: &str) -> Result<Workflow> {
        let created = self
            .engine
            .resubmit(namespace, name)
            .await
            .map_err(|err| ManagerError::from_engine(WORKFLOW_KIND, err))?;
        let template_ref = match self.labels.resolve(&created.metadata.labels) {
            Ok(template_ref) => Some(template_ref),
            Err(err) => {
                warn!(namespace, workflow = %created.metadata.name, error = %err, "resubmitted workflow has no template reference");
                None
            }
        };
        info!(namespace, workflow = name, resubmitted_as = %created.metadata.name, "workflow resubmitted");

        Ok(Workflow {
            uid: created.metadata.uid,
            name: created.metadata.name,
            phase: Some(created.status.phase),
            created_at: Some(created.metadata.creation_timestamp),
            parameters: created.parameters,
            template_ref,
            ..Workflow::default()
        })
    }

    pub async fn terminate_workflow(&self, namespace: &str, name: &str) -> Result<()> {
        self.engine
            .terminate(namespace, name)
            .await
            .map_err(|err| ManagerError::from_engine(WORKFLOW_KIND, err))?;
        info!(namespace, workflow = name, "workflow terminated");
        Ok(())
    }

    /// Follow container output of an instance.
    ///
    /// Lines already written are delivered first; the stream ends once the
    /// engine reports the followed containers as exited.
    pub async fn get_workflow_logs(
        &self,
        namespace: &str,
        name: &str,
        pod_name: Option<&str>,
        container: Option<&str>,
    ) -> Result<LogStream> {
        let options = LogOptions {
            pod_name: non_blank(pod_name),
            container: non_blank(container),
        };
        let feed = self
            .engine
            .logs(namespace, name, &options)
            .await
            .map_err(|err| ManagerError::from_engine(WORKFLOW_KIND, err))?;
        info!(namespace, workflow = name, pod = ?options.pod_name, "workflow log stream opened");
        Ok(spawn_log_bridge(namespace, name, feed, LOG_CHANNEL_CAPACITY))
    }

    pub async fn get_workflow_metrics(
        &self,
        namespace: &str,
        name: &str,
        pod_name: Option<&str>,
    ) -> Result<Vec<Metric>> {
        let pod_name = non_blank(pod_name);
        self.engine
            .metrics(namespace, name, pod_name.as_deref())
            .await
            .map_err(|err| ManagerError::from_engine(WORKFLOW_KIND, err))
    }

    pub async fn create_workflow_template(
        &self,
        namespace: &str,
        template: NewTemplate,
    ) -> Result<Template> {
        self.validate(template.manifest.as_bytes())?;
        let created = self
            .store
            .create_template(namespace, template)
            .await
            .map_err(|err| ManagerError::user_wrap(TEMPLATE_KIND, err))?;
        info!(namespace, template_uid = %created.uid, name = %created.name, "workflow template created");
        Ok(created)
    }

    pub async fn create_workflow_template_version(
        &self,
        namespace: &str,
        uid: &str,
        manifest: String,
    ) -> Result<Template> {
        self.validate(manifest.as_bytes())?;
        let created = self
            .store
            .create_template_version(namespace, uid, manifest)
            .await
            .map_err(|err| ManagerError::user_wrap(TEMPLATE_KIND, err))?
            .ok_or_else(template_not_found)?;
        info!(namespace, template_uid = %uid, version = created.version, "workflow template version created");
        Ok(created)
    }

    /// Fetch one template version; `version <= 0` selects the latest.
    pub async fn get_workflow_template(
        &self,
        namespace: &str,
        uid: &str,
        version: i32,
    ) -> Result<Template> {
        self.require_template(namespace, uid, version).await
    }

    pub async fn list_workflow_template_versions(
        &self,
        namespace: &str,
        uid: &str,
    ) -> Result<Vec<Template>> {
        let versions = self
            .store
            .list_versions(namespace, uid)
            .await
            .map_err(|err| ManagerError::user_wrap(TEMPLATE_KIND, err))?;
        if versions.is_empty() {
            return Err(template_not_found());
        }
        Ok(versions)
    }

    pub async fn list_workflow_templates(&self, namespace: &str) -> Result<Vec<Template>> {
        self.store
            .list_templates(namespace)
            .await
            .map_err(|err| ManagerError::user_wrap(TEMPLATE_KIND, err))
    }

    /// Archive every version of a template. Archiving twice is not an error.
    pub async fn archive_workflow_template(&self, namespace: &str, uid: &str) -> Result<bool> {
        let archived = self
            .store
            .archive_template(namespace, uid)
            .await
            .map_err(|err| ManagerError::user_wrap(TEMPLATE_KIND, err))?
            .ok_or_else(template_not_found)?;
        info!(namespace, template_uid = %uid, archived, "workflow template archived");
        Ok(archived)
    }

    async fn fetch(&self, namespace: &str, name: &str) -> Result<EngineWorkflow> {
        self.engine
            .get(namespace, name)
            .await
            .map_err(|err| ManagerError::from_engine(WORKFLOW_KIND, err))
    }

    async fn require_template(&self, namespace: &str, uid: &str, version: i32) -> Result<Template> {
        self.store
            .get_template(namespace, uid, version)
            .await
            .map_err(|err| ManagerError::user_wrap(TEMPLATE_KIND, err))?
            .ok_or_else(template_not_found)
    }

    fn validate(&self, manifest: &[u8]) -> Result<()> {
        self.engine
            .validate_manifest(manifest)
            .map_err(|err| ManagerError::from_engine(TEMPLATE_KIND, err))
    }
}

fn template_not_found() -> ManagerError {
    ManagerError::not_found("Workflow template not found.")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
