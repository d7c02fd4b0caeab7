//! ---
//! fp_section: "04-external-interfaces"
//! fp_subsection: "integration-tests"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Workflow service facade exercised end to end over in-memory collaborators."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use flowplane_api::{
    ApiParameter, CreateWorkflowRequest, CreateWorkflowTemplateRequest,
    CreateWorkflowTemplateVersionRequest, GetWorkflowLogsRequest, GetWorkflowMetricsRequest,
    GetWorkflowTemplateRequest, ListWorkflowsRequest, TemplateKey, WorkflowKey, WorkflowService,
};
use flowplane_common::AppConfig;
use flowplane_core::collab::{InMemoryEngine, InMemoryTemplateStore};
use flowplane_core::{ErrorCode, Metric, Phase, WorkflowManager};
use futures::StreamExt;

const NS: &str = "default";
const MANIFEST: &str = "metadata:\n  generateName: report-\nspec:\n  entrypoint: main\n  templates:\n    - name: main\n";

fn service_with(config: &AppConfig) -> (WorkflowService, Arc<InMemoryEngine>) {
    let engine = Arc::new(InMemoryEngine::new());
    let manager = WorkflowManager::from_config(
        Arc::new(InMemoryTemplateStore::new()),
        engine.clone(),
        config,
    );
    (WorkflowService::from_config(manager, config), engine)
}

async fn template_uid(service: &WorkflowService) -> String {
    service
        .create_workflow_template(CreateWorkflowTemplateRequest {
            namespace: NS.into(),
            name: "report".into(),
            manifest: MANIFEST.into(),
        })
        .await
        .expect("template created")
        .uid
}

async fn start(service: &WorkflowService, uid: &str) -> String {
    service
        .create_workflow(CreateWorkflowRequest {
            namespace: NS.into(),
            template_uid: uid.to_owned(),
            template_version: 0,
            parameters: vec![ApiParameter {
                name: "day".into(),
                value: Some("monday".into()),
            }],
        })
        .await
        .expect("workflow created")
        .name
}

#[tokio::test]
async fn list_workflows_paginates_with_defaults() {
    let (service, _) = service_with(&AppConfig::default());
    let uid = template_uid(&service).await;
    for _ in 0..22 {
        start(&service, &uid).await;
    }

    let first = service
        .list_workflows(ListWorkflowsRequest {
            namespace: NS.into(),
            ..ListWorkflowsRequest::default()
        })
        .await
        .expect("first page");
    assert_eq!((first.page, first.pages, first.count, first.total_count), (1, 2, 15, 22));
    assert!(first.workflows.iter().all(|wf| wf.status.is_none()));

    let past_end = service
        .list_workflows(ListWorkflowsRequest {
            namespace: NS.into(),
            template_uid: Some(uid.clone()),
            page: 3,
            page_size: 15,
            ..ListWorkflowsRequest::default()
        })
        .await
        .expect("clamped page");
    assert_eq!((past_end.page, past_end.count), (2, 7));

    let empty = service
        .list_workflows(ListWorkflowsRequest {
            namespace: "nothing-here".into(),
            page: 4,
            ..ListWorkflowsRequest::default()
        })
        .await
        .expect("empty page");
    assert_eq!((empty.count, empty.pages), (0, 0));
    assert!(empty.workflows.is_empty());
}

#[tokio::test]
async fn configured_page_size_applies() {
    let config: AppConfig = "[paging]\ndefault_page_size = 5\n".parse().expect("config");
    let (service, _) = service_with(&config);
    let uid = template_uid(&service).await;
    for _ in 0..7 {
        start(&service, &uid).await;
    }
    let page = service
        .list_workflows(ListWorkflowsRequest {
            namespace: NS.into(),
            ..ListWorkflowsRequest::default()
        })
        .await
        .unwrap();
    assert_eq!((page.count, page.pages), (5, 2));
}

#[tokio::test]
async fn template_lifecycle_through_the_facade() {
    let (service, _) = service_with(&AppConfig::default());
    let uid = template_uid(&service).await;
    let v2 = service
        .create_workflow_template_version(CreateWorkflowTemplateVersionRequest {
            namespace: NS.into(),
            uid: uid.clone(),
            manifest: MANIFEST.into(),
        })
        .await
        .expect("version 2");
    assert_eq!(v2.version, 2);
    assert!(v2.is_latest);

    let v1 = service
        .get_workflow_template(GetWorkflowTemplateRequest {
            namespace: NS.into(),
            uid: uid.clone(),
            version: 1,
        })
        .await
        .expect("version 1");
    assert!(!v1.is_latest);
    assert!(v1.created_at.ends_with('Z'));

    let versions = service
        .list_workflow_template_versions(TemplateKey::new(NS, &uid))
        .await
        .unwrap();
    assert_eq!(versions.count, 2);

    let archived = service
        .archive_workflow_template(TemplateKey::new(NS, &uid))
        .await
        .unwrap();
    assert!(archived.is_archived);
    assert_eq!(service.list_workflow_templates(NS).await.unwrap().count, 0);
}

#[tokio::test]
async fn errors_carry_codes() {
    let (service, _) = service_with(&AppConfig::default());
    let err = service
        .get_workflow(WorkflowKey::new(NS, "ghost"))
        .await
        .expect_err("missing workflow");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = service
        .create_workflow_template(CreateWorkflowTemplateRequest {
            namespace: NS.into(),
            name: "broken".into(),
            manifest: "not: [a, manifest".into(),
        })
        .await
        .expect_err("invalid manifest");
    assert_eq!(err.code, ErrorCode::InvalidArgument);
}

#[tokio::test(start_paused = true)]
async fn watch_stream_ends_with_finished_workflow() {
    let (service, engine) = service_with(&AppConfig::default());
    let uid = template_uid(&service).await;
    let name = start(&service, &uid).await;

    let mut stream = service
        .watch_workflow(WorkflowKey::new(NS, &name))
        .await
        .expect("watch opens");
    let first = stream.next().await.expect("snapshot").expect("ok");
    assert_eq!(first.phase.as_deref(), Some("Pending"));
    assert_eq!(first.template_ref.as_ref().map(|r| r.version), Some(1));

    engine.set_phase(NS, &name, Phase::Running).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    service
        .terminate_workflow(WorkflowKey::new(NS, &name))
        .await
        .expect("terminate");

    let rest: Vec<_> = stream.collect().await;
    let last = rest.last().expect("terminal snapshot").as_ref().expect("ok");
    assert_eq!(last.phase.as_deref(), Some("Terminated"));
    assert!(last.is_finished());
    assert_eq!(engine.active_watches(), 0);
}

#[tokio::test]
async fn logs_stream_until_workflow_finishes() {
    let (service, engine) = service_with(&AppConfig::default());
    let uid = template_uid(&service).await;
    let name = start(&service, &uid).await;
    engine.append_log(NS, &name, "report-pod", "main", "collecting").unwrap();
    engine.append_log(NS, &name, "report-pod", "wait", "sidecar").unwrap();

    let mut logs = service
        .get_workflow_logs(GetWorkflowLogsRequest {
            namespace: NS.into(),
            name: name.clone(),
            pod_name: Some("report-pod".into()),
            container_name: None,
        })
        .await
        .expect("log stream opens");
    let first = logs.next().await.expect("backlog line").expect("ok");
    assert_eq!(first.content, "collecting");
    assert!(first.timestamp.ends_with('Z'));

    engine.append_log(NS, &name, "report-pod", "main", "rendering").unwrap();
    service
        .terminate_workflow(WorkflowKey::new(NS, &name))
        .await
        .expect("terminate");
    let rest: Vec<_> = logs.collect().await;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].as_ref().expect("ok").content, "rendering");
    assert_eq!(engine.active_log_feeds(), 0);
}

#[tokio::test]
async fn log_feed_failure_reaches_the_caller() {
    let (service, engine) = service_with(&AppConfig::default());
    let uid = template_uid(&service).await;
    let name = start(&service, &uid).await;

    let mut logs = service
        .get_workflow_logs(GetWorkflowLogsRequest {
            namespace: NS.into(),
            name: name.clone(),
            pod_name: None,
            container_name: None,
        })
        .await
        .expect("log stream opens");
    engine.inject_log_error(
        NS,
        &name,
        flowplane_core::collab::EngineError::Transport("reset".into()),
    );
    let err = logs.next().await.expect("error item").expect_err("stream error");
    assert_eq!(err.code, ErrorCode::Unavailable);
    assert!(logs.next().await.is_none());
}

#[tokio::test]
async fn metrics_are_passed_through() {
    let (service, engine) = service_with(&AppConfig::default());
    let uid = template_uid(&service).await;
    let name = start(&service, &uid).await;
    engine
        .record_metric(NS, &name, "report-pod", Metric::new("rows", 1200.0))
        .unwrap();

    let response = service
        .get_workflow_metrics(GetWorkflowMetricsRequest {
            namespace: NS.into(),
            name: name.clone(),
            pod_name: None,
        })
        .await
        .expect("metrics");
    assert_eq!(response.metrics.len(), 1);
    assert_eq!(response.metrics[0].name, "rows");
    assert_eq!(response.metrics[0].value, 1200.0);

    let err = service
        .get_workflow_metrics(GetWorkflowMetricsRequest {
            namespace: NS.into(),
            name: "ghost".into(),
            pod_name: None,
        })
        .await
        .expect_err("missing workflow");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn get_and_resubmit_round_trip() {
    let (service, _) = service_with(&AppConfig::default());
    let uid = template_uid(&service).await;
    let name = start(&service, &uid).await;

    let fetched = service.get_workflow(WorkflowKey::new(NS, &name)).await.unwrap();
    assert_eq!(fetched.parameters.len(), 1);
    assert!(fetched.status.is_some());
    assert_eq!(fetched.workflow_template.map(|t| t.uid), Some(uid));

    let resubmitted = service
        .resubmit_workflow(WorkflowKey::new(NS, &name))
        .await
        .unwrap();
    assert_ne!(resubmitted.name, name);
}
