//! ---
//! fp_section: "03-external-collaborators"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "In-memory orchestration engine used by tests and the CLI."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_yaml::Value;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::collab::engine::{
    EngineError, EngineStatus, EngineWorkflow, LabelSelector, ListOptions, LogOptions,
    LogSubscription, ObjectMeta, OrchestrationClient, WatchEvent, WatchEventKind,
    WatchSubscription, WorkflowOptions,
};
use crate::model::{LogEntry, Metric, Phase};

type ObjectKey = (String, String);
type WatchItem = Result<WatchEvent, EngineError>;
type LogItem = Result<LogEntry, EngineError>;

const NAME_SUFFIX_LEN: usize = 5;
const MAIN_CONTAINER: &str = "main";

#[derive(Debug, Clone)]
struct LogLine {
    pod: String,
    container: String,
    entry: LogEntry,
}

#[derive(Debug)]
struct LogFollower {
    options: LogOptions,
    tx: mpsc::UnboundedSender<LogItem>,
}

#[derive(Debug, Default)]
struct EngineState {
    workflows: IndexMap<ObjectKey, EngineWorkflow>,
    watchers: HashMap<ObjectKey, Vec<mpsc::UnboundedSender<WatchItem>>>,
    logs: HashMap<ObjectKey, Vec<LogLine>>,
    log_followers: HashMap<ObjectKey, Vec<LogFollower>>,
    metrics: HashMap<ObjectKey, Vec<(String, Metric)>>,
    fail_next_watch: Option<EngineError>,
}

impl EngineState {
    fn broadcast(&mut self, key: &ObjectKey, item: WatchItem) {
        if let Some(senders) = self.watchers.get_mut(key) {
            senders.retain(|tx| tx.send(item.clone()).is_ok());
        }
    }

    fn publish_log(&mut self, key: &ObjectKey, line: &LogLine) {
        if let Some(followers) = self.log_followers.get_mut(key) {
            followers.retain(|follower| {
                !follower.options.selects(line) || follower.tx.send(Ok(line.entry.clone())).is_ok()
            });
        }
    }
}

impl LogOptions {
    fn selects(&self, line: &LogLine) -> bool {
        let container = self.container.as_deref().unwrap_or(MAIN_CONTAINER);
        self.pod_name.as_deref().map_or(true, |pod| pod == line.pod) && container == line.container
    }
}

/// Orchestration engine simulated in process memory.
///
/// Instances only change phase when driven through [`InMemoryEngine::set_phase`]
/// or terminated, which makes watch behaviour fully deterministic in tests.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
    active_watches: Arc<AtomicUsize>,
    active_log_feeds: Arc<AtomicUsize>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move an instance to `phase`, stamping start/finish times and notifying watchers.
    pub fn set_phase(
        &self,
        namespace: &str,
        name: &str,
        phase: Phase,
    ) -> Result<EngineWorkflow, EngineError> {
        let key = object_key(namespace, name);
        let mut state = self.state.lock();
        let Some(workflow) = state.workflows.get_mut(&key) else {
            return Err(EngineError::not_found(namespace, name));
        };
        apply_phase(&mut workflow.status, phase);
        let snapshot = workflow.clone();
        state.broadcast(&key, Ok(WatchEvent::modified(snapshot.clone())));
        if phase.is_terminal() {
            // Containers are gone; followers drain what they have and end.
            state.log_followers.remove(&key);
        }
        debug!(namespace, workflow = name, %phase, "phase updated");
        Ok(snapshot)
    }

    /// Deliver a raw item to every open watch on the instance.
    pub fn inject_event(&self, namespace: &str, name: &str, item: WatchItem) {
        let key = object_key(namespace, name);
        self.state.lock().broadcast(&key, item);
    }

    /// Make the next `watch` call fail with `error`.
    pub fn fail_next_watch(&self, error: EngineError) {
        self.state.lock().fail_next_watch = Some(error);
    }

    /// End every open watch on the instance from the engine side.
    pub fn close_watches(&self, namespace: &str, name: &str) {
        self.state.lock().watchers.remove(&object_key(namespace, name));
    }

    /// Number of subscriptions handed out and not yet stopped.
    pub fn active_watches(&self) -> usize {
        self.active_watches.load(Ordering::SeqCst)
    }

    /// Write one line of container output and forward it to matching log followers.
    pub fn append_log(
        &self,
        namespace: &str,
        name: &str,
        pod: &str,
        container: &str,
        content: &str,
    ) -> Result<LogEntry, EngineError> {
        let key = object_key(namespace, name);
        let mut state = self.state.lock();
        if !state.workflows.contains_key(&key) {
            return Err(EngineError::not_found(namespace, name));
        }
        let line = LogLine {
            pod: pod.to_owned(),
            container: container.to_owned(),
            entry: LogEntry::new(Utc::now(), content),
        };
        state.publish_log(&key, &line);
        state.logs.entry(key).or_default().push(line.clone());
        Ok(line.entry)
    }

    /// Deliver an error to every open log feed on the instance.
    pub fn inject_log_error(&self, namespace: &str, name: &str, error: EngineError) {
        let key = object_key(namespace, name);
        if let Some(followers) = self.state.lock().log_followers.get_mut(&key) {
            followers.retain(|follower| follower.tx.send(Err(error.clone())).is_ok());
        }
    }

    /// Attach a metric reported by `pod` to the instance.
    pub fn record_metric(
        &self,
        namespace: &str,
        name: &str,
        pod: &str,
        metric: Metric,
    ) -> Result<(), EngineError> {
        let key = object_key(namespace, name);
        let mut state = self.state.lock();
        if !state.workflows.contains_key(&key) {
            return Err(EngineError::not_found(namespace, name));
        }
        state
            .metrics
            .entry(key)
            .or_default()
            .push((pod.to_owned(), metric));
        Ok(())
    }

    /// Number of log feeds handed out and not yet stopped.
    pub fn active_log_feeds(&self) -> usize {
        self.active_log_feeds.load(Ordering::SeqCst)
    }

    fn insert(&self, namespace: &str, manifest: String, options: WorkflowOptions) -> EngineWorkflow {
        let prefix = options
            .generate_name
            .clone()
            .or_else(|| manifest_generate_name(&manifest))
            .unwrap_or_else(|| "workflow-".to_owned());
        let mut state = self.state.lock();
        let name = loop {
            let candidate = format!("{}{}", prefix, random_suffix());
            if !state.workflows.contains_key(&object_key(namespace, &candidate)) {
                break candidate;
            }
        };
        let workflow = EngineWorkflow {
            metadata: ObjectMeta {
                name: name.clone(),
                namespace: namespace.to_owned(),
                uid: Uuid::new_v4().to_string(),
                labels: options.labels,
                creation_timestamp: Utc::now(),
            },
            manifest,
            parameters: options.parameters,
            status: EngineStatus::default(),
        };
        state
            .workflows
            .insert(object_key(namespace, &name), workflow.clone());
        debug!(namespace, workflow = %name, uid = %workflow.metadata.uid, "workflow created");
        workflow
    }
}

#[async_trait]
impl OrchestrationClient for InMemoryEngine {
    async fn create(
        &self,
        namespace: &str,
        manifest: &[u8],
        options: WorkflowOptions,
    ) -> Result<EngineWorkflow, EngineError> {
        self.validate_manifest(manifest)?;
        let manifest = String::from_utf8(manifest.to_vec())
            .map_err(|err| EngineError::InvalidManifest(err.to_string()))?;
        Ok(self.insert(namespace, manifest, options))
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<EngineWorkflow, EngineError> {
        self.state
            .lock()
            .workflows
            .get(&object_key(namespace, name))
            .cloned()
            .ok_or_else(|| EngineError::not_found(namespace, name))
    }

    async fn list(
        &self,
        namespace: &str,
        options: &ListOptions,
    ) -> Result<Vec<EngineWorkflow>, EngineError> {
        let selector = match options.label_selector.as_deref() {
            Some(raw) => LabelSelector::parse(raw)?,
            None => LabelSelector::default(),
        };
        let state = self.state.lock();
        Ok(state
            .workflows
            .values()
            .filter(|wf| wf.metadata.namespace == namespace)
            .filter(|wf| selector.matches(&wf.metadata.labels))
            .cloned()
            .collect())
    }

    async fn watch(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Box<dyn WatchSubscription>, EngineError> {
        let key = object_key(namespace, name);
        let mut state = self.state.lock();
        if let Some(err) = state.fail_next_watch.take() {
            return Err(err);
        }
        let Some(current) = state.workflows.get(&key).cloned() else {
            return Err(EngineError::not_found(namespace, name));
        };
        let (tx, rx) = mpsc::unbounded_channel();
        // New subscribers first see the object as it is now.
        let _ = tx.send(Ok(WatchEvent {
            kind: WatchEventKind::Added,
            object: Some(current),
        }));
        let senders = state.watchers.entry(key).or_default();
        senders.retain(|sender| !sender.is_closed());
        senders.push(tx);
        self.active_watches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryWatch {
            rx,
            active: Some(self.active_watches.clone()),
        }))
    }

    async fn resubmit(&self, namespace: &str, name: &str) -> Result<EngineWorkflow, EngineError> {
        let original = self.get(namespace, name).await?;
        let options = WorkflowOptions {
            parameters: original.parameters.clone(),
            labels: original.metadata.labels.clone(),
            generate_name: Some(format!("{}-", original.metadata.name)),
        };
        Ok(self.insert(namespace, original.manifest, options))
    }

    async fn terminate(&self, namespace: &str, name: &str) -> Result<(), EngineError> {
        let current = self.get(namespace, name).await?;
        if current.status.is_finished() {
            return Ok(());
        }
        self.set_phase(namespace, name, Phase::Terminated)?;
        Ok(())
    }

    async fn logs(
        &self,
        namespace: &str,
        name: &str,
        options: &LogOptions,
    ) -> Result<Box<dyn LogSubscription>, EngineError> {
        let key = object_key(namespace, name);
        let mut state = self.state.lock();
        let Some(finished) = state
            .workflows
            .get(&key)
            .map(|workflow| workflow.status.is_finished())
        else {
            return Err(EngineError::not_found(namespace, name));
        };
        let (tx, rx) = mpsc::unbounded_channel();
        for line in state.logs.get(&key).into_iter().flatten() {
            if options.selects(line) {
                let _ = tx.send(Ok(line.entry.clone()));
            }
        }
        if !finished {
            let followers = state.log_followers.entry(key).or_default();
            followers.retain(|follower| !follower.tx.is_closed());
            followers.push(LogFollower {
                options: options.clone(),
                tx,
            });
        }
        self.active_log_feeds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryLogs {
            rx,
            active: Some(self.active_log_feeds.clone()),
        }))
    }

    async fn metrics(
        &self,
        namespace: &str,
        name: &str,
        pod_name: Option<&str>,
    ) -> Result<Vec<Metric>, EngineError> {
        let key = object_key(namespace, name);
        let state = self.state.lock();
        if !state.workflows.contains_key(&key) {
            return Err(EngineError::not_found(namespace, name));
        }
        Ok(state
            .metrics
            .get(&key)
            .into_iter()
            .flatten()
            .filter(|(pod, _)| pod_name.map_or(true, |wanted| wanted == pod.as_str()))
            .map(|(_, metric)| metric.clone())
            .collect())
    }

    fn validate_manifest(&self, manifest: &[u8]) -> Result<(), EngineError> {
        let document: Value = serde_yaml::from_slice(manifest)
            .map_err(|err| EngineError::InvalidManifest(err.to_string()))?;
        let Value::Mapping(_) = &document else {
            return Err(EngineError::InvalidManifest(
                "manifest must be a mapping".into(),
            ));
        };
        let spec = document.get("spec").unwrap_or(&document);
        let entrypoint = spec
            .get("entrypoint")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::InvalidManifest("missing entrypoint".into()))?;
        let templates = spec
            .get("templates")
            .and_then(Value::as_sequence)
            .filter(|seq| !seq.is_empty())
            .ok_or_else(|| EngineError::InvalidManifest("templates must not be empty".into()))?;
        let declared = templates
            .iter()
            .any(|t| t.get("name").and_then(Value::as_str) == Some(entrypoint));
        if !declared {
            return Err(EngineError::InvalidManifest(format!(
                "entrypoint '{}' does not name a template",
                entrypoint
            )));
        }
        Ok(())
    }
}

/// Subscription handed out by [`InMemoryEngine::watch`].
struct MemoryWatch {
    rx: mpsc::UnboundedReceiver<WatchItem>,
    active: Option<Arc<AtomicUsize>>,
}

#[async_trait]
impl WatchSubscription for MemoryWatch {
    async fn next(&mut self) -> Option<WatchItem> {
        self.rx.recv().await
    }

    fn stop(&mut self) {
        self.rx.close();
        if let Some(active) = self.active.take() {
            active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemoryWatch {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Feed handed out by [`InMemoryEngine::logs`].
struct MemoryLogs {
    rx: mpsc::UnboundedReceiver<LogItem>,
    active: Option<Arc<AtomicUsize>>,
}

#[async_trait]
impl LogSubscription for MemoryLogs {
    async fn next(&mut self) -> Option<LogItem> {
        self.rx.recv().await
    }

    fn stop(&mut self) {
        self.rx.close();
        if let Some(active) = self.active.take() {
            active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemoryLogs {
    fn drop(&mut self) {
        self.stop();
    }
}

fn object_key(namespace: &str, name: &str) -> ObjectKey {
    (namespace.to_owned(), name.to_owned())
}

fn apply_phase(status: &mut EngineStatus, phase: Phase) {
    let now = Utc::now();
    status.phase = phase;
    if phase != Phase::Pending && status.started_at.is_none() {
        status.started_at = Some(now);
    }
    if phase.is_terminal() && status.finished_at.is_none() {
        status.finished_at = Some(now);
    }
}

fn manifest_generate_name(manifest: &str) -> Option<String> {
    let document: Value = serde_yaml::from_str(manifest).ok()?;
    let metadata = document.get("metadata")?;
    if let Some(prefix) = metadata.get("generateName").and_then(Value::as_str) {
        return Some(prefix.to_owned());
    }
    metadata
        .get("name")
        .and_then(Value::as_str)
        .map(|name| format!("{}-", name))
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_SUFFIX_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::engine::Labels;

    const NS: &str = "default";
    const MANIFEST: &str = "entrypoint: main\ntemplates:\n  - name: main\n";

    fn options(labels: &[(&str, &str)]) -> WorkflowOptions {
        WorkflowOptions {
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect::<Labels>(),
            ..WorkflowOptions::default()
        }
    }

    #[test]
    fn validator_accepts_nested_spec() {
        let engine = InMemoryEngine::new();
        let manifest = "metadata:\n  generateName: hello-\nspec:\n  entrypoint: say\n  templates:\n    - name: say\n";
        engine
            .validate_manifest(manifest.as_bytes())
            .expect("nested spec is valid");
    }

    #[test]
    fn validator_rejects_bad_manifests() {
        let engine = InMemoryEngine::new();
        for manifest in [
            "- just\n- a list\n",
            "templates:\n  - name: main\n",
            "entrypoint: main\ntemplates: []\n",
            "entrypoint: other\ntemplates:\n  - name: main\n",
            "entrypoint: [unclosed",
        ] {
            let err = engine
                .validate_manifest(manifest.as_bytes())
                .expect_err("manifest should be rejected");
            assert!(matches!(err, EngineError::InvalidManifest(_)), "{manifest}: {err}");
        }
    }

    #[tokio::test]
    async fn create_generates_unique_names_from_manifest() {
        let engine = InMemoryEngine::new();
        let manifest = "metadata:\n  name: etl\nentrypoint: main\ntemplates:\n  - name: main\n";
        let a = engine
            .create(NS, manifest.as_bytes(), WorkflowOptions::default())
            .await
            .unwrap();
        let b = engine
            .create(NS, manifest.as_bytes(), WorkflowOptions::default())
            .await
            .unwrap();
        assert!(a.metadata.name.starts_with("etl-"));
        assert_eq!(a.metadata.name.len(), "etl-".len() + NAME_SUFFIX_LEN);
        assert_ne!(a.metadata.name, b.metadata.name);
        assert_ne!(a.metadata.uid, b.metadata.uid);
        assert_eq!(a.status.phase, Phase::Pending);
    }

    #[tokio::test]
    async fn list_filters_by_namespace_and_selector() {
        let engine = InMemoryEngine::new();
        engine
            .create(NS, MANIFEST.as_bytes(), options(&[("tpl", "a")]))
            .await
            .unwrap();
        engine
            .create(NS, MANIFEST.as_bytes(), options(&[("tpl", "b")]))
            .await
            .unwrap();
        engine
            .create("other", MANIFEST.as_bytes(), options(&[("tpl", "a")]))
            .await
            .unwrap();

        let all = engine.list(NS, &ListOptions::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        let only_a = engine
            .list(
                NS,
                &ListOptions {
                    label_selector: Some("tpl=a".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].metadata.labels["tpl"], "a");
    }

    #[tokio::test]
    async fn terminal_phase_sets_finished_at_once() {
        let engine = InMemoryEngine::new();
        let wf = engine
            .create(NS, MANIFEST.as_bytes(), WorkflowOptions::default())
            .await
            .unwrap();
        let running = engine.set_phase(NS, &wf.metadata.name, Phase::Running).unwrap();
        assert!(running.status.started_at.is_some());
        assert!(running.status.finished_at.is_none());

        let done = engine.set_phase(NS, &wf.metadata.name, Phase::Succeeded).unwrap();
        let finished_at = done.status.finished_at.expect("finished");
        engine.terminate(NS, &wf.metadata.name).await.unwrap();
        let after = engine.get(NS, &wf.metadata.name).await.unwrap();
        assert_eq!(after.status.phase, Phase::Succeeded);
        assert_eq!(after.status.finished_at, Some(finished_at));
    }

    #[tokio::test]
    async fn resubmit_copies_labels_and_parameters() {
        let engine = InMemoryEngine::new();
        let mut opts = options(&[("tpl", "a")]);
        opts.parameters = vec![crate::model::Parameter::new("epochs", "3")];
        let wf = engine.create(NS, MANIFEST.as_bytes(), opts).await.unwrap();

        let again = engine.resubmit(NS, &wf.metadata.name).await.unwrap();
        assert_ne!(again.metadata.name, wf.metadata.name);
        assert!(again.metadata.name.starts_with(&wf.metadata.name));
        assert_eq!(again.metadata.labels, wf.metadata.labels);
        assert_eq!(again.parameters, wf.parameters);
    }

    #[tokio::test]
    async fn watch_receives_updates_and_counts_release() {
        let engine = InMemoryEngine::new();
        let wf = engine
            .create(NS, MANIFEST.as_bytes(), WorkflowOptions::default())
            .await
            .unwrap();
        let mut watch = engine.watch(NS, &wf.metadata.name).await.unwrap();
        assert_eq!(engine.active_watches(), 1);
        let added = watch.next().await.expect("event").expect("ok event");
        assert_eq!(added.kind, WatchEventKind::Added);
        assert_eq!(added.object.unwrap().status.phase, Phase::Pending);

        engine.set_phase(NS, &wf.metadata.name, Phase::Running).unwrap();
        let event = watch.next().await.expect("event").expect("ok event");
        assert_eq!(event.object.unwrap().status.phase, Phase::Running);

        watch.stop();
        watch.stop();
        assert_eq!(engine.active_watches(), 0);
        drop(watch);
        assert_eq!(engine.active_watches(), 0);
    }

    #[tokio::test]
    async fn watch_failures() {
        let engine = InMemoryEngine::new();
        assert!(matches!(
            engine.watch(NS, "missing").await,
            Err(EngineError::NotFound { .. })
        ));
        let wf = engine
            .create(NS, MANIFEST.as_bytes(), WorkflowOptions::default())
            .await
            .unwrap();
        engine.fail_next_watch(EngineError::Transport("refused".into()));
        assert!(matches!(
            engine.watch(NS, &wf.metadata.name).await,
            Err(EngineError::Transport(_))
        ));
        let mut watch = engine.watch(NS, &wf.metadata.name).await.unwrap();
        engine.close_watches(NS, &wf.metadata.name);
        assert!(watch.next().await.expect("initial event").is_ok());
        assert!(watch.next().await.is_none());
    }

    #[tokio::test]
    async fn stopped_watches_do_not_accumulate_on_quiet_instances() {
        let engine = InMemoryEngine::new();
        let wf = engine
            .create(NS, MANIFEST.as_bytes(), WorkflowOptions::default())
            .await
            .unwrap();
        for _ in 0..50 {
            let mut watch = engine.watch(NS, &wf.metadata.name).await.unwrap();
            watch.stop();
        }
        let key = object_key(NS, &wf.metadata.name);
        let retained = engine.state.lock().watchers.get(&key).map_or(0, Vec::len);
        assert_eq!(retained, 1);
        assert_eq!(engine.active_watches(), 0);
    }

    #[tokio::test]
    async fn logs_replay_backlog_then_follow_until_finished() {
        let engine = InMemoryEngine::new();
        let wf = engine
            .create(NS, MANIFEST.as_bytes(), WorkflowOptions::default())
            .await
            .unwrap();
        let name = wf.metadata.name.as_str();
        engine.append_log(NS, name, "pod-a", "main", "booting").unwrap();
        engine.append_log(NS, name, "pod-a", "wait", "sidecar noise").unwrap();

        let mut feed = engine.logs(NS, name, &LogOptions::default()).await.unwrap();
        assert_eq!(engine.active_log_feeds(), 1);
        assert_eq!(feed.next().await.unwrap().unwrap().content, "booting");

        engine.append_log(NS, name, "pod-b", "main", "step two").unwrap();
        assert_eq!(feed.next().await.unwrap().unwrap().content, "step two");

        engine.set_phase(NS, name, Phase::Succeeded).unwrap();
        assert!(feed.next().await.is_none());
        drop(feed);
        assert_eq!(engine.active_log_feeds(), 0);
    }

    #[tokio::test]
    async fn logs_filter_by_pod_and_container() {
        let engine = InMemoryEngine::new();
        let wf = engine
            .create(NS, MANIFEST.as_bytes(), WorkflowOptions::default())
            .await
            .unwrap();
        let name = wf.metadata.name.as_str();
        engine.append_log(NS, name, "pod-a", "main", "a-main").unwrap();
        engine.append_log(NS, name, "pod-b", "main", "b-main").unwrap();
        engine.append_log(NS, name, "pod-b", "wait", "b-wait").unwrap();
        engine.set_phase(NS, name, Phase::Failed).unwrap();

        let options = LogOptions {
            pod_name: Some("pod-b".into()),
            container: Some("wait".into()),
        };
        let mut feed = engine.logs(NS, name, &options).await.unwrap();
        assert_eq!(feed.next().await.unwrap().unwrap().content, "b-wait");
        assert!(feed.next().await.is_none());

        assert!(matches!(
            engine.logs(NS, "missing", &options).await,
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn metrics_filter_by_pod() {
        let engine = InMemoryEngine::new();
        let wf = engine
            .create(NS, MANIFEST.as_bytes(), WorkflowOptions::default())
            .await
            .unwrap();
        let name = wf.metadata.name.as_str();
        engine
            .record_metric(NS, name, "pod-a", Metric::new("accuracy", 0.91))
            .unwrap();
        engine
            .record_metric(NS, name, "pod-b", Metric::new("loss", 0.2))
            .unwrap();

        assert_eq!(engine.metrics(NS, name, None).await.unwrap().len(), 2);
        let only_b = engine.metrics(NS, name, Some("pod-b")).await.unwrap();
        assert_eq!(only_b, vec![Metric::new("loss", 0.2)]);
        assert!(matches!(
            engine.metrics(NS, "missing", None).await,
            Err(EngineError::NotFound { .. })
        ));
    }
}
