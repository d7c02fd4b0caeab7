//! ---
//! fp_section: "03-external-collaborators"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Contract consumed from the cluster orchestration engine."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{LogEntry, Metric, Parameter, Phase};

/// Labels attached to an engine object.
pub type Labels = BTreeMap<String, String>;

/// Errors reported by the orchestration engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("workflow {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },
    #[error("invalid workflow manifest: {0}")]
    InvalidManifest(String),
    #[error("invalid label selector '{0}'")]
    InvalidSelector(String),
    /// Temporary hiccup on an open watch; the subscription stays usable.
    #[error("transient watch error: {0}")]
    Transient(String),
    /// The watch subscription ended from the engine side.
    #[error("watch subscription closed by the engine")]
    WatchClosed,
    #[error("engine transport error: {0}")]
    Transport(String),
}

impl EngineError {
    pub fn not_found(namespace: &str, name: &str) -> Self {
        Self::NotFound {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        }
    }

    /// Whether a watch may keep going after observing this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }
}

/// Object metadata owned partly by the engine (name, uid, timestamps) and partly by callers (labels).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    pub uid: String,
    #[serde(default)]
    pub labels: Labels,
    pub creation_timestamp: DateTime<Utc>,
}

/// Engine-owned execution status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Set once the instance reaches a terminal phase; never cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EngineStatus {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Runnable instance as stored by the orchestration engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineWorkflow {
    pub metadata: ObjectMeta,
    pub manifest: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub status: EngineStatus,
}

/// Options for creating an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowOptions {
    pub parameters: Vec<Parameter>,
    pub labels: Labels,
    /// Name prefix; the engine appends a random suffix.
    pub generate_name: Option<String>,
}

/// Options for listing instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Comma separated `key=value` equality terms.
    pub label_selector: Option<String>,
}

/// Kind of change carried by a [`WatchEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Added,
    Modified,
    Deleted,
}

/// One notification from a watch subscription.
///
/// `object` is `None` when the engine delivered a payload that could not be
/// decoded as a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub object: Option<EngineWorkflow>,
}

impl WatchEvent {
    pub fn modified(object: EngineWorkflow) -> Self {
        Self {
            kind: WatchEventKind::Modified,
            object: Some(object),
        }
    }

    pub fn malformed(kind: WatchEventKind) -> Self {
        Self { kind, object: None }
    }
}

/// Open event feed for a single instance.
#[async_trait]
pub trait WatchSubscription: Send {
    /// Wait for the next event. `None` means the feed has ended.
    ///
    /// Implementations must be cancel safe: the future may be dropped before
    /// completion without losing an event.
    async fn next(&mut self) -> Option<Result<WatchEvent, EngineError>>;

    /// Release the subscription. Calling it more than once is a no-op.
    fn stop(&mut self);
}

/// Selects which container output a log feed follows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Pod to read from; `None` follows every pod of the instance.
    pub pod_name: Option<String>,
    /// Container inside the pod; `None` means the main container.
    pub container: Option<String>,
}

/// Open feed of log lines for one instance.
///
/// The feed ends (`None`) once the followed containers have exited and their
/// buffered output has been delivered.
#[async_trait]
pub trait LogSubscription: Send {
    /// Same cancel-safety contract as [`WatchSubscription::next`].
    async fn next(&mut self) -> Option<Result<LogEntry, EngineError>>;

    /// Release the feed. Calling it more than once is a no-op.
    fn stop(&mut self);
}

/// Create/get/list/watch surface of the orchestration engine.
#[async_trait]
pub trait OrchestrationClient: Send + Sync {
    async fn create(
        &self,
        namespace: &str,
        manifest: &[u8],
        options: WorkflowOptions,
    ) -> Result<EngineWorkflow, EngineError>;

    async fn get(&self, namespace: &str, name: &str) -> Result<EngineWorkflow, EngineError>;

    async fn list(
        &self,
        namespace: &str,
        options: &ListOptions,
    ) -> Result<Vec<EngineWorkflow>, EngineError>;

    async fn watch(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Box<dyn WatchSubscription>, EngineError>;

    /// Start a fresh instance from an existing one; returns the new instance.
    async fn resubmit(&self, namespace: &str, name: &str) -> Result<EngineWorkflow, EngineError>;

    async fn terminate(&self, namespace: &str, name: &str) -> Result<(), EngineError>;

    /// Follow container output, starting with what has already been written.
    async fn logs(
        &self,
        namespace: &str,
        name: &str,
        options: &LogOptions,
    ) -> Result<Box<dyn LogSubscription>, EngineError>;

    /// Metrics reported by the instance, optionally restricted to one pod.
    async fn metrics(
        &self,
        namespace: &str,
        name: &str,
        pod_name: Option<&str>,
    ) -> Result<Vec<Metric>, EngineError>;

    /// Static validation performed without creating anything.
    fn validate_manifest(&self, manifest: &[u8]) -> Result<(), EngineError>;
}

/// Parsed equality-only label selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    terms: Vec<(String, String)>,
}

impl LabelSelector {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let mut terms = Vec::new();
        for term in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let Some((key, value)) = term.split_once('=') else {
                return Err(EngineError::InvalidSelector(raw.to_owned()));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(EngineError::InvalidSelector(raw.to_owned()));
            }
            terms.push((key.to_owned(), value.trim().to_owned()));
        }
        Ok(Self { terms })
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        self.terms
            .iter()
            .all(|(key, value)| labels.get(key).map(String::as_str) == Some(value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
