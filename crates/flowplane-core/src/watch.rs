//! ---
//! fp_section: "02-workflow-lifecycle"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Bridge from engine watch events to a terminating snapshot stream."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
//! Each watch request gets its own task owning one upstream subscription and
//! one downstream channel. The task races the next engine event against a
//! fixed interval timer, republishing the most recent object on every wake-up
//! so that an instance which finished while the feed went quiet is still
//! reported and the stream still ends. Consecutive identical snapshots are
//! therefore expected and carry no new information.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use flowplane_common::config::WatchConfig;
use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::collab::{EngineError, EngineWorkflow, WatchEventKind, WatchSubscription};
use crate::error::{ManagerError, Result};
use crate::model::{Template, TemplateRef, Workflow};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timer period and downstream capacity for stream bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    /// Snapshots buffered before the bridge blocks on a slow consumer.
    pub channel_capacity: usize,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            channel_capacity: 1,
        }
    }
}

impl From<&WatchConfig> for WatchSettings {
    fn from(config: &WatchConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            channel_capacity: config.channel_capacity.max(1),
        }
    }
}

/// Receiving end of a bridge task: workflow snapshots or log entries.
///
/// Dropping it is the cancellation signal: the bridge notices, stops its
/// upstream subscription and exits.
#[derive(Debug)]
pub struct BridgeStream<T> {
    rx: mpsc::Receiver<Result<T>>,
    task: Option<JoinHandle<()>>,
}

/// Snapshot stream returned by a workflow watch.
pub type WorkflowWatch = BridgeStream<Workflow>;

impl<T> BridgeStream<T> {
    pub(crate) fn new(rx: mpsc::Receiver<Result<T>>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Next item; `None` once the stream has closed.
    pub async fn next(&mut self) -> Option<Result<T>> {
        self.rx.recv().await
    }

    /// Stop consuming and wait until the bridge has released its subscription.
    pub async fn close(mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "bridge join error");
            }
        }
    }
}

impl<T> Stream for BridgeStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Template context resolved once when the watch opens.
#[derive(Debug, Clone)]
pub(crate) struct WatchTarget {
    pub namespace: String,
    pub name: String,
    pub template_ref: Option<TemplateRef>,
    pub template: Option<Template>,
}

/// Why the streaming loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeExit {
    Finished,
    Deleted,
    ConsumerGone,
    UpstreamFailed,
}

/// Spawn the bridge task for an already opened subscription.
pub(crate) fn spawn_bridge(
    target: WatchTarget,
    subscription: Box<dyn WatchSubscription>,
    settings: WatchSettings,
) -> WorkflowWatch {
    let (tx, rx) = mpsc::channel(settings.channel_capacity.max(1));
    let span = info_span!("workflow_watch", namespace = %target.namespace, workflow = %target.name);
    let bridge = StreamBridge {
        target,
        subscription,
        tx,
        poll_interval: settings.poll_interval,
    };
    let task = tokio::spawn(bridge.run().instrument(span));
    BridgeStream::new(rx, task)
}

struct StreamBridge {
    target: WatchTarget,
    subscription: Box<dyn WatchSubscription>,
    tx: mpsc::Sender<Result<Workflow>>,
    poll_interval: Duration,
}

impl StreamBridge {
    async fn run(self) {
        let StreamBridge {
            target,
            mut subscription,
            tx,
            poll_interval,
        } = self;

        let exit = stream(&target, subscription.as_mut(), &tx, poll_interval).await;

        // Close downstream first, then release upstream.
        drop(tx);
        subscription.stop();
        info!(?exit, "workflow watch closed");
    }
}

async fn stream(
    target: &WatchTarget,
    subscription: &mut dyn WatchSubscription,
    tx: &mpsc::Sender<Result<Workflow>>,
    poll_interval: Duration,
) -> BridgeExit {
    let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut current: Option<EngineWorkflow> = None;

    loop {
        let mut deleted = false;
        tokio::select! {
            _ = tx.closed() => {
                debug!("consumer dropped the stream");
                return BridgeExit::ConsumerGone;
            }
            next = subscription.next() => match next {
                Some(Ok(event)) => {
                    let Some(object) = event.object else {
                        warn!(kind = ?event.kind, "skipping undecodable watch event");
                        continue;
                    };
                    debug!(kind = ?event.kind, phase = %object.status.phase, "watch event");
                    deleted = event.kind == WatchEventKind::Deleted;
                    current = Some(object);
                }
                Some(Err(err)) if err.is_transient() => {
                    warn!(error = %err, "transient watch error; waiting for next event");
                    continue;
                }
                Some(Err(err)) => {
                    warn!(error = %err, "watch failed");
                    let _ = tx.send(Err(ManagerError::Stream(err))).await;
                    return BridgeExit::UpstreamFailed;
                }
                None => {
                    warn!("watch feed ended before the workflow finished");
                    let _ = tx.send(Err(ManagerError::Stream(EngineError::WatchClosed))).await;
                    return BridgeExit::UpstreamFailed;
                }
            },
            _ = ticker.tick() => {}
        }

        let Some(object) = current.as_ref() else {
            continue;
        };
        let snapshot = match snapshot(target, object) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "unable to serialise workflow status");
                continue;
            }
        };
        if tx.send(Ok(snapshot)).await.is_err() {
            debug!("consumer dropped the stream during delivery");
            return BridgeExit::ConsumerGone;
        }
        if object.status.is_finished() {
            return BridgeExit::Finished;
        }
        if deleted {
            return BridgeExit::Deleted;
        }
    }
}

/// Project an engine object into the snapshot pushed downstream.
pub(crate) fn snapshot(
    target: &WatchTarget,
    object: &EngineWorkflow,
) -> std::result::Result<Workflow, serde_json::Error> {
    let status = serde_json::to_string(&object.status)?;
    Ok(Workflow {
        uid: object.metadata.uid.clone(),
        name: object.metadata.name.clone(),
        phase: Some(object.status.phase),
        created_at: Some(object.metadata.creation_timestamp),
        finished_at: object.status.finished_at,
        parameters: Vec::new(),
        status: Some(status),
        template_ref: target.template_ref.clone(),
        template: target.template.clone(),
    })
}
