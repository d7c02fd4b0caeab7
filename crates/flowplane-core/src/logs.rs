//! ---
//! fp_section: "02-workflow-lifecycle"
//! fp_subsection: "module"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Bridge from an engine log feed to a closable stream of log entries."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
//! Log lines are forwarded as they arrive. Unlike the snapshot bridge there is
//! no timer: repeating a line would corrupt the output, and the engine ends
//! the feed itself once the followed containers have exited.

use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::collab::LogSubscription;
use crate::error::{ManagerError, Result};
use crate::model::LogEntry;
use crate::watch::BridgeStream;

/// Lines buffered before the bridge waits on a slow consumer.
pub const LOG_CHANNEL_CAPACITY: usize = 64;

/// Stream of container output returned by a log request.
pub type LogStream = BridgeStream<LogEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogExit {
    Drained,
    ConsumerGone,
    UpstreamFailed,
}

/// Spawn the forwarding task for an already opened log feed.
pub(crate) fn spawn_log_bridge(
    namespace: &str,
    name: &str,
    feed: Box<dyn LogSubscription>,
    capacity: usize,
) -> LogStream {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let span = info_span!("workflow_logs", namespace = %namespace, workflow = %name);
    let task = tokio::spawn(run(feed, tx).instrument(span));
    BridgeStream::new(rx, task)
}

async fn run(mut feed: Box<dyn LogSubscription>, tx: mpsc::Sender<Result<LogEntry>>) {
    let exit = forward(feed.as_mut(), &tx).await;

    drop(tx);
    feed.stop();
    info!(?exit, "log stream closed");
}

async fn forward(
    feed: &mut dyn LogSubscription,
    tx: &mpsc::Sender<Result<LogEntry>>,
) -> LogExit {
    loop {
        let entry = tokio::select! {
            _ = tx.closed() => {
                debug!("consumer dropped the log stream");
                return LogExit::ConsumerGone;
            }
            next = feed.next() => match next {
                Some(Ok(entry)) => entry,
                Some(Err(err)) if err.is_transient() => {
                    warn!(error = %err, "transient log error; waiting for next line");
                    continue;
                }
                Some(Err(err)) => {
                    warn!(error = %err, "log feed failed");
                    let _ = tx.send(Err(ManagerError::Stream(err))).await;
                    return LogExit::UpstreamFailed;
                }
                None => return LogExit::Drained,
            },
        };
        if tx.send(Ok(entry)).await.is_err() {
            return LogExit::ConsumerGone;
        }
    }
}
