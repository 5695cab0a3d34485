//! Fire-and-forget dispatch: rules submit action jobs to a queue, a worker
//! runs each job on its own task and broadcasts the outcome.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use homerule_domain::action::{Command, CommandError};
use homerule_domain::id::RuleId;
use homerule_domain::time::Timestamp;

use crate::arbiter::SuppressionReason;
use crate::ports::GatewayError;

/// A dispatch could not be carried out.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// The action text did not resolve to a command for this actuator.
    #[error("invalid command")]
    Command(#[from] CommandError),

    /// The device gateway failed.
    #[error("device gateway failure")]
    Gateway(#[from] GatewayError),
}

/// Result of one action execution.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The gateway accepted the command.
    Dispatched(Command),
    /// Nothing relevant changed since the last dispatch.
    NoOp,
    Suppressed(SuppressionReason),
    Failed(DispatchError),
}

impl DispatchOutcome {
    #[must_use]
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Dispatched(_))
    }
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dispatched(command) => write!(f, "dispatched `{command}`"),
            Self::NoOp => f.write_str("no-op"),
            Self::Suppressed(reason) => write!(f, "suppressed: {reason}"),
            Self::Failed(error) => write!(f, "failed: {error}"),
        }
    }
}

impl Serialize for DispatchOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Published once per action execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    /// Registry key of the action.
    pub action: String,
    pub rule_id: RuleId,
    pub outcome: DispatchOutcome,
    pub at: Timestamp,
}

type Job = Pin<Box<dyn Future<Output = DispatchReport> + Send>>;

/// Submission side of the dispatch queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    jobs: mpsc::UnboundedSender<Job>,
    reports: broadcast::Sender<DispatchReport>,
}

/// Consumes submitted jobs. Must be spawned for dispatches to happen.
#[derive(Debug)]
pub struct DispatchWorker {
    jobs: mpsc::UnboundedReceiver<Job>,
    reports: broadcast::Sender<DispatchReport>,
}

impl DispatchQueue {
    /// Create a queue and its worker. `report_capacity` bounds how far a
    /// slow report subscriber may lag.
    #[must_use]
    pub fn new(report_capacity: usize) -> (Self, DispatchWorker) {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (reports, _) = broadcast::channel(report_capacity);
        (
            Self {
                jobs: jobs_tx,
                reports: reports.clone(),
            },
            DispatchWorker {
                jobs: jobs_rx,
                reports,
            },
        )
    }

    /// Hand a job over without waiting for it. Returns `false` when the
    /// worker is gone.
    pub fn submit(&self, job: impl Future<Output = DispatchReport> + Send + 'static) -> bool {
        self.jobs.send(Box::pin(job)).is_ok()
    }

    /// Receive every report published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchReport> {
        self.reports.subscribe()
    }
}

impl DispatchWorker {
    /// Run until every queue handle is dropped. Each job gets its own task,
    /// so a slow actuator never holds up the others.
    pub async fn run(mut self) {
        while let Some(job) = self.jobs.recv().await {
            let reports = self.reports.clone();
            tokio::spawn(async move {
                let report = job.await;
                tracing::debug!(
                    action = %report.action,
                    rule_id = %report.rule_id,
                    outcome = %report.outcome,
                    "dispatch finished"
                );
                // no subscribers is fine
                let _ = reports.send(report);
            });
        }
        tracing::debug!("dispatch queue closed");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
