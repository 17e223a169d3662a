use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::try_join;
use log::{debug, info, warn};
use tokio::sync::watch;

use super::registry::JobTrackerRegistry;
use super::source::PipelineSource;
use crate::error::Result;
use crate::providers::gitlab::types::{Job, Status};

/// Shared stop request for a watch.
///
/// Raising it wakes a poller that is waiting on a fetch or on its poll
/// interval, so a stalled request never delays the stop.
#[derive(Debug, Clone)]
pub struct CancelFlag {
    state: Arc<watch::Sender<bool>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once the flag is raised.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // the sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|raised| *raised).await;
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// How a watch ended.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchOutcome {
    /// The pipeline reached a terminal status.
    Finished(Status),
    /// Fetching jobs or the pipeline failed; the watch does not retry.
    FetchFailed {
        last_known: Option<Status>,
        error: String,
    },
    /// The cancel flag was raised before the pipeline finished.
    Cancelled { last_known: Option<Status> },
}

impl WatchOutcome {
    /// Status to report for the pipeline, if one was ever observed.
    pub fn status(&self) -> Option<Status> {
        match self {
            WatchOutcome::Finished(status) => Some(*status),
            WatchOutcome::FetchFailed { last_known, .. }
            | WatchOutcome::Cancelled { last_known } => *last_known,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchReport {
    pub pipeline_id: u64,
    pub outcome: WatchOutcome,
    /// Number of fetch/update rounds started
    pub ticks: usize,
}

impl WatchReport {
    pub fn is_success(&self) -> bool {
        self.outcome == WatchOutcome::Finished(Status::Success)
    }
}

/// Seconds a job has been executing as of `now`.
///
/// Running jobs are measured against the wall clock; terminal jobs use the
/// reported duration, falling back to their timestamps.
pub fn job_elapsed(job: &Job, now: DateTime<Utc>) -> u64 {
    let millis = match job.status {
        Status::Pending => 0,
        Status::Running => job
            .started_at
            .map_or(0, |started| (now - started).num_milliseconds()),
        _ => match (job.duration, job.started_at, job.finished_at) {
            #[allow(clippy::cast_possible_truncation)]
            (Some(duration), _, _) => (duration * 1000.0) as i64,
            (None, Some(started), Some(finished)) => (finished - started).num_milliseconds(),
            _ => 0,
        },
    };

    u64::try_from(millis / 1000).unwrap_or(0)
}

/// Polling state machine driving one watch.
///
/// Every tick fetches the job list and the pipeline record, feeds each job
/// into the registry and only then looks at the pipeline status.
pub struct Poller<'a, S: PipelineSource + ?Sized> {
    source: &'a S,
    registry: Arc<JobTrackerRegistry>,
    poll_interval: Duration,
    cancel: Option<CancelFlag>,
}

impl<'a, S: PipelineSource + ?Sized> Poller<'a, S> {
    pub fn new(source: &'a S, registry: Arc<JobTrackerRegistry>, poll_interval: Duration) -> Self {
        Self {
            source,
            registry,
            poll_interval,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Poll until the pipeline leaves `pending`/`running`, a fetch fails or
    /// the cancel flag is raised.
    pub async fn run(&self, pipeline_id: u64) -> WatchReport {
        info!("Watching pipeline {pipeline_id} every {:?}", self.poll_interval);

        let mut ticks = 0;
        let mut last_known = None;

        let outcome = loop {
            if self.is_cancelled() {
                info!("Watch of pipeline {pipeline_id} cancelled");
                break WatchOutcome::Cancelled { last_known };
            }

            ticks += 1;
            let polled = tokio::select! {
                polled = self.tick(pipeline_id) => polled,
                () = self.cancelled() => continue,
            };

            match polled {
                Ok(status) => {
                    last_known = Some(status);
                    if !status.is_active() {
                        break WatchOutcome::Finished(status);
                    }
                }
                Err(e) => {
                    warn!("Failed to poll pipeline {pipeline_id}: {e}");
                    break WatchOutcome::FetchFailed {
                        last_known,
                        error: e.to_string(),
                    };
                }
            }

            tokio::select! {
                () = tokio::time::sleep(self.poll_interval) => {}
                () = self.cancelled() => {}
            }
        };

        debug!("Pipeline {pipeline_id} watch ended after {ticks} ticks: {outcome:?}");

        WatchReport {
            pipeline_id,
            outcome,
            ticks,
        }
    }

    /// One fetch/update round, returning the pipeline status it observed.
    async fn tick(&self, pipeline_id: u64) -> Result<Status> {
        let (jobs, pipeline) = try_join(
            self.source.list_pipeline_jobs(pipeline_id),
            self.source.get_pipeline(pipeline_id),
        )
        .await?;

        let now = Utc::now();
        for job in &jobs {
            self.registry.upsert(
                job.id,
                &job.name,
                job_elapsed(job, now),
                job.status == Status::Success,
            );
        }

        debug!(
            "Pipeline {pipeline_id} is {}, {} jobs tracked",
            pipeline.status,
            self.registry.count()
        );
        Ok(pipeline.status)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    async fn cancelled(&self) {
        match &self.cancel {
            Some(cancel) => cancel.cancelled().await,
            None => std::future::pending().await,
        }
    }
}
