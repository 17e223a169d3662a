//! Live pipeline watch.
//!
//! A watch computes per-job duration baselines from the project's history,
//! then runs two loops side by side: the [`Poller`] refreshing job progress in a
//! [`JobTrackerRegistry`] and the [`Renderer`] painting it to the terminal. The
//! renderer is stopped and flushed once the poller sees a terminal pipeline
//! status, and a one-line summary is printed last.

mod poller;
mod registry;
mod renderer;
mod source;
mod stats;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

pub use poller::{CancelFlag, WatchOutcome, WatchReport};
pub use registry::DEFAULT_FALLBACK_TOTAL;
pub use renderer::DrawTarget;
pub use source::PipelineSource;
pub use stats::{compute_stats, sorted_stats, JobDurationStat};

use poller::Poller;
use registry::JobTrackerRegistry;
use renderer::Renderer;

use crate::config::WatchConfig;
use crate::error::Result;
use crate::output;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    pub render_interval: Duration,
    /// Expected seconds for jobs without a baseline
    pub fallback_total: u64,
    pub draw_target: DrawTarget,
    pub cancel: Option<CancelFlag>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            render_interval: Duration::from_secs(1),
            fallback_total: DEFAULT_FALLBACK_TOTAL,
            draw_target: DrawTarget::Stderr,
            cancel: None,
        }
    }
}

/// Lower bounds for configured intervals.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MIN_RENDER_INTERVAL: Duration = Duration::from_millis(10);

impl From<&WatchConfig> for WatchOptions {
    fn from(config: &WatchConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms).max(MIN_POLL_INTERVAL),
            render_interval: Duration::from_millis(config.render_interval_ms)
                .max(MIN_RENDER_INTERVAL),
            fallback_total: config.fallback_duration,
            ..Self::default()
        }
    }
}

/// Duration baselines from the project's finished jobs.
pub async fn fetch_stats<S: PipelineSource + ?Sized>(
    source: &S,
) -> Result<HashMap<String, JobDurationStat>> {
    // running jobs only report partial durations
    let finished: Vec<_> = source
        .list_project_jobs()
        .await?
        .into_iter()
        .filter(|job| !job.status.is_active())
        .collect();

    let stats = compute_stats(&finished);
    info!(
        "Computed duration baselines for {} job names from {} historical jobs",
        stats.len(),
        finished.len()
    );
    Ok(stats)
}

/// Watch a pipeline until it stops being pending or running.
///
/// Never fails: fetch errors end the watch and are reported through the
/// returned outcome and the printed summary line.
pub async fn watch_pipeline<S: PipelineSource + ?Sized>(
    source: &S,
    pipeline_id: u64,
    options: &WatchOptions,
) -> WatchReport {
    let stats = fetch_stats(source).await.unwrap_or_else(|e| {
        warn!("Could not fetch job history, using fallback durations: {e}");
        HashMap::new()
    });

    let registry = Arc::new(JobTrackerRegistry::new(&stats, options.fallback_total));

    output::print_progress_header();
    let renderer = Renderer::start(
        Arc::clone(&registry),
        options.render_interval,
        options.draw_target,
    );

    let mut poller = Poller::new(source, Arc::clone(&registry), options.poll_interval);
    if let Some(cancel) = &options.cancel {
        poller = poller.with_cancel(cancel.clone());
    }
    let report = poller.run(pipeline_id).await;

    renderer.stop().await;
    output::print_watch_summary(&report);

    report
}
