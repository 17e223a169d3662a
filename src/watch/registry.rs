use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;
use log::debug;

use super::stats::JobDurationStat;

/// Expected duration, in seconds, for jobs with no usable history.
pub const DEFAULT_FALLBACK_TOTAL: u64 = 100;

/// Live progress of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTracker {
    pub message: String,
    /// Expected duration in seconds, never zero
    pub total: u64,
    /// Elapsed seconds, never decreasing
    pub value: u64,
    pub done: bool,
}

impl JobTracker {
    /// Filled fraction of the progress bar, clamped to `[0, 1]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.value as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

/// Share of trackers marked done, `0.0` when there are none yet.
#[allow(clippy::cast_precision_loss)]
pub fn overall_fraction(trackers: &[JobTracker]) -> f64 {
    if trackers.is_empty() {
        return 0.0;
    }
    let done = trackers.iter().filter(|t| t.done).count();
    done as f64 / trackers.len() as f64
}

/// Job id to tracker mapping shared by the poller (writer) and the renderer
/// (reader).
///
/// Trackers are append-only for the life of a watch and keep first-seen order.
/// A completed tracker keeps the elapsed value it finished with; later updates
/// for it are ignored.
pub struct JobTrackerRegistry {
    baselines: HashMap<String, u64>,
    fallback_total: u64,
    trackers: Mutex<IndexMap<u64, JobTracker>>,
}

impl JobTrackerRegistry {
    pub fn new(stats: &HashMap<String, JobDurationStat>, fallback_total: u64) -> Self {
        let fallback_total = fallback_total.max(1);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let baselines = stats
            .iter()
            .filter(|(_, stat)| stat.total > 0 && stat.avg_duration >= 1.0)
            .map(|(name, stat)| (name.clone(), stat.avg_duration.round() as u64))
            .collect();

        Self {
            baselines,
            fallback_total,
            trackers: Mutex::new(IndexMap::new()),
        }
    }

    /// Expected duration for a job name.
    pub fn baseline_for(&self, name: &str) -> u64 {
        self.baselines
            .get(name)
            .copied()
            .unwrap_or(self.fallback_total)
    }

    /// Record one observation of a job.
    pub fn upsert(&self, job_id: u64, name: &str, elapsed: u64, terminal_success: bool) {
        let total = self.baseline_for(name);
        let mut trackers = self.lock();

        let tracker = trackers.entry(job_id).or_insert_with(|| {
            debug!("Tracking job {job_id} ({name}) with expected duration {total}s");
            JobTracker {
                message: format!("{job_id}) {name}"),
                total,
                value: 0,
                done: false,
            }
        });

        if tracker.done {
            return;
        }

        // a smaller reading than last time is stale, keep what is displayed
        tracker.value = tracker.value.max(elapsed);

        if terminal_success {
            tracker.done = true;
            debug!("Job {job_id} ({name}) finished after {}s", tracker.value);
        }
    }

    /// Copy of every tracker in first-seen order.
    pub fn snapshot(&self) -> Vec<JobTracker> {
        self.lock().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<u64, JobTracker>> {
        // trackers hold plain values, so a poisoned map is still consistent
        self.trackers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
