use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::registry::{overall_fraction, JobTracker, JobTrackerRegistry};

const MESSAGE_WIDTH: usize = 24;
/// Bars are drawn on a fixed scale so the fill is exactly the tracker fraction.
const BAR_SCALE: u64 = 1000;
const MIN_TICK: Duration = Duration::from_millis(1);

/// Where frames are painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTarget {
    Stderr,
    Hidden,
}

impl DrawTarget {
    fn to_indicatif(self) -> ProgressDrawTarget {
        match self {
            DrawTarget::Stderr => ProgressDrawTarget::stderr(),
            DrawTarget::Hidden => ProgressDrawTarget::hidden(),
        }
    }
}

fn job_style() -> ProgressStyle {
    ProgressStyle::with_template("  {msg:24} [{bar:25.cyan/blue}] {percent:>3}% {prefix}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

fn overall_style() -> ProgressStyle {
    ProgressStyle::with_template("  {msg:24} [{bar:25.green/white}] {percent:>3}% {prefix}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Paints one bar per tracked job plus an overall bar below them.
///
/// The bar set is rebuilt from a fresh registry snapshot on every frame, so jobs
/// that appear mid-watch show up on the next tick.
pub struct Renderer {
    registry: Arc<JobTrackerRegistry>,
    multi: MultiProgress,
    overall: ProgressBar,
    bars: Vec<ProgressBar>,
}

impl Renderer {
    pub fn new(registry: Arc<JobTrackerRegistry>, target: DrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target.to_indicatif());
        let overall = multi.add(ProgressBar::new(BAR_SCALE).with_style(overall_style()));
        overall.set_message("Overall");

        Self {
            registry,
            multi,
            overall,
            bars: Vec::new(),
        }
    }

    /// Spawn the redraw loop on its own tick, independent of polling.
    pub fn start(
        registry: Arc<JobTrackerRegistry>,
        tick_interval: Duration,
        target: DrawTarget,
    ) -> RendererHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let mut renderer = Self::new(registry, target);

        let task = tokio::spawn(async move {
            // interval() panics on a zero period
            let mut ticker = tokio::time::interval(tick_interval.max(MIN_TICK));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        renderer.draw();
                    }
                    _ = stop_rx.changed() => break,
                }
            }

            renderer.finish()
        });

        RendererHandle {
            stop: stop_tx,
            task,
        }
    }

    /// Paint one frame and return the snapshot it was built from.
    pub fn draw(&mut self) -> Vec<JobTracker> {
        let snapshot = self.registry.snapshot();

        for (index, tracker) in snapshot.iter().enumerate() {
            if index == self.bars.len() {
                let bar = ProgressBar::new(BAR_SCALE).with_style(job_style());
                self.bars.push(self.multi.insert_before(&self.overall, bar));
            }
            sync_bar(&self.bars[index], tracker);
        }

        let done = snapshot.iter().filter(|t| t.done).count();
        self.overall.set_position(scaled(overall_fraction(&snapshot)));
        self.overall.set_prefix(format!("{done}/{} jobs done", snapshot.len()));

        snapshot
    }

    /// Final frame: completed bars finish, the rest are left where they stopped.
    fn finish(mut self) -> Vec<JobTracker> {
        let snapshot = self.draw();

        for (bar, tracker) in self.bars.iter().zip(&snapshot) {
            if tracker.done {
                bar.finish();
            } else {
                bar.abandon();
            }
        }
        self.overall.finish();

        debug!("Renderer stopped with {} trackers", snapshot.len());
        snapshot
    }

    #[cfg(test)]
    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }
}

fn sync_bar(bar: &ProgressBar, tracker: &JobTracker) {
    bar.set_message(console::truncate_str(&tracker.message, MESSAGE_WIDTH, "…").into_owned());
    bar.set_position(scaled(tracker.fraction()));
    bar.set_prefix(format!(
        "{}s/{}s{}",
        tracker.value,
        tracker.total,
        if tracker.done { " ✓" } else { "" }
    ));
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scaled(fraction: f64) -> u64 {
    (fraction * BAR_SCALE as f64).round() as u64
}

/// Stop/join point for a running renderer.
pub struct RendererHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<Vec<JobTracker>>,
}

impl RendererHandle {
    /// Stop redrawing and wait for the final frame to be flushed.
    ///
    /// Returns the snapshot the final frame was drawn from.
    pub async fn stop(self) -> Vec<JobTracker> {
        // the receiver only disappears if the task already ended
        let _ = self.stop.send(true);

        match self.task.await {
            Ok(last_frame) => last_frame,
            Err(e) => {
                warn!("Renderer task failed: {e}");
                Vec::new()
            }
        }
    }
}
