use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::providers::gitlab::types::Job;

/// Historical duration baseline for every job sharing a name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobDurationStat {
    pub name: String,
    /// Number of historical samples
    pub total: usize,
    pub min_duration: f64,
    pub max_duration: f64,
    /// Median of the samples, not the mean
    pub avg_duration: f64,
}

impl JobDurationStat {
    fn from_samples(name: &str, samples: &mut [f64]) -> Self {
        if samples.is_empty() {
            return Self {
                name: name.to_owned(),
                ..Self::default()
            };
        }

        samples.sort_by(f64::total_cmp);

        Self {
            name: name.to_owned(),
            total: samples.len(),
            min_duration: samples[0],
            max_duration: samples[samples.len() - 1],
            avg_duration: median(samples),
        }
    }
}

/// Median of an ascending slice. Even-sized slices average the two central
/// elements.
fn median(sorted: &[f64]) -> f64 {
    let len = sorted.len();
    if len == 0 {
        return 0.0;
    }

    let mid = len / 2;
    if len % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Group historical jobs by name and compute per-name baselines.
///
/// Jobs without a recorded duration still register their name, so a name that
/// only ever ran without timing data yields an all-zero stat.
pub fn compute_stats(jobs: &[Job]) -> HashMap<String, JobDurationStat> {
    let mut samples: IndexMap<&str, Vec<f64>> = IndexMap::new();

    for job in jobs {
        let group = samples.entry(job.name.as_str()).or_default();
        if let Some(duration) = job.duration {
            group.push(duration);
        }
    }

    samples
        .into_iter()
        .map(|(name, mut durations)| {
            (
                name.to_owned(),
                JobDurationStat::from_samples(name, &mut durations),
            )
        })
        .collect()
}

/// Stats ordered by job name, for table output.
pub fn sorted_stats(stats: &HashMap<String, JobDurationStat>) -> Vec<&JobDurationStat> {
    let mut sorted: Vec<_> = stats.values().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::providers::gitlab::types::Status;

    fn create_job(id: u64, name: &str, duration: Option<f64>) -> Job {
        Job {
            id,
            name: name.to_string(),
            stage: "test".to_string(),
            status: Status::Success,
            started_at: None,
            finished_at: None,
            duration,
        }
    }

    fn jobs_named(name: &str, durations: &[f64]) -> Vec<Job> {
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| create_job(i as u64, name, Some(*d)))
            .collect()
    }

    #[test]
    fn test_median_odd_count() {
        let stats = compute_stats(&jobs_named("test", &[30.0, 10.0, 20.0]));

        assert_eq!(stats["test"].avg_duration, 20.0);
    }

    #[test]
    fn test_median_even_count() {
        let stats = compute_stats(&jobs_named("test", &[40.0, 10.0, 30.0, 20.0]));

        assert_eq!(stats["test"].avg_duration, 25.0);
    }

    #[test]
    fn test_median_resists_outliers() {
        let stats = compute_stats(&jobs_named("build", &[60.0, 62.0, 61.0, 900.0, 59.0]));

        assert_eq!(stats["build"].avg_duration, 61.0);
    }

    #[test]
    fn test_min_max_with_positive_durations() {
        let stats = compute_stats(&jobs_named("lint", &[5.0, 1.0, 9.0, 3.0]));

        let stat = &stats["lint"];
        assert_eq!(stat.min_duration, 1.0);
        assert_eq!(stat.max_duration, 9.0);
        assert_eq!(stat.total, 4);
    }

    #[test]
    fn test_min_max_with_non_positive_durations() {
        let stats = compute_stats(&jobs_named("odd", &[0.0, -2.0, 4.0]));

        let stat = &stats["odd"];
        assert_eq!(stat.min_duration, -2.0);
        assert_eq!(stat.max_duration, 4.0);
        assert_eq!(stat.avg_duration, 0.0);
    }

    #[test]
    fn test_min_le_avg_le_max() {
        let stats = compute_stats(&jobs_named("deploy", &[12.0, 7.0, 100.0, 3.0, 44.0, 8.0]));

        let stat = &stats["deploy"];
        assert!(stat.min_duration <= stat.avg_duration);
        assert!(stat.avg_duration <= stat.max_duration);
    }

    #[test]
    fn test_groups_by_name() {
        let mut jobs = jobs_named("build", &[10.0, 20.0]);
        jobs.extend(jobs_named("test", &[100.0]));

        let stats = compute_stats(&jobs);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats["build"].total, 2);
        assert_eq!(stats["build"].avg_duration, 15.0);
        assert_eq!(stats["test"].total, 1);
        assert_eq!(stats["test"].min_duration, 100.0);
    }

    #[test]
    fn test_empty_history_yields_empty_mapping() {
        assert!(compute_stats(&[]).is_empty());
    }

    #[test]
    fn test_name_without_durations_is_all_zero() {
        let stats = compute_stats(&[create_job(1, "manual-deploy", None)]);

        let stat = &stats["manual-deploy"];
        assert_eq!(stat.total, 0);
        assert_eq!(stat.min_duration, 0.0);
        assert_eq!(stat.max_duration, 0.0);
        assert_eq!(stat.avg_duration, 0.0);
    }

    #[test]
    fn test_sorted_stats_orders_by_name() {
        let mut jobs = jobs_named("test", &[1.0]);
        jobs.extend(jobs_named("build", &[1.0]));
        jobs.extend(jobs_named("lint", &[1.0]));

        let stats = compute_stats(&jobs);
        let names: Vec<_> = sorted_stats(&stats).iter().map(|s| s.name.as_str()).collect();

        assert_eq!(names, vec!["build", "lint", "test"]);
    }
}
