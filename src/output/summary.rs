use crate::watch::{WatchOutcome, WatchReport};

use super::styling::{bright, bright_red, class_marker, dim, styled_status};

/// Prints the header shown above the live progress bars.
pub fn print_progress_header() {
    eprintln!("\n{}", bright("Pipeline progress:").underlined());
}

/// Prints the one-line result of a pipeline watch to stdout.
pub fn print_watch_summary(report: &WatchReport) {
    println!("{}", render_watch_summary(report));
}

fn render_watch_summary(report: &WatchReport) -> String {
    let status = match report.outcome.status() {
        Some(status) => format!(
            "{} {}",
            class_marker(status.class()),
            styled_status(status)
        ),
        None => dim("unknown").to_string(),
    };

    let line = format!(
        "The pipeline {} exit with status: {status}",
        report.pipeline_id
    );

    match &report.outcome {
        WatchOutcome::Finished(_) => line,
        WatchOutcome::FetchFailed { error, .. } => {
            format!("{line} {}", bright_red(format!("(watch aborted: {error})")))
        }
        WatchOutcome::Cancelled { .. } => format!("{line} {}", dim("(watch cancelled)")),
    }
}
