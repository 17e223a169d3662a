mod styling;
mod summary;
mod tables;

pub use styling::{cyan, dim, styled_status};
pub use summary::{print_progress_header, print_watch_summary};
pub use tables::{jobs_table, pipelines_table, projects_table, stats_table};
