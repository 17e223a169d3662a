mod client;
mod provider;
pub mod types;

pub use provider::{GitLabProvider, DEFAULT_HISTORY_LIMIT};
