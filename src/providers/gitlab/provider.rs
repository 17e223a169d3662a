use async_trait::async_trait;
use log::info;

use crate::auth::Token;
use crate::error::Result;
use crate::providers::gitlab::client::GitLabClient;
use crate::watch::PipelineSource;

use super::types::{Job, Pipeline};

/// Number of historical jobs fetched to build duration baselines.
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

/// A GitLab client bound to one project.
///
/// This is the handle the watch engine and the job statistics read through;
/// the project never changes for the life of the provider.
pub struct GitLabProvider {
    pub client: GitLabClient,
    pub project: String,
    history_limit: usize,
}

impl GitLabProvider {
    /// Creates a new GitLab provider for the specified project.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitLab instance base URL (e.g., <https://gitlab.com>)
    /// * `project` - Numeric project id or path (e.g., "group/project")
    /// * `token` - Optional authentication token
    /// * `insecure` - Skip TLS certificate verification
    ///
    /// # Errors
    ///
    /// Returns an error if the API endpoint URL cannot be constructed.
    pub fn new(
        base_url: &str,
        project: String,
        token: Option<Token>,
        insecure: bool,
    ) -> Result<Self> {
        let client = GitLabClient::new(base_url, token, insecure)?;

        Ok(Self {
            client,
            project,
            history_limit: DEFAULT_HISTORY_LIMIT,
        })
    }

    #[must_use]
    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }
}

#[async_trait]
impl PipelineSource for GitLabProvider {
    async fn list_pipeline_jobs(&self, pipeline_id: u64) -> Result<Vec<Job>> {
        self.client.list_pipeline_jobs(&self.project, pipeline_id).await
    }

    async fn get_pipeline(&self, pipeline_id: u64) -> Result<Pipeline> {
        self.client.get_pipeline(&self.project, pipeline_id).await
    }

    async fn list_project_jobs(&self) -> Result<Vec<Job>> {
        info!(
            "Fetching up to {} historical jobs of {}",
            self.history_limit, self.project
        );
        self.client
            .list_project_jobs(&self.project, self.history_limit)
            .await
    }
}
