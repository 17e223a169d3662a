use super::core::GitLabClient;
use crate::error::Result;
use crate::providers::gitlab::types::Project;

impl GitLabClient {
    /// Projects the authenticated user is a member of.
    pub async fn list_projects(&self, search: Option<&str>, limit: usize) -> Result<Vec<Project>> {
        let url = self.api_url("projects")?;
        let mut query = vec![("membership", "true")];
        if let Some(search) = search {
            query.push(("search", search));
        }
        self.get_paginated(url, &query, limit).await
    }
}
