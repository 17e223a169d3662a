use log::info;

use super::core::GitLabClient;
use crate::error::Result;
use crate::providers::gitlab::types::Job;

impl GitLabClient {
    /// Most recent jobs of a project, across all of its pipelines.
    pub async fn list_project_jobs(&self, project: &str, limit: usize) -> Result<Vec<Job>> {
        let url = self.project_url(project, "jobs")?;
        self.get_paginated(url, &[], limit).await
    }

    pub async fn job_trace(&self, project: &str, job_id: u64) -> Result<String> {
        let url = self.project_url(project, &format!("jobs/{job_id}/trace"))?;
        self.get_text(url).await
    }

    pub async fn retry_job(&self, project: &str, job_id: u64) -> Result<Job> {
        self.job_action(project, job_id, "retry").await
    }

    pub async fn cancel_job(&self, project: &str, job_id: u64) -> Result<Job> {
        self.job_action(project, job_id, "cancel").await
    }

    pub async fn play_job(&self, project: &str, job_id: u64) -> Result<Job> {
        self.job_action(project, job_id, "play").await
    }

    async fn job_action(&self, project: &str, job_id: u64, action: &str) -> Result<Job> {
        let url = self.project_url(project, &format!("jobs/{job_id}/{action}"))?;
        let job: Job = self.post_json(url, &[]).await?;
        info!("Job {job_id} {action} requested, now {}", job.status);
        Ok(job)
    }
}
