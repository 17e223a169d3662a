use log::info;

use super::core::GitLabClient;
use crate::error::Result;
use crate::providers::gitlab::types::{Job, Pipeline};

impl GitLabClient {
    pub async fn list_pipelines(&self, project: &str, limit: usize) -> Result<Vec<Pipeline>> {
        let url = self.project_url(project, "pipelines")?;
        self.get_paginated(url, &[], limit).await
    }

    pub async fn get_pipeline(&self, project: &str, pipeline_id: u64) -> Result<Pipeline> {
        let url = self.project_url(project, &format!("pipelines/{pipeline_id}"))?;
        self.get_json(url).await
    }

    pub async fn create_pipeline(&self, project: &str, ref_: &str) -> Result<Pipeline> {
        let url = self.project_url(project, "pipeline")?;
        let pipeline: Pipeline = self.post_json(url, &[("ref", ref_)]).await?;
        info!("Created pipeline {} for ref {}", pipeline.id, ref_);
        Ok(pipeline)
    }

    pub async fn cancel_pipeline(&self, project: &str, pipeline_id: u64) -> Result<Pipeline> {
        let url = self.project_url(project, &format!("pipelines/{pipeline_id}/cancel"))?;
        self.post_json(url, &[]).await
    }

    /// All jobs of one pipeline, following pagination to the end.
    pub async fn list_pipeline_jobs(&self, project: &str, pipeline_id: u64) -> Result<Vec<Job>> {
        let url = self.project_url(project, &format!("pipelines/{pipeline_id}/jobs"))?;
        self.get_paginated(url, &[], usize::MAX).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::gitlab::types::Status;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_get_pipeline() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/42/pipelines/7")
            .match_header("authorization", "Bearer glpat-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id": 7, "ref": "main", "sha": "deadbeef", "status": "running",
                    "started_at": "2024-03-01T12:00:00Z",
                    "web_url": "https://gitlab.example.com/g/p/-/pipelines/7"}"#,
            )
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), Some("glpat-test".into()), false).unwrap();
        let pipeline = client.get_pipeline("42", 7).await.unwrap();

        mock.assert_async().await;
        assert_eq!(pipeline.id, 7);
        assert_eq!(pipeline.status, Status::Running);
        assert_eq!(pipeline.sha, "deadbeef");
    }

    #[tokio::test]
    async fn test_get_pipeline_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/42/pipelines/404")
            .with_status(404)
            .with_body(r#"{"message": "404 Not found"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None, false).unwrap();
        let result = client.get_pipeline("42", 404).await;

        assert!(matches!(
            result,
            Err(crate::error::GitLabCtlError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_pipeline_sends_ref() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v4/projects/42/pipeline")
            .match_query(Matcher::UrlEncoded("ref".into(), "develop".into()))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 11, "ref": "develop", "sha": "cafe", "status": "created"}"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None, false).unwrap();
        let pipeline = client.create_pipeline("42", "develop").await.unwrap();

        mock.assert_async().await;
        assert_eq!(pipeline.id, 11);
        assert_eq!(pipeline.status, Status::Pending);
    }

    #[tokio::test]
    async fn test_list_pipeline_jobs_follows_pagination() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/api/v4/projects/42/pipelines/7/jobs")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("x-next-page", "2")
            .with_body(r#"[{"id": 1, "name": "build", "stage": "build", "status": "success", "duration": 12.0}]"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/v4/projects/42/pipelines/7/jobs")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("x-next-page", "")
            .with_body(r#"[{"id": 2, "name": "test", "stage": "test", "status": "running"}]"#)
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None, false).unwrap();
        let jobs = client.list_pipeline_jobs("42", 7).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name, "build");
        assert_eq!(jobs[1].status, Status::Running);
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v4/projects/42/pipelines/7")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let client = GitLabClient::new(&server.url(), None, false).unwrap();
        let result = client.get_pipeline("42", 7).await;

        match result {
            Err(crate::error::GitLabCtlError::Api { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }
}
