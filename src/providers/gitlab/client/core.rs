use std::time::Duration;

use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{GitLabCtlError, Result};

pub(super) const PAGE_SIZE: usize = 100;
const NEXT_PAGE_HEADER: &str = "x-next-page";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin REST v4 client.
///
/// Holds no project state; callers pass the project id or path with every
/// request so one client can serve any number of projects.
pub struct GitLabClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>, insecure: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gitlabctl/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(insecure)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GitLabCtlError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Url::join drops the last segment unless the base ends with a slash
        let normalized = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };

        let api_url = Url::parse(&normalized)
            .map_err(|e| GitLabCtlError::Config(format!("Invalid base URL: {e}")))?
            .join("api/v4/")
            .map_err(|e| GitLabCtlError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    pub(super) fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    pub(super) fn api_url(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path)
            .map_err(|e| GitLabCtlError::Config(format!("Invalid API URL: {e}")))
    }

    /// Resolve `path` below `projects/{project}/`, encoding namespaced paths.
    pub(super) fn project_url(&self, project: &str, path: &str) -> Result<Url> {
        self.api_url(&format!("projects/{}/{path}", urlencoding::encode(project)))
    }

    pub(super) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {url}");
        let response = self.auth_request(self.client.get(url)).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    pub(super) async fn get_text(&self, url: Url) -> Result<String> {
        debug!("GET {url}");
        let response = self.auth_request(self.client.get(url)).send().await?;
        Ok(check_status(response).await?.text().await?)
    }

    pub(super) async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("POST {url}");
        let response = self
            .auth_request(self.client.post(url).query(query))
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    /// Follow GitLab's offset pagination until the last page or `limit` items.
    pub(super) async fn get_paginated<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
        limit: usize,
    ) -> Result<Vec<T>> {
        let per_page = PAGE_SIZE.min(limit.max(1)).to_string();
        let mut items: Vec<T> = Vec::new();
        let mut page = String::from("1");

        loop {
            debug!("GET {url} (page {page})");
            let request = self
                .client
                .get(url.clone())
                .query(query)
                .query(&[("per_page", per_page.as_str()), ("page", page.as_str())]);

            let response = check_status(self.auth_request(request).send().await?).await?;

            let next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned);

            let batch: Vec<T> = response.json().await?;
            items.extend(batch);

            match next_page {
                Some(next) if items.len() < limit => page = next,
                _ => break,
            }
        }

        items.truncate(limit);
        Ok(items)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    if status == StatusCode::NOT_FOUND {
        return Err(GitLabCtlError::NotFound(url));
    }

    Err(GitLabCtlError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_appends_v4_prefix() {
        let client = GitLabClient::new("https://gitlab.example.com", None, false).unwrap();

        let url = client.api_url("projects").unwrap();

        assert_eq!(url.as_str(), "https://gitlab.example.com/api/v4/projects");
    }

    #[test]
    fn test_api_url_keeps_base_path() {
        let client = GitLabClient::new("https://example.com/gitlab", None, false).unwrap();

        let url = client.api_url("projects").unwrap();

        assert_eq!(url.as_str(), "https://example.com/gitlab/api/v4/projects");
    }

    #[test]
    fn test_project_url_encodes_namespace() {
        let client = GitLabClient::new("https://gitlab.example.com/", None, false).unwrap();

        let url = client.project_url("group/project", "pipelines/7").unwrap();

        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/group%2Fproject/pipelines/7"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = GitLabClient::new("not a url", None, false);

        assert!(matches!(result, Err(GitLabCtlError::Config(_))));
    }
}
