use crate::query;
use crate::types::{DeploymentList, DeploymentRecord, Site, SiteList};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use url::Url;

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const KEY_HEADER: &str = "X-Appwrite-Key";

#[derive(thiserror::Error, Debug)]
pub enum AppwriteError {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Appwrite responded with {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

impl AppwriteError {
    /// The upstream HTTP status, if the request got as far as a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AppwriteError::Status { status, .. } => Some(*status),
            AppwriteError::Reqwest(e) => e.status(),
            AppwriteError::InvalidEndpoint(_) => None,
        }
    }
}

/// Project identity plus the secret key used to act as that project.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub project_id: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new<P, K>(project_id: P, api_key: K) -> Self
    where
        P: Into<String>,
        K: Into<String>,
    {
        Credentials {
            project_id: project_id.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("project_id", &self.project_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Read access to a project's sites and deployments.
#[async_trait]
pub trait SitesApi: Send + Sync {
    async fn list_sites(&self, credentials: &Credentials) -> Result<Vec<Site>, AppwriteError>;

    /// The `limit` most recent deployments of a site, newest first.
    async fn list_deployments(
        &self,
        credentials: &Credentials,
        site_id: &str,
        limit: usize,
    ) -> Result<Vec<DeploymentRecord>, AppwriteError>;
}

/// Error body Appwrite returns alongside non-2xx statuses.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct AppwriteClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl AppwriteClient {
    /// `endpoint` is the API root including the version, e.g. `https://cloud.appwrite.io/v1`.
    pub fn new(endpoint: Url) -> Self {
        AppwriteClient {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, AppwriteError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| AppwriteError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issues an authenticated GET and decodes the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        credentials: &Credentials,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, AppwriteError> {
        let url = self.url_for(segments)?;

        let response = self
            .client
            .get(url)
            .header(PROJECT_HEADER, &credentials.project_id)
            .header(KEY_HEADER, &credentials.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            tracing::debug!(
                project_id = %credentials.project_id,
                path = ?segments,
                %status,
                upstream_message = %message,
                "Appwrite request failed"
            );
            return Err(AppwriteError::Status { status, message });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl SitesApi for AppwriteClient {
    async fn list_sites(&self, credentials: &Credentials) -> Result<Vec<Site>, AppwriteError> {
        let list: SiteList = self.get_json(credentials, &["sites"], &[]).await?;
        Ok(list.sites)
    }

    async fn list_deployments(
        &self,
        credentials: &Credentials,
        site_id: &str,
        limit: usize,
    ) -> Result<Vec<DeploymentRecord>, AppwriteError> {
        let list: DeploymentList = self
            .get_json(
                credentials,
                &["sites", site_id, "deployments"],
                &[
                    (query::QUERY_PARAM, query::order_desc("$createdAt")),
                    (query::QUERY_PARAM, query::limit(limit)),
                ],
            )
            .await?;
        Ok(list.deployments)
    }
}
