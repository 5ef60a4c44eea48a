//! Request and response bodies of the relay's HTTP endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregator::Aggregate;
use crate::errors::RelayError;
use crate::notifier::NotificationReport;
use crate::types::Deployment;

/// Treats empty strings like absent fields, as the dashboard may send either.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchDeploymentsRequest {
    #[serde(default)]
    pub project_id: Option<String>,
    /// Encoded with `codec::encode`
    #[serde(default)]
    pub api_key: Option<String>,
}

impl FetchDeploymentsRequest {
    /// Returns `(project_id, encoded_api_key)`.
    pub fn into_required(self) -> Result<(String, String), RelayError> {
        match (non_empty(self.project_id), non_empty(self.api_key)) {
            (Some(project_id), Some(api_key)) => Ok((project_id, api_key)),
            _ => Err(RelayError::BadRequest(
                "Missing required parameters: projectId and apiKey".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchDeploymentsResponse {
    pub success: bool,
    pub deployments: Vec<Deployment>,
    pub total: usize,
    pub latest_deployment: Option<Deployment>,
    pub sites_count: usize,
    pub failed_count: usize,
    pub emails_sent: usize,
    pub status_counts: BTreeMap<String, usize>,
}

impl FetchDeploymentsResponse {
    pub fn new(aggregate: Aggregate, report: &NotificationReport) -> Self {
        let failed_count = aggregate.failed_deployments().len();
        let latest_deployment = aggregate.latest().cloned();

        FetchDeploymentsResponse {
            success: true,
            total: aggregate.total(),
            latest_deployment,
            sites_count: aggregate.sites_count,
            failed_count,
            emails_sent: report.sent,
            status_counts: aggregate.status_counts,
            deployments: aggregate.deployments,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TestEmailRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TestEmailRequest {
    /// Returns `(to, subject, message)`.
    pub fn into_required(self) -> Result<(String, String, String), RelayError> {
        match (
            non_empty(self.to),
            non_empty(self.subject),
            non_empty(self.message),
        ) {
            (Some(to), Some(subject), Some(message)) => Ok((to, subject, message)),
            _ => Err(RelayError::BadRequest(
                "Missing required fields: to, subject, message".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: String) -> Self {
        ErrorResponse {
            success: false,
            error,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub mcp_connected: bool,
    pub environment: HealthEnvironment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthEnvironment {
    pub version: &'static str,
    pub port: u16,
    pub has_sender_email: bool,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [&'static str],
}
