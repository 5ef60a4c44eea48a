use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Site {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub(crate) struct SiteList {
    #[serde(default)]
    pub sites: Vec<Site>,
}

/// A deployment as returned by the Sites API. Optional metrics are left
/// optional here; defaults are applied when the relay maps the record.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<FixedOffset>,
    #[serde(rename = "$updatedAt")]
    pub updated_at: DateTime<FixedOffset>,
    pub status: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub source_size: Option<u64>,
    #[serde(default)]
    pub build_size: Option<u64>,
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(default)]
    pub build_duration: Option<u64>,
}

#[derive(Deserialize)]
pub(crate) struct DeploymentList {
    #[serde(default)]
    pub deployments: Vec<DeploymentRecord>,
}

/// A connected project as stored by the dashboard.
///
/// Every field except `projectId` is optional so that documents written by
/// older dashboard versions still parse.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    #[serde(default, rename = "$id")]
    pub document_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub deployments: Option<u64>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl ProjectDocument {
    /// The owner's notification address, if one is set and non-blank.
    pub fn notification_address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

#[derive(Deserialize)]
pub(crate) struct DocumentList<T> {
    #[serde(default = "Vec::new")]
    pub documents: Vec<T>,
}
