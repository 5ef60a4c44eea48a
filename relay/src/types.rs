use appwrite::{DeploymentRecord, Site};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::RelayError;

pub const FAILED_STATUS: &str = "failed";

/// One deployment of one site, in the shape the dashboard renders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub site_id: String,
    pub site_name: String,
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt", serialize_with = "serialize_millis")]
    pub created_at: DateTime<FixedOffset>,
    #[serde(rename = "$updatedAt", serialize_with = "serialize_millis")]
    pub updated_at: DateTime<FixedOffset>,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub resource_id: String,
    pub source_size: u64,
    pub build_size: u64,
    pub total_size: u64,
    /// Build duration in seconds
    pub build_duration: u64,
}

/// Writes timestamps the way Appwrite does: millisecond precision and a numeric
/// offset, e.g. `2025-03-01T10:00:00.000+00:00`.
fn serialize_millis<S: Serializer>(
    at: &DateTime<FixedOffset>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, false))
}

impl Deployment {
    pub fn from_record(site: &Site, record: DeploymentRecord) -> Self {
        Deployment {
            site_id: site.id.clone(),
            site_name: site.name.clone(),
            resource_id: record.resource_id.unwrap_or_else(|| record.id.clone()),
            id: record.id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            status: record.status,
            kind: record.kind.unwrap_or_default(),
            source_size: record.source_size.unwrap_or_default(),
            build_size: record.build_size.unwrap_or_default(),
            total_size: record.total_size.unwrap_or_default(),
            build_duration: record.build_duration.unwrap_or_default(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == FAILED_STATUS
    }
}

/// Sorts newest first. The sort is stable, so deployments created at the same
/// instant keep their relative order.
pub fn sort_newest_first(deployments: &mut [Deployment]) {
    deployments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// What fetching one site produced: its recent deployments, or the reason the
/// listing failed (`RelayError::UpstreamPartialFailure`).
#[derive(Debug)]
pub struct SiteOutcome {
    pub site: Site,
    pub result: Result<Vec<Deployment>, RelayError>,
}
