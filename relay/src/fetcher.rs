use appwrite::{Credentials, DeploymentRecord, Site, SitesApi};
use shared::counter;
use std::sync::Arc;

use crate::errors::RelayError;
use crate::metrics_defs::SITE_FETCH_FAILURES;
use crate::types::{Deployment, SiteOutcome, sort_newest_first};

/// Deployments kept per site.
pub const MAX_DEPLOYMENTS_PER_SITE: usize = 5;

/// Enumerates a project's sites and their most recent deployments.
///
/// Sites are fetched one after another. A site whose deployments cannot be
/// listed is reported as a failed `SiteOutcome`; only a failure of the site
/// listing itself fails the whole fetch.
#[derive(Clone)]
pub struct Fetcher {
    api: Arc<dyn SitesApi>,
}

impl Fetcher {
    pub fn new(api: Arc<dyn SitesApi>) -> Self {
        Self { api }
    }

    pub async fn fetch(&self, credentials: &Credentials) -> Result<Vec<SiteOutcome>, RelayError> {
        let sites = self
            .api
            .list_sites(credentials)
            .await
            .map_err(|e| {
                tracing::warn!(
                    project_id = %credentials.project_id,
                    error = %e,
                    "Failed to list sites"
                );
                RelayError::from_site_listing(e)
            })?;

        tracing::info!(
            project_id = %credentials.project_id,
            sites = sites.len(),
            "Listed sites"
        );

        let mut outcomes = Vec::with_capacity(sites.len());
        for site in sites {
            let result = self.fetch_site(credentials, &site).await;
            outcomes.push(SiteOutcome { site, result });
        }

        Ok(outcomes)
    }

    async fn fetch_site(
        &self,
        credentials: &Credentials,
        site: &Site,
    ) -> Result<Vec<Deployment>, RelayError> {
        match self
            .api
            .list_deployments(credentials, &site.id, MAX_DEPLOYMENTS_PER_SITE)
            .await
        {
            Ok(records) => {
                tracing::debug!(
                    site_id = %site.id,
                    site_name = %site.name,
                    found = records.len(),
                    "Fetched deployments for site"
                );
                Ok(recent_deployments(site, records))
            }
            Err(e) => {
                tracing::warn!(
                    site_id = %site.id,
                    error = %e,
                    "Failed to fetch deployments for site"
                );
                counter!(SITE_FETCH_FAILURES).increment(1);
                Err(RelayError::UpstreamPartialFailure {
                    site_id: site.id.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// The newest `MAX_DEPLOYMENTS_PER_SITE` deployments of a site, newest first.
/// The upstream is asked for exactly this window; sorting again here keeps the
/// result correct even if it ignores the ordering or limit.
pub fn recent_deployments(site: &Site, records: Vec<DeploymentRecord>) -> Vec<Deployment> {
    let mut deployments: Vec<Deployment> = records
        .into_iter()
        .map(|record| Deployment::from_record(site, record))
        .collect();

    sort_newest_first(&mut deployments);
    deployments.truncate(MAX_DEPLOYMENTS_PER_SITE);
    deployments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{FakeSites, record, site};
    use http::StatusCode;

    fn credentials() -> Credentials {
        Credentials::new("proj1", "key")
    }

    // Seven deployments, one per day, deliberately out of order
    fn week_of_records(prefix: &str) -> Vec<DeploymentRecord> {
        [3, 1, 7, 5, 2, 6, 4]
            .into_iter()
            .map(|day| {
                record(
                    &format!("{prefix}-{day}"),
                    &format!("2025-03-0{day}T12:00:00.000+00:00"),
                    "ready",
                )
            })
            .collect()
    }

    #[test]
    fn test_recent_deployments_keeps_newest_five() {
        let deployments = recent_deployments(&site("s1", "Site"), week_of_records("s1"));

        let ids: Vec<&str> = deployments.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["s1-7", "s1-6", "s1-5", "s1-4", "s1-3"]);
    }

    #[test]
    fn test_recent_deployments_compares_instants() {
        // 09:00-05:00 is later than 12:00Z
        let records = vec![
            record("utc", "2025-03-01T12:00:00+00:00", "ready"),
            record("eastern", "2025-03-01T09:00:00-05:00", "ready"),
        ];
        let deployments = recent_deployments(&site("s1", "Site"), records);
        assert_eq!(deployments[0].id, "eastern");
    }

    #[tokio::test]
    async fn test_fetch_truncates_each_site() {
        let api = Arc::new(
            FakeSites::new(vec![site("s1", "One"), site("s2", "Two")])
                .with_deployments("s1", week_of_records("s1"))
                .with_deployments("s2", week_of_records("s2")),
        );
        let fetcher = Fetcher::new(api.clone());

        let outcomes = fetcher.fetch(&credentials()).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            let deployments = outcome.result.as_ref().unwrap();
            assert_eq!(deployments.len(), MAX_DEPLOYMENTS_PER_SITE);
            assert!(
                deployments
                    .windows(2)
                    .all(|w| w[0].created_at >= w[1].created_at)
            );
            assert!(deployments.iter().all(|d| d.site_id == outcome.site.id));
        }
        assert_eq!(
            *api.requested_limits.lock().unwrap(),
            vec![MAX_DEPLOYMENTS_PER_SITE, MAX_DEPLOYMENTS_PER_SITE]
        );
    }

    #[tokio::test]
    async fn test_fetch_isolates_site_failures() {
        let api = Arc::new(
            FakeSites::new(vec![site("s1", "One"), site("s2", "Two"), site("s3", "Three")])
                .with_deployments("s1", week_of_records("s1"))
                .with_failure("s2", StatusCode::INTERNAL_SERVER_ERROR)
                .with_deployments("s3", week_of_records("s3")),
        );
        let fetcher = Fetcher::new(api.clone());

        let outcomes = fetcher.fetch(&credentials()).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            &outcomes[1].result,
            Err(RelayError::UpstreamPartialFailure { site_id, .. }) if site_id == "s2"
        ));
        assert!(outcomes[2].result.is_ok());

        // Sites are visited in listing order, and the failure did not stop the loop
        assert_eq!(
            *api.deployment_calls.lock().unwrap(),
            vec!["s1".to_string(), "s2".to_string(), "s3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fetch_listing_failures() {
        let cases = [
            (StatusCode::UNAUTHORIZED, StatusCode::UNAUTHORIZED),
            (StatusCode::NOT_FOUND, StatusCode::NOT_FOUND),
            (StatusCode::BAD_GATEWAY, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (upstream, expected) in cases {
            let fetcher = Fetcher::new(Arc::new(FakeSites::failing(upstream)));
            let err = fetcher.fetch(&credentials()).await.unwrap_err();
            assert_eq!(err.status_code(), expected, "upstream {upstream}");
        }
    }

    #[tokio::test]
    async fn test_fetch_no_sites() {
        let fetcher = Fetcher::new(Arc::new(FakeSites::new(vec![])));
        let outcomes = fetcher.fetch(&credentials()).await.unwrap();
        assert!(outcomes.is_empty());
    }
}
