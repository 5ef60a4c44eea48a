//! Merges per-site results into one project-wide view.

use std::collections::BTreeMap;

use crate::types::{Deployment, SiteOutcome, sort_newest_first};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregate {
    /// Every fetched deployment across all sites, newest first
    pub deployments: Vec<Deployment>,
    /// Sites returned by the listing, including those whose deployments could not be fetched
    pub sites_count: usize,
    /// Sites whose deployment listing failed
    pub failed_sites: usize,
    pub status_counts: BTreeMap<String, usize>,
}

impl Aggregate {
    pub fn total(&self) -> usize {
        self.deployments.len()
    }

    pub fn latest(&self) -> Option<&Deployment> {
        self.deployments.first()
    }

    pub fn failed_deployments(&self) -> Vec<&Deployment> {
        self.deployments.iter().filter(|d| d.is_failed()).collect()
    }
}

pub fn aggregate(outcomes: &[SiteOutcome]) -> Aggregate {
    let mut deployments = Vec::new();
    let mut failed_sites = 0;

    for outcome in outcomes {
        match &outcome.result {
            Ok(site_deployments) => deployments.extend(site_deployments.iter().cloned()),
            Err(_) => failed_sites += 1,
        }
    }

    sort_newest_first(&mut deployments);

    let mut status_counts = BTreeMap::new();
    for deployment in &deployments {
        *status_counts.entry(deployment.status.clone()).or_insert(0) += 1;
    }

    Aggregate {
        deployments,
        sites_count: outcomes.len(),
        failed_sites,
        status_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RelayError;
    use crate::testutils::{deployment, site};
    use chrono::{DateTime, Duration};
    use quickcheck::quickcheck;

    fn ok(site_id: &str, deployments: Vec<Deployment>) -> SiteOutcome {
        SiteOutcome {
            site: site(site_id, site_id),
            result: Ok(deployments),
        }
    }

    fn failed(site_id: &str) -> SiteOutcome {
        SiteOutcome {
            site: site(site_id, site_id),
            result: Err(RelayError::UpstreamPartialFailure {
                site_id: site_id.into(),
                reason: "boom".into(),
            }),
        }
    }

    fn sample() -> Vec<SiteOutcome> {
        vec![
            ok(
                "s1",
                vec![
                    deployment("s1", "a3", "2025-03-05T00:00:00Z", "ready"),
                    deployment("s1", "a1", "2025-03-01T00:00:00Z", "failed"),
                ],
            ),
            ok(
                "s2",
                vec![
                    deployment("s2", "b4", "2025-03-06T00:00:00Z", "building"),
                    deployment("s2", "b2", "2025-03-03T00:00:00Z", "failed"),
                ],
            ),
        ]
    }

    #[test]
    fn test_merge_is_globally_sorted() {
        let result = aggregate(&sample());

        let ids: Vec<&str> = result.deployments.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b4", "a3", "b2", "a1"]);
        assert_eq!(result.total(), 4);
        assert_eq!(result.latest().map(|d| d.id.as_str()), Some("b4"));
        assert_eq!(result.sites_count, 2);
    }

    #[test]
    fn test_failed_subset_and_status_counts() {
        let result = aggregate(&sample());

        let failed: Vec<&str> = result
            .failed_deployments()
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(failed, vec!["b2", "a1"]);
        assert_eq!(result.status_counts.get("failed"), Some(&2));
        assert_eq!(result.status_counts.get("ready"), Some(&1));
        assert_eq!(result.status_counts.get("building"), Some(&1));
    }

    #[test]
    fn test_ties_keep_site_order() {
        let outcomes = vec![
            ok("s1", vec![deployment("s1", "first", "2025-03-01T00:00:00Z", "ready")]),
            ok("s2", vec![deployment("s2", "second", "2025-03-01T00:00:00Z", "ready")]),
        ];

        let ids: Vec<String> = aggregate(&outcomes)
            .deployments
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_failed_site_still_counted() {
        let mut outcomes = sample();
        outcomes.insert(1, failed("s3"));

        let result = aggregate(&outcomes);
        assert_eq!(result.sites_count, 3);
        assert_eq!(result.failed_sites, 1);
        assert_eq!(result.total(), 4);
    }

    #[test]
    fn test_aggregate_is_repeatable() {
        let outcomes = sample();
        assert_eq!(aggregate(&outcomes), aggregate(&outcomes));
        // Input untouched
        assert_eq!(outcomes[0].result.as_ref().unwrap()[0].id, "a3");
    }

    /// Builds one outcome per entry: `None` is a site whose listing failed,
    /// otherwise `(minutes after a fixed epoch, failed)` per deployment.
    fn arbitrary_outcomes(sites: &[Option<Vec<(u16, bool)>>]) -> Vec<SiteOutcome> {
        let epoch = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z").unwrap();

        sites
            .iter()
            .enumerate()
            .map(|(i, site_deployments)| {
                let site_id = format!("s{i}");
                match site_deployments {
                    None => failed(&site_id),
                    Some(entries) => {
                        let deployments = entries
                            .iter()
                            .enumerate()
                            .map(|(j, (minutes, is_failed))| {
                                let created = epoch + Duration::minutes(i64::from(*minutes));
                                let status = if *is_failed { "failed" } else { "ready" };
                                let id = format!("{site_id}-{j}");
                                deployment(&site_id, &id, &created.to_rfc3339(), status)
                            })
                            .collect();
                        ok(&site_id, deployments)
                    }
                }
            })
            .collect()
    }

    quickcheck! {
        fn prop_aggregate_is_sorted_and_complete(sites: Vec<Option<Vec<(u16, bool)>>>) -> bool {
            let outcomes = arbitrary_outcomes(&sites);
            let result = aggregate(&outcomes);

            let expected_total: usize = sites.iter().flatten().map(Vec::len).sum();
            let expected_failed = sites.iter().flatten().flatten().filter(|(_, f)| *f).count();
            let sorted = result
                .deployments
                .windows(2)
                .all(|pair| pair[0].created_at >= pair[1].created_at);

            sorted
                && result.total() == expected_total
                && result.failed_deployments().len() == expected_failed
                && result.sites_count == sites.len()
                && result.failed_sites == sites.iter().filter(|s| s.is_none()).count()
                && result.status_counts.values().sum::<usize>() == expected_total
                && aggregate(&outcomes) == result
        }
    }

    #[test]
    fn test_empty() {
        let result = aggregate(&[]);
        assert_eq!(result.total(), 0);
        assert_eq!(result.latest(), None);
        assert!(result.failed_deployments().is_empty());
        assert_eq!(result.sites_count, 0);
    }
}
