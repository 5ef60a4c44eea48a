//! In-memory stand-ins for the relay's collaborators.

use appwrite::{
    AppwriteError, Credentials, DeploymentRecord, ProjectDocument, ProjectStore, Site, SitesApi,
};
use async_trait::async_trait;
use chrono::DateTime;
use http::StatusCode;
use mailer::{Email, Mailer, MailerError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::Deployment;

fn status_error(status: StatusCode) -> AppwriteError {
    AppwriteError::Status {
        status,
        message: "fake upstream error".into(),
    }
}

pub fn site(id: &str, name: &str) -> Site {
    Site {
        id: id.into(),
        name: name.into(),
    }
}

pub fn record(id: &str, created_at: &str, status: &str) -> DeploymentRecord {
    let created_at = DateTime::parse_from_rfc3339(created_at).unwrap();
    DeploymentRecord {
        id: id.into(),
        created_at,
        updated_at: created_at,
        status: status.into(),
        kind: Some("vcs".into()),
        resource_id: None,
        source_size: Some(1024),
        build_size: Some(4096),
        total_size: Some(5120),
        build_duration: Some(61),
    }
}

pub fn deployment(site_id: &str, id: &str, created_at: &str, status: &str) -> Deployment {
    let site = site(site_id, &format!("{site_id}-name"));
    Deployment::from_record(&site, record(id, created_at, status))
}

pub struct FakeSites {
    sites: Result<Vec<Site>, StatusCode>,
    deployments: HashMap<String, Result<Vec<DeploymentRecord>, StatusCode>>,
    pub seen_keys: Mutex<Vec<String>>,
    pub deployment_calls: Mutex<Vec<String>>,
    pub requested_limits: Mutex<Vec<usize>>,
}

impl FakeSites {
    pub fn new(sites: Vec<Site>) -> Self {
        FakeSites {
            sites: Ok(sites),
            deployments: HashMap::new(),
            seen_keys: Mutex::new(Vec::new()),
            deployment_calls: Mutex::new(Vec::new()),
            requested_limits: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: StatusCode) -> Self {
        FakeSites {
            sites: Err(status),
            ..FakeSites::new(vec![])
        }
    }

    pub fn with_deployments(mut self, site_id: &str, records: Vec<DeploymentRecord>) -> Self {
        self.deployments.insert(site_id.into(), Ok(records));
        self
    }

    pub fn with_failure(mut self, site_id: &str, status: StatusCode) -> Self {
        self.deployments.insert(site_id.into(), Err(status));
        self
    }
}

#[async_trait]
impl SitesApi for FakeSites {
    async fn list_sites(&self, credentials: &Credentials) -> Result<Vec<Site>, AppwriteError> {
        self.seen_keys
            .lock()
            .unwrap()
            .push(credentials.api_key.clone());
        self.sites.clone().map_err(status_error)
    }

    async fn list_deployments(
        &self,
        _credentials: &Credentials,
        site_id: &str,
        limit: usize,
    ) -> Result<Vec<DeploymentRecord>, AppwriteError> {
        // Ignores `limit` so callers' own truncation stays observable
        self.deployment_calls.lock().unwrap().push(site_id.into());
        self.requested_limits.lock().unwrap().push(limit);
        match self.deployments.get(site_id) {
            Some(Ok(records)) => Ok(records.clone()),
            Some(Err(status)) => Err(status_error(*status)),
            None => Ok(vec![]),
        }
    }
}

pub struct FakeStore {
    result: Result<Option<ProjectDocument>, StatusCode>,
    pub lookups: AtomicUsize,
}

impl FakeStore {
    pub fn owner(email: &str, region: Option<&str>) -> Self {
        FakeStore {
            result: Ok(Some(ProjectDocument {
                document_id: Some("doc1".into()),
                user_id: Some("user1".into()),
                project_id: "proj1".into(),
                email: Some(email.into()),
                is_active: true,
                deployments: Some(0),
                api_key: None,
                region: region.map(Into::into),
            })),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        FakeStore {
            result: Ok(None),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        FakeStore {
            result: Err(StatusCode::SERVICE_UNAVAILABLE),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectStore for FakeStore {
    async fn find_project(
        &self,
        _project_id: &str,
    ) -> Result<Option<ProjectDocument>, AppwriteError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(status_error)
    }
}

/// Records every email it is asked to send. Attempts listed in `fail_on`
/// (1-based) fail instead.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
    attempts: AtomicUsize,
    fail_on: Vec<usize>,
    sender: Option<String>,
}

impl RecordingMailer {
    pub fn failing_on(fail_on: Vec<usize>) -> Self {
        RecordingMailer {
            fail_on,
            ..Default::default()
        }
    }

    pub fn with_sender(sender: &str) -> Self {
        RecordingMailer {
            sender: Some(sender.into()),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailerError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&attempt) {
            return Err(MailerError::ToolFailed(format!("attempt {attempt} rejected")));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }

    fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }
}
