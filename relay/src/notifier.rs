use appwrite::ProjectStore;
use mailer::Mailer;
use shared::counter;
use std::sync::Arc;

use crate::config::ConsoleConfig;
use crate::email::{Templates, console_url};
use crate::errors::RelayError;
use crate::metrics_defs::{NOTIFICATIONS_FAILED, NOTIFICATIONS_SENT};
use crate::types::Deployment;

/// Outcome of one notification pass. Every attempt is either sent or failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NotificationReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Emails the project owner about failed deployments.
///
/// Each failure is dispatched on its own: a rejected email is logged and the
/// next one is still attempted. Nothing is retried or remembered between
/// calls, so a failure seen on two polls is reported twice.
#[derive(Clone)]
pub struct Notifier {
    mailer: Option<Arc<dyn Mailer>>,
    store: Arc<dyn ProjectStore>,
    console: ConsoleConfig,
    templates: Arc<Templates>,
}

impl Notifier {
    pub fn new(
        mailer: Option<Arc<dyn Mailer>>,
        store: Arc<dyn ProjectStore>,
        console: ConsoleConfig,
    ) -> Result<Self, RelayError> {
        Ok(Self {
            mailer,
            store,
            console,
            templates: Arc::new(Templates::new()?),
        })
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    pub fn mailer(&self) -> Result<&Arc<dyn Mailer>, RelayError> {
        self.mailer
            .as_ref()
            .ok_or(RelayError::NotificationUnavailable)
    }

    pub async fn notify_failures(
        &self,
        project_id: &str,
        failures: &[&Deployment],
    ) -> NotificationReport {
        let mut report = NotificationReport::default();

        if failures.is_empty() {
            return report;
        }

        tracing::warn!(
            project_id,
            failed = failures.len(),
            "Found failed deployments"
        );

        let mailer = match self.mailer() {
            Ok(mailer) => mailer,
            Err(e) => {
                tracing::warn!(project_id, error = %e, "Skipping failure notifications");
                return report;
            }
        };

        let project = match self.store.find_project(project_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                tracing::info!(project_id, "No connected project found, skipping notifications");
                return report;
            }
            Err(e) => {
                tracing::error!(project_id, error = %e, "Failed to look up project owner");
                return report;
            }
        };

        let Some(address) = project.notification_address() else {
            tracing::info!(project_id, "Project has no notification address, skipping notifications");
            return report;
        };

        let region = project
            .region
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.console.default_region);

        for deployment in failures {
            report.attempted += 1;

            let url = console_url(
                &self.console.base_url,
                region,
                project_id,
                &deployment.site_id,
            );
            let email = match self.templates.failure_email(deployment, address, &url) {
                Ok(email) => email,
                Err(e) => {
                    report.failed += 1;
                    counter!(NOTIFICATIONS_FAILED).increment(1);
                    tracing::error!(
                        project_id,
                        deployment_id = %deployment.resource_id,
                        error = %e,
                        "Failed to render failure notification"
                    );
                    continue;
                }
            };

            match mailer.send(&email).await {
                Ok(()) => {
                    report.sent += 1;
                    counter!(NOTIFICATIONS_SENT).increment(1);
                    tracing::info!(
                        project_id,
                        deployment_id = %deployment.resource_id,
                        "Sent failure notification"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    counter!(NOTIFICATIONS_FAILED).increment(1);
                    tracing::error!(
                        project_id,
                        deployment_id = %deployment.resource_id,
                        error = %e,
                        "Failed to send failure notification"
                    );
                }
            }
        }

        report
    }
}
