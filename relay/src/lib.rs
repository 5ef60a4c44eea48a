//! The Sendra relay: an HTTP service that lists a project's site deployments
//! on behalf of the dashboard and emails the owner about failed ones.

pub mod aggregator;
pub mod codec;
pub mod config;
pub mod email;
pub mod errors;
pub mod fetcher;
pub mod metrics_defs;
pub mod notifier;
pub mod protocol;
pub mod service;
pub mod types;

#[cfg(test)]
mod testutils;

use appwrite::{AppwriteClient, Credentials, DocumentStore};
use mailer::Mailer;
use shared::http::run_http_service;
use std::sync::Arc;

use crate::errors::RelayError;
use crate::fetcher::Fetcher;
use crate::notifier::Notifier;
use crate::service::{RelayService, build_stack};

/// Serves the relay until the listener fails.
///
/// `mailer` is the connected messaging tool, if any. Without one, failures are
/// still reported in responses but no email goes out.
pub async fn run(
    config: config::Config,
    mailer: Option<Arc<dyn Mailer>>,
) -> Result<(), RelayError> {
    let client = AppwriteClient::new(config.appwrite.endpoint.clone());
    let store = DocumentStore::new(
        client.clone(),
        Credentials::new(
            config.appwrite.project_id.clone(),
            config.appwrite.api_key.clone(),
        ),
        config.appwrite.database_id.clone(),
        config.appwrite.collection_id.clone(),
    );

    let service = RelayService::new(
        Fetcher::new(Arc::new(client)),
        Notifier::new(mailer, Arc::new(store), config.console.clone())?,
        config.listener.port,
    );

    run_http_service(
        &config.listener.host,
        config.listener.port,
        build_stack(service),
    )
    .await?;
    Ok(())
}
