//! Minimal client for the parts of the Appwrite REST API the relay consumes:
//! listing sites and their deployments with a project's own key, and reading
//! connected-project documents with the relay's service key.

pub mod client;
pub mod documents;
mod query;
pub mod types;

pub use client::{AppwriteClient, AppwriteError, Credentials, SitesApi};
pub use documents::{DocumentStore, ProjectStore};
pub use types::{DeploymentRecord, ProjectDocument, Site};
