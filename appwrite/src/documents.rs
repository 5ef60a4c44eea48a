use crate::client::{AppwriteClient, AppwriteError, Credentials};
use crate::query;
use crate::types::{DocumentList, ProjectDocument};
use async_trait::async_trait;

/// Lookup of connected projects in the dashboard's persistence layer.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Returns the first document whose `projectId` matches, if any.
    async fn find_project(&self, project_id: &str)
    -> Result<Option<ProjectDocument>, AppwriteError>;
}

/// `ProjectStore` backed by an Appwrite Databases collection, read with the
/// relay's own service credentials.
pub struct DocumentStore {
    client: AppwriteClient,
    credentials: Credentials,
    database_id: String,
    collection_id: String,
}

impl DocumentStore {
    pub fn new(
        client: AppwriteClient,
        credentials: Credentials,
        database_id: String,
        collection_id: String,
    ) -> Self {
        DocumentStore {
            client,
            credentials,
            database_id,
            collection_id,
        }
    }
}

#[async_trait]
impl ProjectStore for DocumentStore {
    async fn find_project(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectDocument>, AppwriteError> {
        let list: DocumentList<ProjectDocument> = self
            .client
            .get_json(
                &self.credentials,
                &[
                    "databases",
                    &self.database_id,
                    "collections",
                    &self.collection_id,
                    "documents",
                ],
                &[(query::QUERY_PARAM, query::equal("projectId", project_id))],
            )
            .await?;

        Ok(list.documents.into_iter().next())
    }
}
