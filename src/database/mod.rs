pub mod document;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use serde::Serialize;
use thiserror::Error;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Errors from a DocumentStore backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

/// Collections held by the job-board database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Jobs,
    JobApplications,
    Companies,
    Blogs,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Jobs => "jobs",
            Collection::JobApplications => "job-Apply",
            Collection::Companies => "companies",
            Collection::Blogs => "blogs",
        }
    }
}

/// Offset/limit window for `find`. `limit: None` returns everything after `skip`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindPage {
    pub skip: u64,
    pub limit: Option<i64>,
}

impl FindPage {
    pub fn all() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAck {
    pub acknowledged: bool,
    #[serde(serialize_with = "document::serialize_bson")]
    pub inserted_id: Bson,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    #[serde(serialize_with = "document::serialize_optional_bson")]
    pub upserted_id: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAck {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Document database operations used by the HTTP layer.
///
/// Filters are exact-match documents (dotted paths allowed). Updates use
/// `$set` and `$inc`. Implementations must be safe to share across requests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, collection: Collection, document: Document) -> Result<InsertAck, StoreError>;

    async fn find(&self, collection: Collection, filter: Document, page: FindPage) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, collection: Collection, filter: Document) -> Result<Option<Document>, StoreError>;

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateAck, StoreError>;

    async fn delete_one(&self, collection: Collection, filter: Document) -> Result<DeleteAck, StoreError>;

    /// Rejects later inserts whose values for `keys` match an existing document.
    async fn ensure_unique_index(&self, collection: Collection, keys: &[&str]) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Indexes the HTTP layer relies on; run once at startup.
pub async fn ensure_indexes(store: &dyn DocumentStore) -> Result<(), StoreError> {
    store
        .ensure_unique_index(Collection::JobApplications, &["email", "jobId"])
        .await
}
