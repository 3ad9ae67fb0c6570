//! Page storage — the collaborator the upload pipeline persists pages through.
//!
//! `AppState` holds an `Arc<dyn PageStore>`, chosen at startup via `PAGE_STORE`.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::document::{DocumentSummary, ResourceIdentity};
use crate::models::page::Page;

pub mod memory;
pub mod postgres;

pub use memory::MemoryPageStore;
pub use postgres::PgPageStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Page content serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Page {page_number} is already stored for this resource")]
    Conflict { page_number: u32 },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Insert/delete contract the pagination engine requires from storage.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// All stored pages of a resource, ordered by page number.
    async fn find(&self, identity: &ResourceIdentity) -> Result<Vec<Page>, StoreError>;

    /// Removes every stored page of a resource. Returns the number removed.
    async fn delete(&self, identity: &ResourceIdentity) -> Result<u64, StoreError>;

    /// Removes the pages of a resource written by one upload attempt, leaving
    /// pages of other attempts in place. Returns the number removed.
    async fn delete_upload(
        &self,
        identity: &ResourceIdentity,
        upload_id: Uuid,
    ) -> Result<u64, StoreError>;

    /// Stores a batch of pages atomically, tagged with the upload attempt.
    async fn bulk_insert(&self, upload_id: Uuid, pages: &[Page]) -> Result<(), StoreError>;

    /// Every document `owner` has stored, ordered by title, then author.
    async fn list(&self, owner: &str) -> Result<Vec<DocumentSummary>, StoreError>;
}
