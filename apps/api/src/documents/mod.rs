// Document upload pipeline: replace semantics, batched persistence with
// compensating rollback, and the HTTP handlers in front of it.

pub mod batch;
pub mod handlers;
pub mod upload;

use thiserror::Error;

use crate::storage::StoreError;

/// Why an upload did not complete.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid pagination configuration: {0}")]
    Configuration(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Replacing the previously stored resource failed; nothing was written.
    #[error("Could not remove existing document: {0}")]
    StorageDelete(#[source] StoreError),

    /// A batch insert failed and the pages written so far were removed.
    #[error("Could not insert page batch starting at page {page_number}: {source}")]
    StorageInsert {
        page_number: u32,
        #[source]
        source: StoreError,
    },

    /// A batch insert failed and removing the partial upload failed too.
    #[error(
        "Could not insert page batch starting at page {page_number} ({insert}); \
         rollback also failed ({rollback})"
    )]
    RollbackFailed {
        page_number: u32,
        insert: StoreError,
        rollback: StoreError,
    },
}

impl UploadError {
    /// True when pages of the failed attempt may still be in storage.
    pub fn needs_manual_cleanup(&self) -> bool {
        matches!(self, UploadError::RollbackFailed { .. })
    }

    /// True when the failure came from the submitted input rather than storage.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            UploadError::Configuration(_) | UploadError::MalformedDocument(_)
        )
    }
}
