//! Batch Writer — buffers committed pages and flushes them to storage.
//!
//! - `begin` applies replace semantics: stored pages of the same resource are
//!   deleted before anything is written. A failure here aborts the upload.
//! - `write` buffers a page and flushes once `batch_size` pages are waiting.
//! - `finish` flushes the remainder.
//! - A failed flush deletes the pages this attempt stored, found by its
//!   `upload_id`, then surfaces the insert error (or both errors if the
//!   delete fails too). Pages written by any other attempt stay put.
//!   There is no retry; callers re-run the whole upload.

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::documents::UploadError;
use crate::models::document::ResourceIdentity;
use crate::models::page::Page;
use crate::storage::{PageStore, StoreError};

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub upload_id: Uuid,
    pub pages_written: usize,
    pub batches_flushed: usize,
}

pub struct BatchWriter<'s> {
    store: &'s dyn PageStore,
    identity: ResourceIdentity,
    upload_id: Uuid,
    batch_size: usize,
    buffer: Vec<Page>,
    pages_written: usize,
    batches_flushed: usize,
}

impl<'s> BatchWriter<'s> {
    /// Deletes any stored pages of `identity`, then returns an empty writer.
    pub async fn begin(
        store: &'s dyn PageStore,
        identity: ResourceIdentity,
        upload_id: Uuid,
        batch_size: usize,
    ) -> Result<Self, UploadError> {
        let removed = store
            .delete(&identity)
            .await
            .map_err(UploadError::StorageDelete)?;
        if removed > 0 {
            info!(
                %upload_id,
                owner = %identity.owner,
                title = %identity.title,
                removed,
                "Replaced existing resource"
            );
        }

        Ok(Self {
            store,
            identity,
            upload_id,
            batch_size: batch_size.max(1),
            buffer: Vec::with_capacity(batch_size),
            pages_written: 0,
            batches_flushed: 0,
        })
    }

    pub async fn write(&mut self, page: Page) -> Result<(), UploadError> {
        self.buffer.push(page);
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    pub async fn finish(mut self) -> Result<UploadSummary, UploadError> {
        self.flush().await?;
        Ok(UploadSummary {
            upload_id: self.upload_id,
            pages_written: self.pages_written,
            batches_flushed: self.batches_flushed,
        })
    }

    async fn flush(&mut self) -> Result<(), UploadError> {
        let Some(first) = self.buffer.first().map(Page::number) else {
            return Ok(());
        };
        let batch = std::mem::take(&mut self.buffer);

        match self.store.bulk_insert(self.upload_id, &batch).await {
            Ok(()) => {
                self.pages_written += batch.len();
                self.batches_flushed += 1;
                info!(
                    upload_id = %self.upload_id,
                    first_page = first,
                    pages = batch.len(),
                    "Flushed page batch"
                );
                Ok(())
            }
            Err(insert) => Err(self.rollback(first, insert).await),
        }
    }

    async fn rollback(&self, page_number: u32, insert: StoreError) -> UploadError {
        error!(
            upload_id = %self.upload_id,
            page_number,
            pages_already_written = self.pages_written,
            error = %insert,
            "Page batch insert failed, rolling back upload"
        );

        match self.store.delete_upload(&self.identity, self.upload_id).await {
            Ok(removed) => {
                warn!(upload_id = %self.upload_id, removed, "Partial upload rolled back");
                UploadError::StorageInsert {
                    page_number,
                    source: insert,
                }
            }
            Err(rollback) => {
                error!(
                    upload_id = %self.upload_id,
                    owner = %self.identity.owner,
                    title = %self.identity.title,
                    author = %self.identity.author,
                    error = %rollback,
                    "Rollback failed, stored pages need manual cleanup"
                );
                UploadError::RollbackFailed {
                    page_number,
                    insert,
                    rollback,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::page::{PageContent, Resource};
    use crate::storage::MemoryPageStore;

    fn identity() -> ResourceIdentity {
        ResourceIdentity::new("reader@example.com", "Faust", "Goethe")
    }

    fn page(number: u32) -> Page {
        Page {
            owner: "reader@example.com".to_string(),
            resource: Resource {
                title: "Faust".to_string(),
                author: "Goethe".to_string(),
                language: "german".to_string(),
                page_number: number,
            },
            content: PageContent::default(),
        }
    }

    async fn write_pages(
        store: &MemoryPageStore,
        count: u32,
        batch_size: usize,
    ) -> Result<UploadSummary, UploadError> {
        let mut writer = BatchWriter::begin(store, identity(), Uuid::new_v4(), batch_size).await?;
        for n in 1..=count {
            writer.write(page(n)).await?;
        }
        writer.finish().await
    }

    // ── batching ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_flushes_full_batches_and_remainder() {
        let store = MemoryPageStore::new();
        let summary = write_pages(&store, 7, 3).await.unwrap();
        assert_eq!(summary.pages_written, 7);
        assert_eq!(summary.batches_flushed, 3);
        assert_eq!(store.len().await, 7);
    }

    #[tokio::test]
    async fn test_nothing_buffered_means_nothing_flushed() {
        let store = MemoryPageStore::new();
        let summary = write_pages(&store, 0, 3).await.unwrap();
        assert_eq!(summary.pages_written, 0);
        assert_eq!(summary.batches_flushed, 0);
    }

    #[tokio::test]
    async fn test_pages_wait_in_buffer_until_batch_is_full() {
        let store = MemoryPageStore::new();
        let mut writer = BatchWriter::begin(&store, identity(), Uuid::new_v4(), 2)
            .await
            .unwrap();
        writer.write(page(1)).await.unwrap();
        assert_eq!(store.len().await, 0);
        writer.write(page(2)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    // ── replace semantics ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_begin_replaces_existing_resource() {
        let store = MemoryPageStore::new();
        write_pages(&store, 3, 10).await.unwrap();
        write_pages(&store, 2, 10).await.unwrap();

        let stored = store.find(&identity()).await.unwrap();
        assert_eq!(stored.iter().map(Page::number).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_begin_does_not_read_stored_pages() {
        let store = MemoryPageStore::new().failing_find();
        store.bulk_insert(Uuid::new_v4(), &[page(1), page(2)]).await.unwrap();

        let summary = write_pages(&store, 1, 10).await.unwrap();
        assert_eq!(summary.pages_written, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_failure_aborts_before_writing() {
        let store = MemoryPageStore::new().failing_delete_on(1);
        store.bulk_insert(Uuid::new_v4(), &[page(1)]).await.unwrap();

        let err = write_pages(&store, 2, 1).await.unwrap_err();
        assert!(matches!(err, UploadError::StorageDelete(_)));
        // the old page is untouched and nothing new was inserted
        assert_eq!(store.len().await, 1);
    }

    // ── rollback ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_failed_batch_rolls_back_earlier_batches() {
        let store = MemoryPageStore::new().failing_insert_on(3);
        let err = write_pages(&store, 10, 2).await.unwrap_err();

        match &err {
            UploadError::StorageInsert { page_number, .. } => assert_eq!(*page_number, 5),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.needs_manual_cleanup());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_rollback_spares_pages_of_another_attempt() {
        let store = MemoryPageStore::new();
        let mut writer = BatchWriter::begin(&store, identity(), Uuid::new_v4(), 1)
            .await
            .unwrap();

        // a second upload of the same resource lands between our delete and flush
        let other = Uuid::new_v4();
        store.bulk_insert(other, &[page(1), page(2)]).await.unwrap();

        let err = writer.write(page(1)).await.unwrap_err();
        assert!(matches!(err, UploadError::StorageInsert { page_number: 1, .. }));
        assert_eq!(store.upload_ids(&identity()).await, vec![other]);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_failed_rollback_is_reported_separately() {
        // delete #1 is the replace step in `begin`; the rollback is delete #2
        let store = MemoryPageStore::new().failing_insert_on(2).failing_delete_on(2);
        let err = write_pages(&store, 4, 2).await.unwrap_err();

        assert!(matches!(err, UploadError::RollbackFailed { page_number: 3, .. }));
        assert!(err.needs_manual_cleanup());
        assert_eq!(store.len().await, 2);
    }
}
