//! In-process `PageStore`. Backs local runs with `PAGE_STORE=memory` and the
//! test suite, which uses its failure injection to exercise rollback paths.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::document::{DocumentSummary, ResourceIdentity};
use crate::models::page::Page;
use crate::storage::{PageStore, StoreError};

#[derive(Debug, Clone)]
struct StoredPage {
    upload_id: Uuid,
    page: Page,
}

#[derive(Default)]
pub struct MemoryPageStore {
    pages: Mutex<Vec<StoredPage>>,
    insert_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_insert_on: Option<usize>,
    fail_delete_on: Option<usize>,
    fail_find: bool,
}

fn belongs_to(page: &Page, identity: &ResourceIdentity) -> bool {
    page.owner == identity.owner
        && page.resource.title == identity.title
        && page.resource.author == identity.author
}

/// Same resource and page number: the storage uniqueness key.
fn same_slot(a: &Page, b: &Page) -> bool {
    a.owner == b.owner
        && a.resource.title == b.resource.title
        && a.resource.author == b.resource.author
        && a.number() == b.number()
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_delete_call(&self) -> Result<(), StoreError> {
        let call = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_delete_on == Some(call) {
            return Err(StoreError::Unavailable(format!("injected delete failure on call {call}")));
        }
        Ok(())
    }
}

#[cfg(test)]
impl MemoryPageStore {
    /// Makes the `call`-th `bulk_insert` (1-based) fail.
    pub fn failing_insert_on(mut self, call: usize) -> Self {
        self.fail_insert_on = Some(call);
        self
    }

    /// Makes the `call`-th `delete` or `delete_upload` (1-based, counted
    /// together) fail.
    pub fn failing_delete_on(mut self, call: usize) -> Self {
        self.fail_delete_on = Some(call);
        self
    }

    /// Makes every `find` fail, as an unreadable stored page would.
    pub fn failing_find(mut self) -> Self {
        self.fail_find = true;
        self
    }

    pub async fn len(&self) -> usize {
        self.pages.lock().await.len()
    }

    /// Upload attempts that currently own stored pages of `identity`.
    pub async fn upload_ids(&self, identity: &ResourceIdentity) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .pages
            .lock()
            .await
            .iter()
            .filter(|stored| belongs_to(&stored.page, identity))
            .map(|stored| stored.upload_id)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn find(&self, identity: &ResourceIdentity) -> Result<Vec<Page>, StoreError> {
        if self.fail_find {
            return Err(StoreError::Unavailable("injected find failure".to_string()));
        }
        let mut found: Vec<Page> = self
            .pages
            .lock()
            .await
            .iter()
            .filter(|stored| belongs_to(&stored.page, identity))
            .map(|stored| stored.page.clone())
            .collect();
        found.sort_by_key(Page::number);
        Ok(found)
    }

    async fn delete(&self, identity: &ResourceIdentity) -> Result<u64, StoreError> {
        self.next_delete_call()?;

        let mut pages = self.pages.lock().await;
        let before = pages.len();
        pages.retain(|stored| !belongs_to(&stored.page, identity));
        Ok((before - pages.len()) as u64)
    }

    async fn delete_upload(
        &self,
        identity: &ResourceIdentity,
        upload_id: Uuid,
    ) -> Result<u64, StoreError> {
        self.next_delete_call()?;

        let mut pages = self.pages.lock().await;
        let before = pages.len();
        pages.retain(|stored| stored.upload_id != upload_id || !belongs_to(&stored.page, identity));
        Ok((before - pages.len()) as u64)
    }

    async fn bulk_insert(&self, upload_id: Uuid, batch: &[Page]) -> Result<(), StoreError> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_insert_on == Some(call) {
            return Err(StoreError::Unavailable(format!("injected insert failure on call {call}")));
        }

        let mut pages = self.pages.lock().await;
        for (i, page) in batch.iter().enumerate() {
            let clash = pages.iter().any(|stored| same_slot(&stored.page, page))
                || batch[..i].iter().any(|earlier| same_slot(earlier, page));
            if clash {
                return Err(StoreError::Conflict {
                    page_number: page.number(),
                });
            }
        }
        pages.extend(batch.iter().cloned().map(|page| StoredPage { upload_id, page }));
        Ok(())
    }

    async fn list(&self, owner: &str) -> Result<Vec<DocumentSummary>, StoreError> {
        let mut docs: Vec<DocumentSummary> = self
            .pages
            .lock()
            .await
            .iter()
            .filter(|stored| stored.page.owner == owner && stored.page.number() == 1)
            .map(|stored| DocumentSummary {
                title: stored.page.resource.title.clone(),
                author: stored.page.resource.author.clone(),
            })
            .collect();
        docs.sort_by(|a, b| (&a.title, &a.author).cmp(&(&b.title, &b.author)));
        Ok(docs)
    }
}
