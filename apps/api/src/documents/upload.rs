use tracing::info;
use uuid::Uuid;

use crate::config::PaginationSettings;
use crate::documents::batch::{BatchWriter, UploadSummary};
use crate::documents::UploadError;
use crate::models::document::{DocumentDescriptor, ResourceIdentity};
use crate::pagination::{Language, Paginator};
use crate::storage::{PageStore, StoreError};

/// Paginates `document` and stores its pages, replacing any earlier upload of
/// the same (owner, title, author).
///
/// Pages are handed to storage in page-number order as soon as the paginator
/// commits them; at most one page is held back waiting for lookahead.
pub async fn upload_document(
    store: &dyn PageStore,
    settings: PaginationSettings,
    document: &DocumentDescriptor,
) -> Result<UploadSummary, UploadError> {
    document
        .validate()
        .map_err(UploadError::MalformedDocument)?;

    let language = Language::select(&document.language);
    let identity = document.identity();
    let mut paginator = Paginator::new(language.profile(), settings, identity.clone(), language.code())
        .map_err(UploadError::Configuration)?;

    let upload_id = Uuid::new_v4();
    info!(
        %upload_id,
        owner = %identity.owner,
        title = %identity.title,
        author = %identity.author,
        language = language.code(),
        lines = document.lines.len(),
        "Document upload started"
    );

    let mut writer = BatchWriter::begin(store, identity, upload_id, settings.batch_size).await?;

    for line in &document.lines {
        for page in paginator.accept_line(line) {
            writer.write(page).await?;
        }
    }
    for page in paginator.finish() {
        writer.write(page).await?;
    }

    let summary = writer.finish().await?;
    info!(
        %upload_id,
        pages = summary.pages_written,
        batches = summary.batches_flushed,
        "Document upload finished"
    );
    Ok(summary)
}

/// Deletes every stored page of a resource.
pub async fn remove_document(
    store: &dyn PageStore,
    identity: &ResourceIdentity,
) -> Result<u64, StoreError> {
    let removed = store.delete(identity).await?;
    info!(
        owner = %identity.owner,
        title = %identity.title,
        author = %identity.author,
        removed,
        "Document removed"
    );
    Ok(removed)
}
