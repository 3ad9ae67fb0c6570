use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::models::document::{DocumentSummary, ResourceIdentity};
use crate::models::page::{Page, PageRow};
use crate::storage::{PageStore, StoreError};

/// `PageStore` over the `pages` table.
#[derive(Clone)]
pub struct PgPageStore {
    pool: PgPool,
}

impl PgPageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageStore for PgPageStore {
    async fn find(&self, identity: &ResourceIdentity) -> Result<Vec<Page>, StoreError> {
        let rows = sqlx::query_as::<_, PageRow>(
            r#"
            SELECT *
            FROM pages
            WHERE owner = $1 AND title = $2 AND author = $3
            ORDER BY page_number ASC
            "#,
        )
        .bind(&identity.owner)
        .bind(&identity.title)
        .bind(&identity.author)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(Page::try_from)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn delete(&self, identity: &ResourceIdentity) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM pages WHERE owner = $1 AND title = $2 AND author = $3")
            .bind(&identity.owner)
            .bind(&identity.title)
            .bind(&identity.author)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_upload(
        &self,
        identity: &ResourceIdentity,
        upload_id: Uuid,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM pages
            WHERE upload_id = $1 AND owner = $2 AND title = $3 AND author = $4
            "#,
        )
        .bind(upload_id)
        .bind(&identity.owner)
        .bind(&identity.title)
        .bind(&identity.author)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn bulk_insert(&self, upload_id: Uuid, pages: &[Page]) -> Result<(), StoreError> {
        if pages.is_empty() {
            return Ok(());
        }

        let contents = pages
            .iter()
            .map(|page| serde_json::to_value(&page.content))
            .collect::<Result<Vec<Value>, _>>()?;

        // One multi-row INSERT per batch: the batch lands completely or not at all.
        // Binds per row are what `config::MAX_BATCH_SIZE` is derived from.
        let mut insert = QueryBuilder::<Postgres>::new(
            "INSERT INTO pages (id, owner, title, author, language, page_number, upload_id, content) ",
        );
        insert.push_values(pages.iter().zip(contents), |mut row, (page, content)| {
            row.push_bind(Uuid::new_v4())
                .push_bind(page.owner.clone())
                .push_bind(page.resource.title.clone())
                .push_bind(page.resource.author.clone())
                .push_bind(page.resource.language.clone())
                .push_bind(page.resource.page_number as i32)
                .push_bind(upload_id)
                .push_bind(content);
        });
        insert.build().execute(&self.pool).await?;

        debug!(%upload_id, pages = pages.len(), "Inserted page batch");
        Ok(())
    }

    async fn list(&self, owner: &str) -> Result<Vec<DocumentSummary>, StoreError> {
        // page 1 exists for every stored document, empty ones included
        let docs = sqlx::query_as::<_, DocumentSummary>(
            r#"
            SELECT title, author
            FROM pages
            WHERE owner = $1 AND page_number = 1
            ORDER BY title ASC, author ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs)
    }
}
