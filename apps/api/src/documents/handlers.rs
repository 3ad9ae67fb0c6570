use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::documents::upload::{remove_document, upload_document};
use crate::errors::AppError;
use crate::models::document::{DocumentDescriptor, DocumentSummary, ResourceIdentity};
use crate::models::page::{Page, PageContent};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UploadRequest {
    pub owner: String,
    pub title: String,
    pub author: String,
    pub language: Option<String>,
    pub text: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub title: String,
    pub author: String,
    pub pages_written: usize,
    pub batches_flushed: usize,
}

#[derive(Deserialize)]
pub struct ResourceQuery {
    pub owner: String,
    pub title: String,
    pub author: String,
}

impl ResourceQuery {
    fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(&self.owner, &self.title, &self.author)
    }
}

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}

#[derive(Serialize)]
pub struct DocumentListResponse {
    pub docs: Vec<DocumentSummary>,
}

// Query strings deserialize as flat maps, so the identity fields are repeated
// rather than flattened.
#[derive(Deserialize)]
pub struct PageQuery {
    pub owner: String,
    pub title: String,
    pub author: String,
    pub page: u32,
}

#[derive(Deserialize)]
pub struct PageRangeQuery {
    pub owner: String,
    pub title: String,
    pub author: String,
    pub start: u32,
    pub end: Option<u32>,
}

#[derive(Serialize)]
pub struct PageResponse {
    pub title: String,
    pub author: String,
    pub language: String,
    pub page_number: u32,
    pub content: PageContent,
}

impl From<Page> for PageResponse {
    fn from(page: Page) -> Self {
        Self {
            title: page.resource.title,
            author: page.resource.author,
            language: page.resource.language,
            page_number: page.resource.page_number,
            content: page.content,
        }
    }
}

#[derive(Serialize)]
pub struct PageRangeResponse {
    pub content: Vec<PageContent>,
    pub start_page: u32,
}

/// POST /api/v1/documents
pub async fn handle_upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let language = req
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| state.config.default_language.clone());
    let document =
        DocumentDescriptor::from_text(req.owner, req.title, req.author, language, &req.text);

    let summary =
        upload_document(state.store.as_ref(), state.config.pagination, &document).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            title: document.title,
            author: document.author,
            pages_written: summary.pages_written,
            batches_flushed: summary.batches_flushed,
        }),
    ))
}

/// GET /api/v1/documents
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let docs = state.store.list(&params.owner).await?;
    if docs.is_empty() {
        return Err(AppError::NotFound("Couldn't find user's documents".to_string()));
    }
    Ok(Json(DocumentListResponse { docs }))
}

/// GET /api/v1/documents/page
pub async fn handle_get_page(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<PageResponse>, AppError> {
    let pages = state
        .store
        .find(&ResourceIdentity::new(&params.owner, &params.title, &params.author))
        .await?;
    let page = pages
        .into_iter()
        .find(|p| p.number() == params.page)
        .ok_or_else(|| AppError::NotFound("Couldn't retrieve requested page".to_string()))?;
    Ok(Json(page.into()))
}

/// GET /api/v1/documents/pages
pub async fn handle_get_page_range(
    State(state): State<AppState>,
    Query(params): Query<PageRangeQuery>,
) -> Result<Json<PageRangeResponse>, AppError> {
    if params.start == 0 {
        return Err(AppError::Validation("start must be at least 1".to_string()));
    }
    let span = state.config.page_range_default_size.max(1);
    let end = params
        .end
        .unwrap_or_else(|| params.start.saturating_add(span - 1));
    if end < params.start {
        return Err(AppError::Validation(format!(
            "end ({end}) must not be before start ({})",
            params.start
        )));
    }

    let mut pages: Vec<Page> = state
        .store
        .find(&ResourceIdentity::new(&params.owner, &params.title, &params.author))
        .await?
        .into_iter()
        .filter(|p| (params.start..=end).contains(&p.number()))
        .collect();
    if pages.is_empty() {
        return Err(AppError::NotFound(
            "Couldn't retrieve requested pages".to_string(),
        ));
    }
    pages.sort_by_key(Page::number);

    Ok(Json(PageRangeResponse {
        content: pages.into_iter().map(|p| p.content).collect(),
        start_page: params.start,
    }))
}

/// DELETE /api/v1/documents
pub async fn handle_delete(
    State(state): State<AppState>,
    Query(params): Query<ResourceQuery>,
) -> Result<Json<Value>, AppError> {
    let removed = remove_document(state.store.as_ref(), &params.identity()).await?;
    Ok(Json(json!({ "deleted": removed })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
        Router,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::routes::build_router;
    use crate::storage::{MemoryPageStore, PageStore};

    fn test_router(store: Arc<MemoryPageStore>) -> Router {
        let config = Config::from_lookup(|key| match key {
            "PAGE_STORE" => Some("memory".to_string()),
            "LINE_WIDTH" => Some("12".to_string()),
            "PAGE_LENGTH" => Some("2".to_string()),
            "BATCH_SIZE" => Some("2".to_string()),
            "PAGE_RANGE_DEFAULT_SIZE" => Some("2".to_string()),
            _ => None,
        })
        .unwrap();
        let store: Arc<dyn PageStore> = store;
        build_router(AppState { store, config })
    }

    async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn upload_body(text: &str) -> Value {
        json!({
            "owner": "ana",
            "title": "Notes",
            "author": "Kim",
            "text": text
        })
    }

    const TEXT: &str = "eins zwei drei vier\nfuenf sechs sieben acht\nneun zehn elf zwoelf";

    // ── upload ──

    #[tokio::test]
    async fn test_upload_returns_created_summary() {
        let store = Arc::new(MemoryPageStore::new());
        let (status, body) = send(
            test_router(store.clone()),
            Method::POST,
            "/api/v1/documents",
            Some(upload_body(TEXT)),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["title"], "Notes");
        assert_eq!(body["author"], "Kim");
        let pages = body["pages_written"].as_u64().unwrap();
        assert!(pages >= 2);
        assert_eq!(store.len().await as u64, pages);
    }

    #[tokio::test]
    async fn test_upload_defaults_language() {
        let store = Arc::new(MemoryPageStore::new());
        send(
            test_router(store.clone()),
            Method::POST,
            "/api/v1/documents",
            Some(upload_body(TEXT)),
        )
        .await;

        let pages = store
            .find(&ResourceIdentity::new("ana", "Notes", "Kim"))
            .await
            .unwrap();
        assert!(pages.iter().all(|p| p.resource.language == "english"));
    }

    #[tokio::test]
    async fn test_upload_blank_title_is_bad_request() {
        let store = Arc::new(MemoryPageStore::new());
        let mut body = upload_body(TEXT);
        body["title"] = json!("   ");
        let (status, body) = send(
            test_router(store.clone()),
            Method::POST,
            "/api/v1/documents",
            Some(body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_upload_storage_failure_is_generic() {
        let store = Arc::new(MemoryPageStore::new().failing_insert_on(1));
        let (status, body) = send(
            test_router(store.clone()),
            Method::POST,
            "/api/v1/documents",
            Some(upload_body(TEXT)),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"]["message"],
            "Error uploading document. Please try again."
        );
        assert_eq!(store.len().await, 0);
    }

    // ── retrieval ──

    #[tokio::test]
    async fn test_list_documents_sorted_by_title() {
        let store = Arc::new(MemoryPageStore::new());
        for title in ["Notes", "Ideas"] {
            let mut body = upload_body(TEXT);
            body["title"] = json!(title);
            send(test_router(store.clone()), Method::POST, "/api/v1/documents", Some(body)).await;
        }

        let (status, body) = send(
            test_router(store),
            Method::GET,
            "/api/v1/documents?owner=ana",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["docs"],
            json!([
                {"title": "Ideas", "author": "Kim"},
                {"title": "Notes", "author": "Kim"}
            ])
        );
    }

    #[tokio::test]
    async fn test_list_without_documents_is_not_found() {
        let store = Arc::new(MemoryPageStore::new());
        let (status, body) = send(
            test_router(store),
            Method::GET,
            "/api/v1/documents?owner=ana",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Couldn't find user's documents");
    }

    #[tokio::test]
    async fn test_get_page_returns_ledger() {
        let store = Arc::new(MemoryPageStore::new());
        send(
            test_router(store.clone()),
            Method::POST,
            "/api/v1/documents",
            Some(upload_body(TEXT)),
        )
        .await;

        let (status, body) = send(
            test_router(store),
            Method::GET,
            "/api/v1/documents/page?owner=ana&title=Notes&author=Kim&page=1",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page_number"], 1);
        assert_eq!(body["content"]["words"][0][0], "eins");
        assert_eq!(body["content"]["breaks"]["pageBoundaries"]["previous"], Value::Null);
        assert_eq!(
            body["content"]["breaks"]["pageBoundaries"]["next"],
            json!({"page": 2, "line": 0, "pos": 0})
        );
    }

    #[tokio::test]
    async fn test_get_missing_page_is_not_found() {
        let store = Arc::new(MemoryPageStore::new());
        let (status, body) = send(
            test_router(store),
            Method::GET,
            "/api/v1/documents/page?owner=ana&title=Notes&author=Kim&page=3",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Couldn't retrieve requested page");
    }

    #[tokio::test]
    async fn test_page_range_defaults_end() {
        let store = Arc::new(MemoryPageStore::new());
        send(
            test_router(store.clone()),
            Method::POST,
            "/api/v1/documents",
            Some(upload_body(TEXT)),
        )
        .await;

        let (status, body) = send(
            test_router(store),
            Method::GET,
            "/api/v1/documents/pages?owner=ana&title=Notes&author=Kim&start=1",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["start_page"], 1);
        assert_eq!(body["content"].as_array().unwrap().len(), 2);
        assert_eq!(body["content"][0]["words"][0][0], "eins");
    }

    #[tokio::test]
    async fn test_page_range_rejects_inverted_bounds() {
        let store = Arc::new(MemoryPageStore::new());
        let (status, _) = send(
            test_router(store),
            Method::GET,
            "/api/v1/documents/pages?owner=ana&title=Notes&author=Kim&start=3&end=1",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // ── delete ──

    #[tokio::test]
    async fn test_delete_removes_pages() {
        let store = Arc::new(MemoryPageStore::new());
        let (_, uploaded) = send(
            test_router(store.clone()),
            Method::POST,
            "/api/v1/documents",
            Some(upload_body(TEXT)),
        )
        .await;

        let (status, body) = send(
            test_router(store.clone()),
            Method::DELETE,
            "/api/v1/documents?owner=ana&title=Notes&author=Kim",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], uploaded["pages_written"]);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_health() {
        let store = Arc::new(MemoryPageStore::new());
        let (status, body) = send(test_router(store), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "pagebound");
    }
}
