//! End-to-end tests for `HttpSearchService` against a mock backend.
//!
//! An axum server on a free local port plays the search service and records
//! what it receives, so these tests pin down the wire contract: JSON search
//! bodies, document lookups, multipart uploads and error bodies.

use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;
use zerostack::client::{SearchClient, SearchSubmit};
use zerostack::config::Config;
use zerostack::error::{ClientError, UploadError};
use zerostack::service::{HttpSearchService, SearchService};
use zerostack::state::{OpState, UploadMode};

// ─── Mock backend ───────────────────────────────────────────────────

/// One multipart field as received by the backend.
#[derive(Debug, Clone, PartialEq)]
struct ReceivedField {
    name: String,
    file_name: Option<String>,
    data: Vec<u8>,
}

#[derive(Default)]
struct Recorded {
    searches: Vec<Value>,
    uploads: Vec<Vec<ReceivedField>>,
}

type Shared = Arc<Mutex<Recorded>>;

async fn handle_search(State(rec): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let query = body["query"].clone();
    rec.lock().unwrap().searches.push(body);
    Json(json!({
        "results": [1, 2],
        "scores": [0.91, 0.42],
        "query": query,
        "total_found": 2
    }))
}

async fn handle_document(Path(id): Path<i64>) -> Response {
    if id == 1 {
        Json(json!({"id": 1, "tags": ["Apple pie"], "content": "Bake at 180C."})).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Document not found"})),
        )
            .into_response()
    }
}

async fn handle_documents() -> Json<Value> {
    Json(json!([
        {"id": 1, "tags": ["Apple pie"], "content": "Bake at 180C."},
        {"id": 4, "tags": [], "content": "Untagged."}
    ]))
}

async fn handle_datasets() -> Json<Value> {
    Json(json!([
        {
            "id": 3,
            "name": "Books",
            "data_type": "csv",
            "total_records": 120,
            "created_at": "2024-03-01T12:00:00.123456",
            "file_size": 20480
        },
        {
            "id": 5,
            "name": "Notes",
            "data_type": "text",
            "total_records": 4,
            "created_at": "2024-03-02T08:30:00"
        }
    ]))
}

async fn handle_upload(State(rec): State<Shared>, mut multipart: Multipart) -> Response {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        fields.push(ReceivedField {
            name,
            file_name,
            data,
        });
    }

    let dataset_name = fields
        .iter()
        .find(|f| f.name == "dataset_name")
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .unwrap_or_default();
    rec.lock().unwrap().uploads.push(fields);

    match dataset_name.as_str() {
        "rejected" => (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Unsupported file type"})),
        )
            .into_response(),
        "gateway" => (StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>").into_response(),
        _ => Json(json!({
            "dataset_id": 9,
            "name": dataset_name,
            "data_type": "csv",
            "total_records": 2,
            "format_detected": {"type": "csv", "confidence": 0.97},
            "sample_records": [{"title": "Dune"}, {"title": "Emma"}]
        }))
        .into_response(),
    }
}

async fn handle_root() -> Json<Value> {
    Json(json!({"message": "ZeroStack Search API", "version": "1.0.0"}))
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Mock backend did not become ready within 5 seconds");
}

struct Backend {
    base_url: String,
    recorded: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl Backend {
    async fn start() -> Self {
        let recorded = Shared::default();
        let app = Router::new()
            .route("/", get(handle_root))
            .route("/search", post(handle_search))
            .route("/documents", get(handle_documents))
            .route("/documents/{id}", get(handle_document))
            .route("/datasets", get(handle_datasets))
            .route("/upload", post(handle_upload))
            .with_state(recorded.clone());

        let port = find_free_port();
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        wait_for_server(port).await;

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            recorded,
            handle,
        }
    }

    fn config(&self) -> Config {
        Config::minimal().with_base_url(self.base_url.as_str()).unwrap()
    }

    fn client(&self) -> SearchClient {
        let cfg = self.config();
        let service = HttpSearchService::new(&cfg).unwrap();
        SearchClient::new(Arc::new(service), &cfg)
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_search_posts_json_and_skips_missing_documents() {
    let backend = Backend::start().await;
    let client = backend.client();

    assert_eq!(client.submit_search("apple").await, SearchSubmit::Settled);

    let searches = backend.recorded.lock().unwrap().searches.clone();
    assert_eq!(
        searches,
        vec![json!({"query": "apple", "top_k": 10, "dataset_id": null})]
    );

    let state = client.search_state();
    let outcome = state.succeeded().unwrap();
    assert_eq!(outcome.total_found, Some(2));
    let visible: Vec<_> = outcome.visible().collect();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].2.title(), Some("Apple pie"));
    assert_eq!(visible[0].1.score, Some(0.91));
}

#[tokio::test]
async fn test_search_sends_selected_dataset() {
    let backend = Backend::start().await;
    let client = backend.client();
    client.mount().await;
    client.select_dataset(Some(3)).unwrap();

    client.submit_search("tolkien").await;

    let searches = backend.recorded.lock().unwrap().searches.clone();
    assert_eq!(searches[0]["dataset_id"], json!(3));
}

#[tokio::test]
async fn test_missing_document_is_status_error() {
    let backend = Backend::start().await;
    let service = HttpSearchService::new(&backend.config()).unwrap();

    match service.get_document(2).await {
        Err(ClientError::Status { status, .. }) => assert_eq!(status, 404),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_datasets_documents_and_status() {
    let backend = Backend::start().await;
    let service = HttpSearchService::new(&backend.config()).unwrap();

    let datasets = service.list_datasets().await.unwrap();
    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets[0].file_size, Some(20480));
    assert_eq!(datasets[1].file_size, None);

    let docs = service.list_documents().await.unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].title(), None);

    let status = service.status().await.unwrap();
    assert_eq!(status.message, "ZeroStack Search API");
    assert_eq!(status.version.as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn test_file_upload_sends_multipart_fields() {
    let backend = Backend::start().await;
    let client = backend.client();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("books.csv");
    std::fs::write(&path, "title\nDune\nEmma\n").unwrap();

    client.set_dataset_name("Test CSV Dataset");
    client.select_file(&path);
    let result = client.submit_upload().await.unwrap().unwrap();

    assert_eq!(result.dataset_id, 9);
    assert_eq!(result.format_detected.kind, "csv");
    assert_eq!(result.sample_records.len(), 2);

    let uploads = backend.recorded.lock().unwrap().uploads.clone();
    assert_eq!(uploads.len(), 1);
    let fields = &uploads[0];
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "dataset_name");
    assert_eq!(fields[0].data, b"Test CSV Dataset");
    assert_eq!(fields[1].name, "file");
    assert_eq!(fields[1].file_name.as_deref(), Some("books.csv"));
    assert_eq!(fields[1].data, b"title\nDune\nEmma\n");

    // The dataset list was reloaded after the upload.
    assert_eq!(client.snapshot().catalog.datasets.len(), 2);
}

#[tokio::test]
async fn test_text_upload_sends_text_data() {
    let backend = Backend::start().await;
    let client = backend.client();

    client.set_dataset_name("Pasted");
    client.set_upload_mode(UploadMode::Text);
    client.set_upload_text("a,b\n1,2\n");
    client.submit_upload().await.unwrap().unwrap();

    let uploads = backend.recorded.lock().unwrap().uploads.clone();
    let names: Vec<_> = uploads[0].iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["dataset_name", "text_data"]);
    assert_eq!(uploads[0][1].data, b"a,b\n1,2\n");
    assert_eq!(uploads[0][1].file_name, None);
}

#[tokio::test]
async fn test_upload_error_uses_detail_or_generic_message() {
    let backend = Backend::start().await;
    let client = backend.client();

    client.set_dataset_name("rejected");
    client.set_upload_text("x");
    assert_eq!(
        client.submit_upload().await,
        Some(Err(UploadError::Failed("Unsupported file type".into())))
    );

    client.set_dataset_name("gateway");
    assert_eq!(
        client.submit_upload().await,
        Some(Err(UploadError::Failed("Upload failed".into())))
    );
}

#[tokio::test]
async fn test_unreachable_service_fails_search() {
    let port = find_free_port();
    let cfg = Config::minimal()
        .with_base_url(format!("http://127.0.0.1:{}", port))
        .unwrap();
    let client = SearchClient::new(Arc::new(HttpSearchService::new(&cfg).unwrap()), &cfg);

    assert_eq!(client.submit_search("apple").await, SearchSubmit::Settled);
    assert_eq!(client.search_state(), OpState::Failed("Search failed".into()));

    assert!(!client.refresh_datasets().await);
    assert!(client.snapshot().catalog.datasets.is_empty());
}
