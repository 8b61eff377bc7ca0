//! End-to-end API tests driven through the router with an in-process
//! deterministic embedder and a canned completion backend.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use rag_tenant_node::{
    api::{build_router, AppState, ConversationStore},
    config::{AppConfig, CompletionConfig},
    ingestion::WebLoader,
    rag::{ChatMessage, CompletionBackend, CompletionError, Responder, StaticCompletion},
    tenants::{TenantConfig, TenantStore},
    vector::{HashEmbedder, VectorStore},
};

struct TestApp {
    router: Router,
    upload_dir: PathBuf,
    tenants: Arc<TenantStore>,
    store: Arc<VectorStore>,
    _root: TempDir,
}

async fn test_app_with_backend(completion: Arc<dyn CompletionBackend>) -> TestApp {
    let root = TempDir::new().unwrap();
    let tenants_dir = root.path().join("tenants");
    let upload_dir = root.path().join("uploads");
    let vector_dir = root.path().join("vector_data");

    let tenants = Arc::new(TenantStore::new(&tenants_dir));
    tenants
        .save(&TenantConfig {
            id: "acme".to_string(),
            name: "Acme Corp".to_string(),
            vector_namespace: "acme_ns".to_string(),
            assistant_instruction: "Be concise".to_string(),
        })
        .await
        .unwrap();

    let store = Arc::new(VectorStore::new(
        &vector_dir,
        Arc::new(HashEmbedder::default()),
    ));
    let responder = Arc::new(Responder::new(store.clone(), completion));

    let config = AppConfig {
        api_port: 0,
        tenants_dir,
        upload_dir: upload_dir.clone(),
        vector_dir,
        completion: CompletionConfig {
            api_key: "test-key".to_string(),
            base_url: "http://unused.invalid".to_string(),
            model: "test-model".to_string(),
            temperature: 0.0,
            max_tokens: 100,
        },
        embeddings_url: None,
    };

    let state = AppState {
        config: Arc::new(config),
        tenants: tenants.clone(),
        store: store.clone(),
        responder,
        conversations: Arc::new(ConversationStore::new()),
        web_loader: Arc::new(WebLoader::new().unwrap()),
    };

    TestApp {
        router: build_router(state),
        upload_dir,
        tenants,
        store,
        _root: root,
    }
}

async fn test_app(answer: &str) -> TestApp {
    test_app_with_backend(Arc::new(StaticCompletion::new(answer))).await
}

/// Build a one-page PDF containing the given text.
fn one_page_pdf(text: &str) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn multipart_pdf_request(tenant: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let boundary = "test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(format!("/api/{tenant}/knowledge/pdf"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn ingest_pdf_then_chat_returns_answer_and_sources() {
    let app = test_app("This document is a short test note.").await;

    let pdf = one_page_pdf("Hello world. This is a test.");
    let response = app
        .router
        .clone()
        .oneshot(multipart_pdf_request("acme", "hello.pdf", &pdf))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["chunks"], 1);
    assert_eq!(body["file"], "hello.pdf");
    assert!(app.upload_dir.join("acme/hello.pdf").exists());

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/acme/chat?query=What%20is%20this%3F")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["tenant"], "Acme Corp");
    assert_eq!(body["query"], "What is this?");
    assert_eq!(body["answer"], "This document is a short test note.");
    let sources = body["sources"].as_array().unwrap();
    assert!(!sources.is_empty());
    assert!(sources[0].as_str().unwrap().contains("Hello world"));
}

#[tokio::test]
async fn chat_for_unknown_tenant_is_404() {
    let app = test_app("unused").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/ghost/chat?query=hello")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains("Tenant not found"));
}

#[tokio::test]
async fn chat_with_empty_namespace_is_500() {
    let app = test_app("unused").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/acme/chat?query=anything")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("Knowledge base error"));
}

#[tokio::test]
async fn non_pdf_upload_is_rejected_without_persisting() {
    let app = test_app("unused").await;

    let response = app
        .router
        .clone()
        .oneshot(multipart_pdf_request("acme", "notes.txt", b"plain text"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["detail"], "Only PDF files are accepted");
    assert!(!app.upload_dir.join("acme/notes.txt").exists());
}

#[tokio::test]
async fn traversal_filenames_are_rejected() {
    let app = test_app("unused").await;

    let response = app
        .router
        .clone()
        .oneshot(multipart_pdf_request("acme", "..evil.pdf", b"x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn double_ingestion_doubles_chunk_count() {
    let app = test_app("unused").await;
    let pdf = one_page_pdf("Hello world. This is a test.");

    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(multipart_pdf_request("acme", "hello.pdf", &pdf))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(app.store.count("acme_ns").await.unwrap(), 2);
}

#[tokio::test]
async fn delete_removes_file_and_embeddings() {
    let app = test_app("unused").await;
    let pdf = one_page_pdf("Hello world. This is a test.");

    let response = app
        .router
        .clone()
        .oneshot(multipart_pdf_request("acme", "hello.pdf", &pdf))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/acme/knowledge/pdf/hello.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "deleted");
    assert_eq!(body["file"], "hello.pdf");
    assert_eq!(body["tenant"], "acme");
    assert_eq!(body["embeddings_removed"], 1);

    assert!(!app.upload_dir.join("acme/hello.pdf").exists());
    assert_eq!(app.store.count("acme_ns").await.unwrap(), 0);
}

#[tokio::test]
async fn delete_of_missing_file_is_404() {
    let app = test_app("unused").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/acme/knowledge/pdf/missing.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_instruction_persists() {
    let app = test_app("unused").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/acme/instruction")
                .header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(Body::from("instruction=Always%20answer%20in%20French"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "updated");
    assert_eq!(body["instruction"], "Always answer in French");

    let loaded = app.tenants.load("acme").await.unwrap();
    assert_eq!(loaded.assistant_instruction, "Always answer in French");
}

#[tokio::test]
async fn web_ingestion_rejects_unsafe_url() {
    let app = test_app("unused").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/acme/knowledge/web")
                .header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(Body::from("url=http%3A%2F%2Flocalhost%2Fadmin"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["detail"].as_str().unwrap().contains("Unsafe URL"));
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = test_app("unused").await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// Backend that records how many messages each call carried.
struct CountingCompletion {
    message_counts: std::sync::Mutex<Vec<usize>>,
}

#[async_trait::async_trait]
impl CompletionBackend for CountingCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        self.message_counts.lock().unwrap().push(messages.len());
        Ok("counted".to_string())
    }
}

#[tokio::test]
async fn conversation_history_flows_into_later_calls() {
    let backend = Arc::new(CountingCompletion {
        message_counts: std::sync::Mutex::new(Vec::new()),
    });
    let app = test_app_with_backend(backend.clone()).await;

    let pdf = one_page_pdf("Hello world. This is a test.");
    app.router
        .clone()
        .oneshot(multipart_pdf_request("acme", "hello.pdf", &pdf))
        .await
        .unwrap();

    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/acme/chat?query=hi&conversation_id=c1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // First call: system + query. Second call: system + two history turns + query.
    let counts = backend.message_counts.lock().unwrap();
    assert_eq!(*counts, vec![2, 4]);
}
