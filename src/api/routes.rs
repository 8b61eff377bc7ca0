//! HTTP API surface
//!
//! Per-tenant ingestion, deletion, instruction-update, and chat endpoints.
//! Handlers resolve the tenant first, run the pipeline to completion within
//! the request, and convert component errors to responses at this boundary.

use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{delete, get, patch, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::ingestion::{self, ChunkParams, IngestError, WebLoader};
use crate::rag::Responder;
use crate::tenants::{TenantConfig, TenantStore};
use crate::vector::VectorStore;

use super::conversations::ConversationStore;
use super::errors::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tenants: Arc<TenantStore>,
    pub store: Arc<VectorStore>,
    pub responder: Arc<Responder>,
    pub conversations: Arc<ConversationStore>,
    pub web_loader: Arc<WebLoader>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/:tenant_id/chat", get(chat))
        .route("/api/:tenant_id/knowledge/pdf", post(upload_pdf))
        .route("/api/:tenant_id/knowledge/web", post(crawl_web))
        .route(
            "/api/:tenant_id/knowledge/pdf/:filename",
            delete(delete_pdf),
        )
        .route("/api/:tenant_id/instruction", patch(update_instruction))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// --- Chat ---

#[derive(Deserialize)]
struct ChatParams {
    query: String,
    conversation_id: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    tenant: String,
    query: String,
    conversation_id: Option<String>,
    timestamp: String,
    answer: String,
    sources: Vec<String>,
}

async fn chat(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(params): Query<ChatParams>,
) -> Result<Json<ChatResponse>, ApiError> {
    let tenant = state.tenants.load(&tenant_id).await?;

    let history = match &params.conversation_id {
        Some(id) => state.conversations.history(id).await,
        None => Vec::new(),
    };

    let result = state
        .responder
        .answer(
            &params.query,
            &tenant.vector_namespace,
            &tenant.assistant_instruction,
            &history,
        )
        .await?;

    if let Some(id) = &params.conversation_id {
        state
            .conversations
            .record(id, &params.query, &result.answer)
            .await;
    }

    Ok(Json(ChatResponse {
        tenant: tenant.name,
        query: params.query,
        conversation_id: params.conversation_id,
        timestamp: Utc::now().to_rfc3339(),
        answer: result.answer,
        sources: result.sources,
    }))
}

// --- PDF ingestion ---

#[derive(Serialize)]
struct PdfUploadResponse {
    status: String,
    chunks: usize,
    file: String,
    timestamp: String,
}

async fn upload_pdf(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<PdfUploadResponse>, ApiError> {
    let tenant = state.tenants.load(&tenant_id).await?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| ApiError::InvalidRequest("Missing filename".to_string()))?;
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("Failed to read upload: {e}")))?;
            upload = Some((filename, data.to_vec()));
        }
    }
    let (filename, data) =
        upload.ok_or_else(|| ApiError::InvalidRequest("Missing file field".to_string()))?;

    // Validate before anything touches the disk.
    validate_pdf_filename(&filename)?;

    let tenant_dir = state.config.upload_dir.join(&tenant_id);
    tokio::fs::create_dir_all(&tenant_dir)
        .await
        .map_err(IngestError::from)?;
    let save_path = tenant_dir.join(&filename);
    tokio::fs::write(&save_path, &data)
        .await
        .map_err(IngestError::from)?;

    let chunks = match ingest_pdf(&state, &tenant, &save_path).await {
        Ok(count) => count,
        Err(err) => {
            // Saved file must not outlive a failed ingestion.
            if let Err(remove_err) = tokio::fs::remove_file(&save_path).await {
                warn!("Failed to clean up {}: {remove_err}", save_path.display());
            }
            return Err(err);
        }
    };

    info!("Ingested {filename} for tenant {tenant_id}: {chunks} chunk(s)");
    Ok(Json(PdfUploadResponse {
        status: "success".to_string(),
        chunks,
        file: filename,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

async fn ingest_pdf(
    state: &AppState,
    tenant: &TenantConfig,
    path: &FsPath,
) -> Result<usize, ApiError> {
    let documents = ingestion::load_pdf(path)?;

    let params = ChunkParams::default();
    let mut chunks = Vec::new();
    for document in &documents {
        chunks.extend(ingestion::split(document, &params));
    }

    let added = state.store.add(&tenant.vector_namespace, &chunks).await?;
    Ok(added)
}

fn validate_pdf_filename(filename: &str) -> Result<(), ApiError> {
    if filename.contains(['/', '\\']) || filename.contains("..") {
        return Err(IngestError::InvalidFilename(filename.to_string()).into());
    }
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(IngestError::UnsupportedFile.into());
    }
    Ok(())
}

// --- Web ingestion ---

#[derive(Deserialize)]
struct WebForm {
    url: String,
}

#[derive(Serialize)]
struct WebIngestResponse {
    status: String,
    chunks: usize,
    url: String,
}

async fn crawl_web(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Form(form): Form<WebForm>,
) -> Result<Json<WebIngestResponse>, ApiError> {
    let tenant = state.tenants.load(&tenant_id).await?;

    let document = state.web_loader.fetch(&form.url).await?;
    let chunks = ingestion::split(&document, &ChunkParams::default());
    let added = state.store.add(&tenant.vector_namespace, &chunks).await?;

    info!("Ingested {} for tenant {tenant_id}: {added} chunk(s)", form.url);
    Ok(Json(WebIngestResponse {
        status: "success".to_string(),
        chunks: added,
        url: form.url,
    }))
}

// --- PDF deletion ---

#[derive(Serialize)]
struct DeleteResponse {
    status: String,
    file: String,
    tenant: String,
    embeddings_removed: usize,
}

async fn delete_pdf(
    State(state): State<AppState>,
    Path((tenant_id, filename)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let tenant = state.tenants.load(&tenant_id).await?;
    validate_pdf_filename(&filename)?;

    let path = state.config.upload_dir.join(&tenant_id).join(&filename);
    if !path.exists() {
        return Err(ApiError::NotFound(format!(
            "File {filename} not found for tenant {tenant_id}"
        )));
    }
    tokio::fs::remove_file(&path).await.map_err(IngestError::from)?;

    let embeddings_removed = state
        .store
        .delete(&tenant.vector_namespace, &filename)
        .await?;

    info!("Deleted {filename} for tenant {tenant_id} ({embeddings_removed} embedding(s))");
    Ok(Json(DeleteResponse {
        status: "deleted".to_string(),
        file: filename,
        tenant: tenant_id,
        embeddings_removed,
    }))
}

// --- Instruction update ---

#[derive(Deserialize)]
struct InstructionForm {
    instruction: String,
}

#[derive(Serialize)]
struct InstructionResponse {
    status: String,
    instruction: String,
}

async fn update_instruction(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Form(form): Form<InstructionForm>,
) -> Result<Json<InstructionResponse>, ApiError> {
    let updated = state
        .tenants
        .update_instruction(&tenant_id, &form.instruction)
        .await?;

    Ok(Json(InstructionResponse {
        status: "updated".to_string(),
        instruction: updated.assistant_instruction,
    }))
}
