use anyhow::Result;
use rag_tenant_node::{
    api::{self, AppState, ConversationStore},
    config::AppConfig,
    ingestion::WebLoader,
    rag::{OpenAiChat, Responder},
    tenants::TenantStore,
    vector::{Embedder, HashEmbedder, HttpEmbedder, VectorStore, DEFAULT_DIMENSION},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    tokio::fs::create_dir_all(&config.tenants_dir).await?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tokio::fs::create_dir_all(&config.vector_dir).await?;

    let embedder: Arc<dyn Embedder> = match &config.embeddings_url {
        Some(endpoint) => {
            tracing::info!("Using remote embeddings at {endpoint}");
            Arc::new(HttpEmbedder::new(
                endpoint,
                &config.completion.api_key,
                "text-embedding-3-small",
                DEFAULT_DIMENSION,
            )?)
        }
        None => {
            tracing::info!("Using local deterministic embedder");
            Arc::new(HashEmbedder::default())
        }
    };

    let store = Arc::new(VectorStore::new(&config.vector_dir, embedder));
    let responder = Arc::new(Responder::new(
        store.clone(),
        Arc::new(OpenAiChat::new(config.completion.clone())?),
    ));

    let state = AppState {
        tenants: Arc::new(TenantStore::new(&config.tenants_dir)),
        store,
        responder,
        conversations: Arc::new(ConversationStore::new()),
        web_loader: Arc::new(WebLoader::new()?),
        config: Arc::new(config.clone()),
    };

    api::serve(state, config.api_port).await
}
