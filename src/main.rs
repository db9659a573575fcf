mod config;
mod core;
mod interfaces;

use std::sync::Arc;

use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::config::Settings;
use crate::core::auth::Authenticator;
use crate::core::engine::ExecutionEngine;
use crate::core::llm::{LlmClient, OpenAiClient};
use crate::core::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let settings = Settings::from_env()?;
    let store = Store::open(&settings.database_path)?;
    if settings.seed_db {
        store.seed_defaults().await?;
    }

    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(settings.openai_api_key.clone()));
    let engine = ExecutionEngine::new(store.clone(), llm);
    let auth = Authenticator::new(&settings)?;

    info!("Starting Evolve API v{}", env!("CARGO_PKG_VERSION"));
    interfaces::web::serve(settings, store, engine, auth).await
}
