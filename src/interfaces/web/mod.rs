pub(crate) mod auth;
mod handlers;
mod router;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::Settings;
use crate::core::auth::Authenticator;
use crate::core::engine::ExecutionEngine;
use crate::core::store::Store;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Store,
    pub(crate) engine: ExecutionEngine,
    pub(crate) auth: Authenticator,
    pub(crate) settings: Arc<Settings>,
}

pub async fn serve(
    settings: Settings,
    store: Store,
    engine: ExecutionEngine,
    auth: Authenticator,
) -> Result<()> {
    let bind_addr = settings.bind_addr.clone();
    let state = AppState {
        store,
        engine,
        auth,
        settings: Arc::new(settings),
    };
    let app = router::build_api_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Evolve API running at http://{bind_addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
