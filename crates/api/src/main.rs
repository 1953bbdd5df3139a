use std::sync::Arc;

use anyhow::{Context, Result};
use skyprice_agents::ServiceConfig;
use skyprice_api::telegram::{run_poller, TelegramClient};
use skyprice_api::{build_router, build_state, ApiConfig};
use skyprice_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("skyprice_api");

    let service = ServiceConfig::from_env()?;
    let api = ApiConfig::from_env();
    let state = build_state(&service, &api)?;

    if let Some(telegram) = api.telegram.as_ref() {
        let client = TelegramClient::new(telegram.http_client()?, telegram)?;
        let agent = Arc::clone(&state.agent);
        tokio::spawn(async move {
            if let Err(error) = run_poller(client, agent).await {
                tracing::error!(error = %error, "telegram poller stopped");
            }
        });
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&api.bind)
        .await
        .with_context(|| format!("failed to bind {}", api.bind))?;
    tracing::info!(
        bind = %api.bind,
        model = %service.openai_model,
        telegram = api.telegram.is_some(),
        "skyprice api started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
