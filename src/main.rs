mod api;
mod app;
mod config;
mod domain;
mod error;
mod logging;
mod middleware;
mod routes;
mod services;

use anyhow::Result;

use services::{AiClient, ModelSelection, Preferences, Workspace};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        api_key_configured = settings.api_key.is_some(),
        "Starting PMIS control backend"
    );

    // Create AI service client
    let ai_client = AiClient::gemini(
        &settings.ai_service_url,
        settings.api_key.clone(),
        settings.ai_service_timeout_seconds,
    )?;

    // Optionally check AI service health (non-blocking)
    tokio::spawn({
        let ai_client = ai_client.clone();
        async move {
            match ai_client.health_check().await {
                Ok(()) => tracing::info!("AI service is healthy"),
                Err(e) => tracing::warn!(error = %e, "AI service health check failed - analyses will fall back until it recovers"),
            }
        }
    });

    // Preferences are read once; later changes write back
    let preferences =
        Preferences::load(settings.preferences_path.clone(), settings.default_theme).await;
    tracing::info!(theme = preferences.theme().as_str(), "Preferences loaded");

    let workspace = Workspace::new(ai_client.clone(), ModelSelection::from(&settings));

    // Create application state
    let state = app::AppState::new(settings.clone(), workspace, preferences, ai_client);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
