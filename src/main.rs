use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use lounge_concierge::config::AppConfig;
use lounge_concierge::handlers;
use lounge_concierge::services::ai::ollama::OllamaProvider;
use lounge_concierge::services::ai::openai::OpenAiProvider;
use lounge_concierge::services::ai::LlmProvider;
use lounge_concierge::services::partner::http::HttpPartnerClient;
use lounge_concierge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    let timeout = Duration::from_secs(config.http_timeout_secs);

    let llm: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "groq" => {
            anyhow::ensure!(!config.groq_api_key.is_empty(), "GROQ_API_KEY must be set when LLM_PROVIDER=groq");
            tracing::info!("using Groq LLM provider (model: {})", config.groq_model);
            Box::new(OpenAiProvider::groq(
                config.groq_api_key.clone(),
                config.groq_model.clone(),
                timeout,
            )?)
        }
        "ollama" => {
            tracing::info!("using Ollama LLM provider (url: {})", config.ollama_url);
            Box::new(OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
                timeout,
            )?)
        }
        _ => {
            anyhow::ensure!(!config.openai_api_key.is_empty(), "OPENAI_API_KEY must be set when LLM_PROVIDER=openai");
            tracing::info!("using OpenAI LLM provider (model: {})", config.openai_model);
            Box::new(OpenAiProvider::new(
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
                config.openai_model.clone(),
                timeout,
            )?)
        }
    };

    if config.card_encryption_key.is_empty() {
        tracing::warn!("STATIC_ENCRYPTION_KEY is not set; card payments will fail");
    }
    tracing::info!("partner API at {}", config.partner_api_url);

    let partner = HttpPartnerClient::new(&config)?;

    let state = Arc::new(AppState {
        config: config.clone(),
        llm,
        partner: Box::new(partner),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/chat", post(handlers::chat::chat))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
