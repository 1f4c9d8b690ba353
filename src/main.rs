//! Portfolio assistant server
//!
//! Serves the chat page and the session API.

use portfolio_assistant::api;
use portfolio_assistant::core::config::AssistantConfig;
use portfolio_assistant::core::knowledge::KnowledgeBase;
use portfolio_assistant::core::services::PortfolioAssistantService;
use portfolio_assistant::infrastructure::repositories::InMemorySessionRepository;

use anyhow::{Context, anyhow};
use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use di::{Injectable, ServiceCollection, ServiceProvider};
use di_axum::RouterServiceProviderExtensions;
use log::{info, warn};
use tokio::runtime::{Builder, Runtime};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    let provider = ServiceCollection::new()
        .add(AssistantConfig::singleton())
        .add(KnowledgeBase::singleton())
        .add(InMemorySessionRepository::singleton())
        .add(PortfolioAssistantService::scoped())
        .build_provider()
        .map_err(|e| anyhow!("failed to build service provider: {e:?}"))?;

    runtime.block_on(web_server_task(provider))
}

async fn web_server_task(provider: ServiceProvider) -> anyhow::Result<()> {
    let config = provider.get_required::<AssistantConfig>();
    info!(
        "assistant replies after {} ms",
        config.reply_delay.as_millis()
    );

    let app = Router::new()
        .route("/", get(api::pages::index))
        .nest_service(
            "/static",
            ServiceBuilder::new().service(ServeDir::new("static")),
        )
        .nest("/sessions", api::sessions::router())
        .nest("/assistant", api::assistant::router())
        .layer(cors_layer(&config))
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}

fn cors_layer(config: &AssistantConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(origins)
}
