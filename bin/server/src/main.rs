use convo_server::{AppState, config::ServerConfig, factory::ServiceFactory, router};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(data_service = %config.data_service, "Loaded configuration");

    let factory = ServiceFactory::new(&config);
    let conversations = match factory.conversation_service() {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e.current_context(), "failed to build conversation service");
            std::process::exit(1);
        }
    };

    let app_state = Arc::new(AppState::new(conversations, config.pagination.clone()));
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
