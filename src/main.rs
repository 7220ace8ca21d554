//src/main.rs

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod models;
mod services;

use crate::common::cache::spawn_cleanup_task;
use crate::config::{AppConfig, AppState};
use crate::docs::ApiDoc;

fn build_router(app_state: AppState) -> Router {
    let dashboard_routes = Router::new()
        .route("/summary", get(handlers::dashboard::get_summary))
        .route("/sales-chart", get(handlers::dashboard::get_sales_chart))
        .route("/payment-methods", get(handlers::dashboard::get_payment_breakdown))
        .route("/tickets", get(handlers::dashboard::list_tickets))
        .route("/refresh", post(handlers::dashboard::refresh));

    let chat_routes = Router::new()
        .route("/", get(handlers::chat::get_chat))
        .route("/config", axum::routing::put(handlers::chat::update_config))
        .route("/toggle", post(handlers::chat::toggle_visibility))
        .route("/messages"
               ,post(handlers::chat::send_message)
               .delete(handlers::chat::clear_messages)
        );

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/chat", chat_routes)
        .with_state(app_state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("🔥 Falha ao escutar o sinal de desligamento: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("👋 Desligando o servidor...");
}

#[tokio::main]
async fn main() {
    // RUST_LOG controla o nível; sem ele, "info".
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let config = AppConfig::from_env()
        .expect("Configuração inválida.");

    let app_state = AppState::new(&config)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Varredura periódica do cache do dashboard
    spawn_cleanup_task(
        app_state.dashboard_service.cache().clone(),
        config.cache_cleanup_interval,
    );

    let app = build_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Erro no servidor Axum");
}
