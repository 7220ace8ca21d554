// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Dashboard ---
        handlers::dashboard::get_summary,
        handlers::dashboard::get_sales_chart,
        handlers::dashboard::get_payment_breakdown,
        handlers::dashboard::list_tickets,
        handlers::dashboard::refresh,

        // --- Chat ---
        handlers::chat::get_chat,
        handlers::chat::update_config,
        handlers::chat::toggle_visibility,
        handlers::chat::send_message,
        handlers::chat::clear_messages,
    ),
    components(
        schemas(
            // --- DASHBOARD ---
            models::dashboard::PaymentMethod,
            models::dashboard::TicketRecord,
            models::dashboard::PeriodSummary,
            models::dashboard::SalesChartEntry,
            models::dashboard::PaymentMethodRevenue,

            // --- CHAT ---
            models::chat::AiProvider,
            models::chat::ChatRole,
            models::chat::ChatMessage,
            models::chat::ChatSnapshot,

            // --- Payloads ---
            handlers::chat::UpdateAiConfigPayload,
            handlers::chat::SendMessagePayload,
            handlers::chat::SendMessageResponse,
        )
    ),
    tags(
        (name = "Dashboard", description = "Indicadores e Gráficos de Vendas"),
        (name = "Chat", description = "Assistente de IA do Dashboard")
    )
)]
pub struct ApiDoc;
