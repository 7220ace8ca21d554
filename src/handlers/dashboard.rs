// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    config::AppState,
    models::dashboard::{
        DateRange, PaymentMethod, PaymentMethodRevenue, PeriodSummary, SalesChartEntry, TicketFilter,
        TicketRecord,
    },
};

// ---
// Query: os filtros do dashboard (todos opcionais)
// ---
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// Início do período (RFC 3339, inclusivo)
    pub start: Option<DateTime<Utc>>,
    /// Fim do período (RFC 3339, inclusivo)
    pub end: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    /// `true` = só comandas com gorjeta
    pub has_tip: Option<bool>,
    /// `true` = só comandas com desconto
    pub has_discount: Option<bool>,
    /// Busca nas observações (sem diferenciar maiúsculas)
    #[validate(length(max = 100, message = "A busca deve ter no máximo 100 caracteres."))]
    pub q: Option<String>,
}

impl DashboardQuery {
    fn validate_consistency(&self) -> Result<(), ValidationError> {
        // Regra: o período não pode terminar antes de começar.
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                let mut err = ValidationError::new("range");
                err.message = Some("A data inicial deve ser anterior ou igual à data final.".into());
                return Err(err);
            }
        }
        Ok(())
    }

    // Só um dos lados informado = intervalo aberto do outro lado.
    fn into_filter(self) -> TicketFilter {
        let date_range = match (self.start, self.end) {
            (None, None) => None,
            (start, end) => Some(DateRange {
                start: start.unwrap_or(DateTime::<Utc>::MIN_UTC),
                end: end.unwrap_or(DateTime::<Utc>::MAX_UTC),
            }),
        };

        TicketFilter {
            date_range,
            payment_method: self.payment_method,
            has_tip: self.has_tip,
            has_discount: self.has_discount,
            text_search: self
                .q
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
        }
    }
}

// Valida na borda; daqui para dentro o filtro é assumido bem-formado.
fn parse_filter(query: DashboardQuery) -> Result<TicketFilter, AppError> {
    query.validate()?;

    query.validate_consistency().map_err(|e| {
        let mut errors = ValidationErrors::new();
        errors.add("start", e);
        AppError::ValidationError(errors)
    })?;

    Ok(query.into_filter())
}

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Resumo do período filtrado", body = PeriodSummary),
        (status = 400, description = "Filtro inválido")
    )
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = parse_filter(query)?;

    let summary = app_state.dashboard_service
        .get_summary(&filter)
        .await?;

    Ok((StatusCode::OK, Json(summary)))
}

// GET /api/dashboard/sales-chart
#[utoipa::path(
    get,
    path = "/api/dashboard/sales-chart",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Vendas por dia, em ordem crescente de data", body = Vec<SalesChartEntry>),
        (status = 400, description = "Filtro inválido")
    )
)]
pub async fn get_sales_chart(
    State(app_state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = parse_filter(query)?;

    let chart = app_state.dashboard_service
        .get_sales_chart(&filter)
        .await?;

    Ok((StatusCode::OK, Json(chart)))
}

// GET /api/dashboard/payment-methods
#[utoipa::path(
    get,
    path = "/api/dashboard/payment-methods",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Faturamento por forma de pagamento", body = Vec<PaymentMethodRevenue>),
        (status = 400, description = "Filtro inválido")
    )
)]
pub async fn get_payment_breakdown(
    State(app_state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = parse_filter(query)?;

    let breakdown = app_state.dashboard_service
        .get_payment_breakdown(&filter)
        .await?;

    Ok((StatusCode::OK, Json(breakdown)))
}

// GET /api/dashboard/tickets
#[utoipa::path(
    get,
    path = "/api/dashboard/tickets",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Comandas que passam no filtro, na ordem da fonte", body = Vec<TicketRecord>),
        (status = 400, description = "Filtro inválido")
    )
)]
pub async fn list_tickets(
    State(app_state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = parse_filter(query)?;

    let tickets = app_state.dashboard_service
        .list_tickets(&filter)
        .await?;

    Ok((StatusCode::OK, Json(tickets)))
}

// POST /api/dashboard/refresh
#[utoipa::path(
    post,
    path = "/api/dashboard/refresh",
    tag = "Dashboard",
    responses(
        (status = 204, description = "Cache descartado; a próxima leitura vai até a fonte")
    )
)]
pub async fn refresh(State(app_state): State<AppState>) -> StatusCode {
    app_state.dashboard_service.invalidate();
    tracing::info!("🔄 Cache do dashboard descartado");
    StatusCode::NO_CONTENT
}
