// src/handlers/chat.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    models::chat::{AiProvider, ChatMessage, ChatSnapshot},
    services::chat_service::SendOutcome,
};

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("A mensagem não pode ficar em branco.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAiConfigPayload {
    #[schema(example = "openai")]
    pub provider: Option<AiProvider>,

    // Nunca é devolvida nas respostas.
    #[validate(length(max = 256, message = "A chave deve ter no máximo 256 caracteres."))]
    #[schema(example = "sk-...")]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[validate(
        length(min = 1, max = 2000, message = "A mensagem deve ter entre 1 e 2000 caracteres."),
        custom(function = "validate_not_blank")
    )]
    #[schema(example = "Como foram as vendas da semana?")]
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub reply: ChatMessage,
}

// GET /api/chat
#[utoipa::path(
    get,
    path = "/api/chat",
    tag = "Chat",
    responses(
        (status = 200, description = "Estado atual do assistente", body = ChatSnapshot)
    )
)]
pub async fn get_chat(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.chat_service.snapshot())
}

// PUT /api/chat/config
#[utoipa::path(
    put,
    path = "/api/chat/config",
    tag = "Chat",
    request_body = UpdateAiConfigPayload,
    responses(
        (status = 200, description = "Configuração salva", body = ChatSnapshot),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn update_config(
    State(app_state): State<AppState>,
    Json(payload): Json<UpdateAiConfigPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let snapshot = app_state.chat_service
        .configure(payload.provider, payload.api_key)
        .await?;

    Ok((StatusCode::OK, Json(snapshot)))
}

// POST /api/chat/toggle
#[utoipa::path(
    post,
    path = "/api/chat/toggle",
    tag = "Chat",
    responses(
        (status = 200, description = "Painel aberto/fechado", body = ChatSnapshot)
    )
)]
pub async fn toggle_visibility(State(app_state): State<AppState>) -> impl IntoResponse {
    app_state.chat_service.toggle_visibility();
    Json(app_state.chat_service.snapshot())
}

// POST /api/chat/messages
#[utoipa::path(
    post,
    path = "/api/chat/messages",
    tag = "Chat",
    request_body = SendMessagePayload,
    responses(
        (status = 200, description = "Resposta do assistente (ou a mensagem de desculpas, se o provedor falhar)", body = SendMessageResponse),
        (status = 400, description = "Mensagem inválida ou assistente não configurado"),
        (status = 409, description = "Ainda aguardando a resposta anterior")
    )
)]
pub async fn send_message(
    State(app_state): State<AppState>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    match app_state.chat_service.send_message(payload.content.trim()).await {
        SendOutcome::Replied(reply) => Ok((StatusCode::OK, Json(SendMessageResponse { reply }))),
        SendOutcome::NotConfigured => Err(AppError::ChatNotConfigured),
        SendOutcome::Busy => Err(AppError::ChatBusy),
    }
}

// DELETE /api/chat/messages
#[utoipa::path(
    delete,
    path = "/api/chat/messages",
    tag = "Chat",
    responses(
        (status = 204, description = "Histórico apagado (a configuração é mantida)")
    )
)]
pub async fn clear_messages(State(app_state): State<AppState>) -> StatusCode {
    app_state.chat_service.clear_messages();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        build_router,
        db::{AiConfigRepository, MockTicketSource},
        services::{
            chat_service::{ChatService, FALLBACK_REPLY},
            dashboard_service::DashboardService,
            responder::CannedResponder,
        },
    };
    use axum::{
        body::Body,
        http::{header, Method, Request},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::{sync::Arc, time::Duration};
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    fn app() -> (Router, TempDir) {
        let dir = tempdir().unwrap();
        let state = AppState {
            dashboard_service: DashboardService::with_default_cache(
                Arc::new(MockTicketSource::from_records(Vec::new())),
                None,
            ),
            chat_service: ChatService::new(
                Arc::new(CannedResponder::new(Duration::ZERO)),
                AiConfigRepository::new(dir.path().join("ai_config.json")),
                Duration::from_secs(30),
            ),
        };
        (build_router(state), dir)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn message_before_configuring_is_rejected() {
        let (app, _dir) = app();

        let (status, _) = call(&app, Method::POST, "/api/chat/messages", Some(json!({ "content": "oi" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, chat) = call(&app, Method::GET, "/api/chat", None).await;
        assert_eq!(chat["isConfigured"], false);
        assert_eq!(chat["messages"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn configured_chat_answers_and_hides_the_key() {
        let (app, _dir) = app();

        let config = json!({ "provider": "gemini", "apiKey": "AIza-teste" });
        let (status, chat) = call(&app, Method::PUT, "/api/chat/config", Some(config)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(chat["isConfigured"], true);
        assert_eq!(chat["provider"], "gemini");
        assert!(!chat.to_string().contains("AIza-teste"));

        let (status, body) = call(&app, Method::POST, "/api/chat/messages", Some(json!({ "content": "e as gorjetas?" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["role"], "assistant");
        assert!(body["reply"]["content"].as_str().unwrap().starts_with("[Gemini]"));

        let (_, chat) = call(&app, Method::GET, "/api/chat", None).await;
        assert_eq!(chat["messages"].as_array().unwrap().len(), 2);
        assert_eq!(chat["isLoading"], false);
    }

    #[tokio::test]
    async fn rejected_key_still_returns_fallback_reply() {
        let (app, _dir) = app();

        let config = json!({ "provider": "openai", "apiKey": "chave-errada" });
        call(&app, Method::PUT, "/api/chat/config", Some(config)).await;

        let (status, body) = call(&app, Method::POST, "/api/chat/messages", Some(json!({ "content": "vendas" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["content"], FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn blank_message_fails_validation() {
        let (app, _dir) = app();

        let (status, body) = call(&app, Method::POST, "/api/chat/messages", Some(json!({ "content": "   " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["content"].is_array());
    }

    #[tokio::test]
    async fn toggle_and_clear_do_not_touch_configuration() {
        let (app, _dir) = app();
        let config = json!({ "provider": "openai", "apiKey": "sk-teste" });
        call(&app, Method::PUT, "/api/chat/config", Some(config)).await;
        call(&app, Method::POST, "/api/chat/messages", Some(json!({ "content": "oi" }))).await;

        let (_, chat) = call(&app, Method::POST, "/api/chat/toggle", None).await;
        assert_eq!(chat["isOpen"], true);

        let (status, _) = call(&app, Method::DELETE, "/api/chat/messages", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, chat) = call(&app, Method::GET, "/api/chat", None).await;
        assert_eq!(chat["messages"].as_array().unwrap().len(), 0);
        assert_eq!(chat["isConfigured"], true);
        assert_eq!(chat["isOpen"], true);
    }
}
