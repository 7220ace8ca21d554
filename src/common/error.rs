// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Assistente de IA não configurado")]
    ChatNotConfigured,

    #[error("Assistente ainda está respondendo")]
    ChatBusy,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` carrega o contexto (ex: falha ao gravar a config da IA).
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .map(|e| match &e.message {
                            Some(m) => m.to_string(),
                            None => e.code.to_string(),
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::ChatNotConfigured => (
                StatusCode::BAD_REQUEST,
                "Configure o provedor e a chave da IA antes de enviar mensagens.",
            ),
            AppError::ChatBusy => (
                StatusCode::CONFLICT,
                "O assistente ainda está respondendo a mensagem anterior.",
            ),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

// Falhas do provedor de IA. Nunca chegam ao cliente HTTP: o ChatService
// converte qualquer uma delas na mensagem de desculpas padrão.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("o provedor não respondeu dentro do tempo limite")]
    Timeout,

    #[error("chave de API rejeitada pelo provedor")]
    InvalidKey,

    #[error("provedor indisponível: {0}")]
    Unavailable(String),
}
