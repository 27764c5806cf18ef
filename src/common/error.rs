// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::import::ImportStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Mapeamento aprovado deixou campos obrigatórios de fora
    #[error("Campos obrigatórios sem mapeamento: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    #[error("O campo '{0}' foi mapeado por mais de uma coluna")]
    DuplicateFieldMapping(String),

    #[error("Schema de destino desconhecido: {0}")]
    UnknownTargetSchema(String),

    #[error("{0}")]
    InvalidTenantHeader(&'static str),

    #[error("Importação não encontrada")]
    ImportRunNotFound,

    #[error("Transição de status inválida: {from:?} -> {to:?}")]
    InvalidStatusTransition { from: ImportStatus, to: ImportStatus },

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de serialização: {0}")]
    SerializationError(#[from] serde_json::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
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
            AppError::MissingRequiredFields(fields) => {
                let body = Json(json!({
                    "error": self.to_string(),
                    "fields": fields,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::DuplicateFieldMapping(_)
            | AppError::UnknownTargetSchema(_)
            | AppError::InvalidTenantHeader(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::ImportRunNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::InvalidStatusTransition { .. } => (StatusCode::CONFLICT, self.to_string()),

            // Todo o resto vira 500. O tracing loga o detalhe, o cliente recebe a mensagem genérica.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
