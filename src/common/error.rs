// src/common/error.rs

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    // Só aparece na validação da configuração (SearchSettings) no boot.
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Variante para erros de banco de dados (conexão, pool, query)
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("O banco de dados não respondeu em {0:?}")]
    UpstreamTimeout(Duration),

    // Dado corrompido em UMA variante: o item é descartado, a busca segue.
    #[error("Preço inválido no item {item_id} (tenant {tenant_id}): {reason}")]
    InvalidPrice {
        item_id: Uuid,
        tenant_id: Uuid,
        reason: String,
    },

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Erros de infraestrutura (banco fora do ar, timeout). A busca degrada para
    /// uma resposta vazia em vez de propagar.
    pub fn is_upstream(&self) -> bool {
        matches!(self, AppError::DatabaseError(_) | AppError::UpstreamTimeout(_))
    }

    /// Mensagem curta e estável que vai no `searchMeta.error`.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) | AppError::UpstreamTimeout(_) => {
                "Catálogo temporariamente indisponível."
            }
            AppError::InvalidPrice { .. } => "Dados de preço inconsistentes.",
            AppError::ValidationError(_) => "Configuração inválida.",
            AppError::InternalServerError(_) => "Ocorreu um erro inesperado.",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.is_upstream() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        // O `tracing` loga a mensagem detalhada; o cliente recebe só a pública.
        tracing::error!("Erro ao atender requisição: {}", self);

        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
