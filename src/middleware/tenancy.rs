// src/middleware/tenancy.rs

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

// Escopo opcional de loja para a busca. Diferente das rotas administrativas,
// aqui o cabeçalho ausente ou inválido não rejeita a requisição: a busca só
// não fica restrita a uma loja.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantScope(pub Option<Uuid>);

impl<S> FromRequestParts<S> for TenantScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(TENANT_ID_HEADER) else {
            return Ok(TenantScope(None));
        };

        let parsed = value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok());
        if parsed.is_none() {
            tracing::debug!("Cabeçalho X-Tenant-ID inválido, busca sem escopo de loja");
        }
        Ok(TenantScope(parsed))
    }
}
