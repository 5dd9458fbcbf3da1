// src/handlers/search.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::{Query, QueryRejection};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantScope,
    models::search::{SearchParams, SearchResponse, SuggestionParams, SuggestionResponse},
    services::search_service::SearchStats,
};

// GET /api/search
#[utoipa::path(
    get,
    path = "/api/search",
    tag = "Search",
    params(
        SearchParams,
        ("x-tenant-id" = Option<Uuid>, Header, description = "Restringe as ofertas a uma loja")
    ),
    responses(
        (status = 200, description = "Resultado da busca (erros vêm em searchMeta.error)", body = SearchResponse)
    )
)]
pub async fn search(
    State(app_state): State<AppState>,
    scope: TenantScope,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Json<SearchResponse> {
    // Query string malformada não vira 400: busca com os padrões.
    let mut params = match params {
        Ok(Query(params)) => params,
        Err(e) => {
            tracing::debug!("query string ignorada: {}", e);
            SearchParams::default()
        }
    };

    // O parâmetro explícito vence o cabeçalho
    if params.tenant_id.is_none() {
        params.tenant_id = scope.0.map(|id| id.to_string());
    }

    Json(app_state.search_service.search(&params).await)
}

// GET /api/search/suggestions
#[utoipa::path(
    get,
    path = "/api/search/suggestions",
    tag = "Search",
    params(SuggestionParams),
    responses(
        (status = 200, description = "Nomes que começam com o prefixo", body = SuggestionResponse),
        (status = 503, description = "Catálogo indisponível")
    )
)]
pub async fn suggestions(
    State(app_state): State<AppState>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<SuggestionResponse>, AppError> {
    let suggestions = app_state
        .search_service
        .suggest(params.q.as_deref().unwrap_or_default(), params.limit)
        .await?;

    Ok(Json(SuggestionResponse { suggestions }))
}

// GET /api/search/stats
#[utoipa::path(
    get,
    path = "/api/search/stats",
    tag = "Search",
    responses(
        (status = 200, description = "Estatísticas do cache e das buscas", body = SearchStats)
    )
)]
pub async fn stats(State(app_state): State<AppState>) -> Json<SearchStats> {
    Json(app_state.search_service.stats())
}

// DELETE /api/search/stats
#[utoipa::path(
    delete,
    path = "/api/search/stats",
    tag = "Search",
    responses(
        (status = 204, description = "Contadores de busca zerados")
    )
)]
pub async fn reset_stats(State(app_state): State<AppState>) -> impl IntoResponse {
    app_state.search_service.reset_stats();
    StatusCode::NO_CONTENT
}

// DELETE /api/search/cache
#[utoipa::path(
    delete,
    path = "/api/search/cache",
    tag = "Search",
    responses(
        (status = 204, description = "Cache de resultados limpo")
    )
)]
pub async fn clear_cache(State(app_state): State<AppState>) -> impl IntoResponse {
    app_state.search_service.clear_cache();
    StatusCode::NO_CONTENT
}
