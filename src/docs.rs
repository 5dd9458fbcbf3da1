// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Search ---
        handlers::search::search,
        handlers::search::suggestions,
        handlers::search::stats,
        handlers::search::reset_stats,
        handlers::search::clear_cache,
    ),
    components(
        schemas(
            // --- Resposta da busca ---
            models::search::SearchResponse,
            models::search::SearchItem,
            models::search::SearchMeta,
            models::search::Pagination,
            models::search::AvailableFilters,
            models::search::FacetValue,
            models::search::PriceRange,
            models::search::AvailabilitySummary,
            models::search::StockLevel,
            models::search::RatingSummary,
            models::search::RefName,
            models::search::TenantOffer,
            models::search::PricedVariant,
            models::search::ResolvedPrice,
            models::search::AppliedDiscount,
            models::search::SuggestionResponse,

            // --- Enums ---
            models::catalog::Availability,
            models::discount::DiscountType,
            models::tenancy::RevenueModelKind,

            // --- Estatísticas ---
            services::search_service::SearchStats,
            services::search_cache::CacheStats,
            services::analytics::AnalyticsSnapshot,
            services::analytics::PopularQuery,
        )
    ),
    tags(
        (name = "Search", description = "Busca no catálogo multi-loja")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_search_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/search",
            "/api/search/suggestions",
            "/api/search/stats",
            "/api/search/cache",
        ] {
            assert!(doc.paths.paths.contains_key(path), "rota ausente: {path}");
        }
    }
}
