// src/services/search_service.rs

use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::SearchSettings,
    db::{CatalogStore, ReferenceResolver},
    models::{
        catalog::Availability,
        search::{
            AvailabilitySummary, AvailableFilters, Pagination, PriceRange, RatingSummary, RefName,
            SearchItem, SearchMeta, SearchParams, SearchResponse, StockLevel,
        },
    },
    services::{
        analytics::{AnalyticsSnapshot, SearchAnalytics, SearchEvent},
        catalog_join::CatalogJoinEngine,
        post_filter::PostAggregationFilter,
        pricing::{PriceResolver, PricedItem},
        query_builder::{NormalizedQuery, SearchQueryBuilder},
        ranking::RelevanceRanker,
        search_cache::{CacheStats, SearchCache},
    },
};

pub const MIN_SUGGESTION_PREFIX: usize = 2;
pub const DEFAULT_SUGGESTIONS: usize = 5;
pub const MAX_SUGGESTIONS: usize = 10;
const POPULAR_QUERIES_IN_STATS: usize = 10;

// Faixas de estoque do resumo de disponibilidade
const LOW_STOCK_MAX: i64 = 10;
const MEDIUM_STOCK_MAX: i64 = 50;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub cache: CacheStats,
    pub analytics: AnalyticsSnapshot,
}

#[derive(Clone)]
pub struct SearchService {
    query_builder: SearchQueryBuilder,
    join_engine: CatalogJoinEngine,
    store: Arc<dyn CatalogStore>,
    cache: Arc<SearchCache>,
    analytics: Arc<SearchAnalytics>,
    settings: SearchSettings,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        resolver: Arc<dyn ReferenceResolver>,
        cache: Arc<SearchCache>,
        analytics: Arc<SearchAnalytics>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            query_builder: SearchQueryBuilder::new(resolver, settings.db_timeout()),
            join_engine: CatalogJoinEngine::new(
                store.clone(),
                settings.db_timeout(),
                settings.max_results,
            ),
            store,
            cache,
            analytics,
            settings,
        }
    }

    /// Ponto de entrada único. Nunca falha: erro de qualquer etapa vira uma
    /// resposta vazia com `searchMeta.error`.
    pub async fn search(&self, raw: &SearchParams) -> SearchResponse {
        self.search_at(raw, Utc::now()).await
    }

    pub(crate) async fn search_at(&self, raw: &SearchParams, now: DateTime<Utc>) -> SearchResponse {
        let started = Instant::now();
        let query = self.query_builder.build(raw).await;
        let key = self.cache.key_for(&query, now);
        // A chave usa o texto em minúsculas; a resposta ecoa o que o cliente digitou
        let typed_text = raw
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        if let Some(mut cached) = self.cache.get(&key) {
            cached.search_meta.query = typed_text;
            cached.search_meta.from_cache = true;
            cached.search_meta.search_time_ms = elapsed_ms(started);
            self.record(&query, &cached, false);
            return cached;
        }

        match self.execute(&query, now).await {
            Ok(mut response) => {
                response.search_meta.query = typed_text;
                response.search_meta.search_time_ms = elapsed_ms(started);
                self.cache.insert(key, response.clone(), now);
                self.record(&query, &response, false);
                tracing::debug!(
                    results = response.search_meta.results_found,
                    elapsed_ms = response.search_meta.search_time_ms,
                    "busca concluída"
                );
                response
            }
            Err(e) => {
                tracing::warn!("❌ Busca falhou, devolvendo resposta vazia: {}", e);
                let mut response = empty_response(&query, Some(e.public_message().to_string()));
                response.search_meta.query = typed_text;
                response.search_meta.search_time_ms = elapsed_ms(started);
                // Falha nunca vai para o cache
                self.record(&query, &response, true);
                response
            }
        }
    }

    async fn execute(
        &self,
        query: &NormalizedQuery,
        now: DateTime<Utc>,
    ) -> Result<SearchResponse, AppError> {
        // 1. JOIN item -> listing -> variante
        let joined = self.join_engine.join(query).await?;

        // 2. Preços por tenant
        let priced: Vec<PricedItem> = joined
            .into_iter()
            .filter_map(|item| PriceResolver::price_item(item, now))
            .collect();

        // 3. Ranking, 4. filtros de preço + ordenação por preço
        let ranked = RelevanceRanker::rank(priced, query);
        let filtered = PostAggregationFilter::apply(ranked, query, self.settings.price_range_mode);

        // 5. Facetas sobre o conjunto inteiro, 6. página
        let available_filters = PostAggregationFilter::facets(&filtered);
        let (page, pagination) = PostAggregationFilter::paginate(filtered, query.page, query.limit);

        let results_found = pagination.total_results;
        Ok(SearchResponse {
            items: page.into_iter().map(to_search_item).collect(),
            pagination,
            available_filters,
            search_meta: meta(query, results_found, None),
        })
    }

    /// Autocomplete: nomes de itens, marcas e categorias que começam com o prefixo.
    pub async fn suggest(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>, AppError> {
        let prefix = prefix.trim();
        if prefix.chars().count() < MIN_SUGGESTION_PREFIX {
            return Ok(Vec::new());
        }
        let limit = limit.unwrap_or(DEFAULT_SUGGESTIONS).clamp(1, MAX_SUGGESTIONS);
        let timeout = self.settings.db_timeout();

        match tokio::time::timeout(timeout, self.store.suggest_names(prefix, limit as i64)).await {
            Ok(names) => names,
            Err(_) => Err(AppError::UpstreamTimeout(timeout)),
        }
    }

    pub fn stats(&self) -> SearchStats {
        SearchStats {
            cache: self.cache.stats(),
            analytics: self.analytics.snapshot(POPULAR_QUERIES_IN_STATS),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Zera os contadores de busca; o cache fica intacto.
    pub fn reset_stats(&self) {
        self.analytics.clear();
    }

    fn record(&self, query: &NormalizedQuery, response: &SearchResponse, failed: bool) {
        self.analytics.record(SearchEvent {
            text: query.text.as_deref(),
            results: response.search_meta.results_found,
            elapsed_ms: response.search_meta.search_time_ms,
            from_cache: response.search_meta.from_cache,
            failed,
        });
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn meta(query: &NormalizedQuery, results_found: usize, error: Option<String>) -> SearchMeta {
    SearchMeta {
        query: query.text.clone(),
        applied_filters: serde_json::to_value(query).unwrap_or_default(),
        results_found,
        search_time_ms: 0,
        from_cache: false,
        error,
    }
}

fn empty_response(query: &NormalizedQuery, error: Option<String>) -> SearchResponse {
    SearchResponse {
        items: Vec::new(),
        pagination: Pagination {
            current_page: query.page,
            total_pages: 0,
            total_results: 0,
            results_per_page: query.limit,
            has_next_page: false,
            has_previous_page: query.page > 1,
        },
        available_filters: AvailableFilters::default(),
        search_meta: meta(query, 0, error),
    }
}

fn availability_summary(total_stock: i64, tenant_count: usize) -> AvailabilitySummary {
    let (status, stock_level) = match total_stock {
        s if s <= 0 => (Availability::OutOfStock, StockLevel::None),
        s if s <= LOW_STOCK_MAX => (Availability::LowStock, StockLevel::Low),
        s if s <= MEDIUM_STOCK_MAX => (Availability::InStock, StockLevel::Medium),
        _ => (Availability::InStock, StockLevel::High),
    };
    AvailabilitySummary {
        status,
        stock_level,
        total_stock: total_stock.max(0),
        tenant_count,
    }
}

fn ref_name(id: Option<uuid::Uuid>, name: Option<String>) -> Option<RefName> {
    id.map(|id| RefName {
        id,
        name: name.unwrap_or_default(),
    })
}

fn to_search_item(priced: PricedItem) -> SearchItem {
    let PricedItem {
        item,
        offers,
        min_price,
        max_price,
        currency,
        best_discount,
        total_stock,
        relevance_score,
    } = priced;

    SearchItem {
        id: item.id,
        slug: item.slug,
        name: item.name,
        description: item.description,
        item_type: item.item_type,
        sub_type: item.sub_type,
        category: ref_name(item.category_id, item.category_name),
        sub_category: ref_name(item.sub_category_id, item.sub_category_name),
        brand: ref_name(item.brand_id, item.brand_name),
        abv: item.abv,
        volume_ml: item.volume_ml,
        origin_country: item.origin_country,
        region: item.region,
        flavor_tags: item.flavor_tags,
        tags: item.tags,
        is_alcoholic: item.is_alcoholic,
        is_featured: item.is_featured,
        price_range: PriceRange {
            min: min_price,
            max: max_price,
            currency,
        },
        availability: availability_summary(total_stock, offers.len()),
        discount: best_discount,
        rating: RatingSummary {
            average: item.average_rating,
            count: item.review_count,
        },
        total_sold: item.total_sold,
        relevance_score,
        offers,
    }
}
