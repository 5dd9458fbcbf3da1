// src/models/search.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{
    catalog::Availability,
    discount::DiscountType,
    tenancy::RevenueModelKind,
};

// ---
// 1. Parâmetros crus da busca (query string)
// ---
// Tudo chega como texto: a normalização (SearchQueryBuilder) decide o que é
// válido. Entrada ruim nunca vira erro 400.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Texto livre
    #[serde(alias = "q", default, deserialize_with = "first_value")]
    #[param(example = "whiskey")]
    pub query: Option<String>,

    /// Nome ou ID (repetível ou separado por vírgula)
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub sub_category: Vec<String>,
    #[serde(default)]
    pub brand: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub flavors: Vec<String>,

    #[serde(default, deserialize_with = "first_value")]
    pub min_price: Option<String>,
    #[serde(default, deserialize_with = "first_value")]
    pub max_price: Option<String>,
    #[serde(default, deserialize_with = "first_value")]
    pub min_abv: Option<String>,
    #[serde(default, deserialize_with = "first_value")]
    pub max_abv: Option<String>,

    #[serde(default, deserialize_with = "first_value")]
    pub is_alcoholic: Option<String>,
    #[serde(default, deserialize_with = "first_value")]
    pub is_featured: Option<String>,
    #[serde(default, deserialize_with = "first_value")]
    pub on_sale: Option<String>,

    #[serde(default)]
    pub origin_country: Vec<String>,
    #[serde(default)]
    pub region: Vec<String>,
    #[serde(default, rename = "type")]
    pub item_type: Vec<String>,
    #[serde(default)]
    pub sub_type: Vec<String>,

    #[serde(default, deserialize_with = "first_value")]
    pub min_rating: Option<String>,
    /// Padrão: true
    #[serde(default, deserialize_with = "first_value")]
    pub in_stock: Option<String>,

    /// relevance | price_low | price_high | rating | newest | popular | name
    #[param(example = "relevance")]
    #[serde(default, deserialize_with = "first_value")]
    pub sort_by: Option<String>,
    /// asc | desc
    #[serde(default, deserialize_with = "first_value")]
    pub order: Option<String>,
    #[param(example = "1")]
    #[serde(default, deserialize_with = "first_value")]
    pub page: Option<String>,
    #[param(example = "20")]
    #[serde(default, deserialize_with = "first_value")]
    pub limit: Option<String>,

    #[serde(default, deserialize_with = "first_value")]
    pub tenant_id: Option<String>,
}

// Chave repetida em campo escalar (`?page=1&page=2`) fica com o primeiro valor
// em vez de rejeitar a query string inteira.
fn first_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<String> = Vec::deserialize(deserializer)?;
    Ok(values.into_iter().next())
}

// ---
// 2. Preço resolvido (saída do PriceResolver)
// ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub kind: DiscountType,
    pub value: Decimal,
    pub original_price: Decimal,
    pub discounted_price: Decimal,
    pub savings: Decimal,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPrice {
    pub cost: Decimal,
    // Preço ao cliente antes do desconto (já com comissão, se houver)
    pub selling: Decimal,
    pub effective: Decimal,
    #[schema(example = "BRL")]
    pub currency: String,
    pub discount: Option<AppliedDiscount>,
}

// ---
// 3. Item da resposta
// ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricedVariant {
    // Ausente quando a listing vende sem variantes
    pub variant_id: Option<Uuid>,
    #[schema(example = "750ml")]
    pub name: String,
    pub volume_ml: Option<i32>,
    pub sku: Option<String>,
    pub stock: i32,
    pub availability: Availability,
    pub price: ResolvedPrice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantOffer {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub listing_id: Uuid,
    pub currency: String,
    pub revenue_model: RevenueModelKind,
    pub lowest_price: Decimal,
    pub variants: Vec<PricedVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    High,
    Medium,
    Low,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySummary {
    pub status: Availability,
    pub stock_level: StockLevel,
    pub total_stock: i64,
    pub tenant_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefName {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average: Decimal,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub item_type: String,
    pub sub_type: Option<String>,
    pub category: Option<RefName>,
    pub sub_category: Option<RefName>,
    pub brand: Option<RefName>,
    pub abv: Option<Decimal>,
    pub volume_ml: Option<i32>,
    pub origin_country: Option<String>,
    pub region: Option<String>,
    pub flavor_tags: Vec<String>,
    pub tags: Vec<String>,
    pub is_alcoholic: bool,
    pub is_featured: bool,

    pub price_range: PriceRange,
    pub availability: AvailabilitySummary,
    pub discount: Option<AppliedDiscount>,
    pub rating: RatingSummary,
    pub total_sold: i64,
    // Só preenchido em buscas com texto
    pub relevance_score: Option<f64>,

    pub offers: Vec<TenantOffer>,
}

// ---
// 4. Envelope da resposta
// ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_results: usize,
    pub results_per_page: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FacetValue {
    // Presente para categoria/subcategoria/marca
    pub id: Option<Uuid>,
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailableFilters {
    pub categories: Vec<FacetValue>,
    pub sub_categories: Vec<FacetValue>,
    pub brands: Vec<FacetValue>,
    pub tags: Vec<FacetValue>,
    pub flavors: Vec<FacetValue>,
    pub countries: Vec<FacetValue>,
    pub types: Vec<FacetValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub query: Option<String>,
    #[schema(value_type = Object)]
    pub applied_filters: serde_json::Value,
    pub results_found: usize,
    pub search_time_ms: u64,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
    pub pagination: Pagination,
    pub available_filters: AvailableFilters,
    pub search_meta: SearchMeta,
}

// ---
// 5. Sugestões (autocomplete)
// ---
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SuggestionParams {
    #[param(example = "whi")]
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    pub suggestions: Vec<String>,
}
