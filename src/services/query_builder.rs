// src/services/query_builder.rs

use std::{collections::BTreeSet, str::FromStr, sync::Arc, time::Duration};

use tokio::time::Instant;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::ReferenceResolver,
    models::{
        catalog::{CatalogItem, ReferenceKind},
        search::SearchParams,
    },
};

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 50;

// --- Enums de ordenação ---
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Relevance,
    PriceLow,
    PriceHigh,
    Rating,
    Newest,
    Popular,
    Name,
}

impl SortKey {
    /// Valor desconhecido cai em `Relevance`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return SortKey::Relevance;
        };
        match raw.trim().to_lowercase().replace('-', "_").as_str() {
            "price_low" => SortKey::PriceLow,
            "price_high" => SortKey::PriceHigh,
            "rating" => SortKey::Rating,
            "newest" => SortKey::Newest,
            "popular" => SortKey::Popular,
            "name" => SortKey::Name,
            _ => SortKey::Relevance,
        }
    }

    pub fn natural_order(self) -> SortOrder {
        match self {
            SortKey::PriceLow | SortKey::Name => SortOrder::Asc,
            SortKey::Relevance
            | SortKey::PriceHigh
            | SortKey::Rating
            | SortKey::Newest
            | SortKey::Popular => SortOrder::Desc,
        }
    }

    /// Relevância e preço já carregam a direção no próprio nome.
    pub fn accepts_order(self) -> bool {
        matches!(
            self,
            SortKey::Rating | SortKey::Newest | SortKey::Popular | SortKey::Name
        )
    }

    pub fn is_price(self) -> bool {
        matches!(self, SortKey::PriceLow | SortKey::PriceHigh)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

// ---
// A consulta normalizada: também é a chave canônica do cache.
// Conjuntos ordenados (BTreeSet) para que a ordem dos parâmetros não importe.
// ---
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    // None = sem filtro; Some(vazio) = nenhum nome resolveu, não casa nada
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeSet<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_categories: Option<BTreeSet<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brands: Option<BTreeSet<Uuid>>,

    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub flavors: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub origin_countries: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub regions: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub types: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub sub_types: BTreeSet<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_abv: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_abv: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_alcoholic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    pub on_sale: bool,
    pub in_stock: bool,

    pub sort_by: SortKey,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
}

impl Default for NormalizedQuery {
    fn default() -> Self {
        Self {
            text: None,
            categories: None,
            sub_categories: None,
            brands: None,
            tags: BTreeSet::new(),
            flavors: BTreeSet::new(),
            origin_countries: BTreeSet::new(),
            regions: BTreeSet::new(),
            types: BTreeSet::new(),
            sub_types: BTreeSet::new(),
            min_price: None,
            max_price: None,
            min_abv: None,
            max_abv: None,
            min_rating: None,
            is_alcoholic: None,
            is_featured: None,
            on_sale: false,
            in_stock: true,
            sort_by: SortKey::Relevance,
            order: SortOrder::Desc,
            page: 1,
            limit: DEFAULT_LIMIT,
            tenant_id: None,
        }
    }
}

impl NormalizedQuery {
    /// Alguma faceta ficou vazia depois da resolução de nomes: resultado vazio
    /// garantido, nem vale ir ao banco.
    pub fn matches_nothing(&self) -> bool {
        [&self.categories, &self.sub_categories, &self.brands]
            .iter()
            .any(|facet| facet.as_ref().is_some_and(BTreeSet::is_empty))
    }

    /// Predicado sobre o item de catálogo. É a segunda fase do filtro: o banco
    /// já aplicou a mesma coisa em SQL, aqui vale a palavra final.
    pub fn matches_item(&self, item: &CatalogItem) -> bool {
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = contains_ci(&item.name, &needle)
                || item.description.as_deref().is_some_and(|d| contains_ci(d, &needle))
                || contains_ci(&item.item_type, &needle)
                || item
                    .origin_country
                    .as_deref()
                    .is_some_and(|c| contains_ci(c, &needle))
                || item.flavor_tags.iter().any(|f| contains_ci(f, &needle));
            if !hit {
                return false;
            }
        }

        if !id_matches(&self.categories, item.category_id)
            || !id_matches(&self.sub_categories, item.sub_category_id)
            || !id_matches(&self.brands, item.brand_id)
        {
            return false;
        }

        if !any_overlap(&self.tags, &item.tags) || !any_overlap(&self.flavors, &item.flavor_tags) {
            return false;
        }

        if !value_matches(&self.origin_countries, item.origin_country.as_deref())
            || !value_matches(&self.regions, item.region.as_deref())
            || !value_matches(&self.types, Some(item.item_type.as_str()))
            || !value_matches(&self.sub_types, item.sub_type.as_deref())
        {
            return false;
        }

        if self.min_abv.is_some() || self.max_abv.is_some() {
            // Filtro de teor alcoólico exclui itens sem teor informado.
            let Some(abv) = item.abv else {
                return false;
            };
            if self.min_abv.is_some_and(|min| abv < min) || self.max_abv.is_some_and(|max| abv > max) {
                return false;
            }
        }

        if self.is_alcoholic.is_some_and(|flag| item.is_alcoholic != flag) {
            return false;
        }
        if self.is_featured.is_some_and(|flag| item.is_featured != flag) {
            return false;
        }
        if self.min_rating.is_some_and(|min| item.average_rating < min) {
            return false;
        }

        true
    }
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

fn id_matches(filter: &Option<BTreeSet<Uuid>>, id: Option<Uuid>) -> bool {
    match filter {
        None => true,
        Some(ids) => id.is_some_and(|id| ids.contains(&id)),
    }
}

fn any_overlap(filter: &BTreeSet<String>, values: &[String]) -> bool {
    filter.is_empty() || values.iter().any(|v| filter.contains(&v.to_lowercase()))
}

fn value_matches(filter: &BTreeSet<String>, value: Option<&str>) -> bool {
    filter.is_empty() || value.is_some_and(|v| filter.contains(&v.to_lowercase()))
}

// ---
// Helpers de parsing tolerante
// ---

/// Aceita `?tags=a&tags=b` e `?tags=a,b`. Vazios somem.
fn split_values(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn lowered_set(raw: &[String]) -> BTreeSet<String> {
    split_values(raw).into_iter().map(|v| v.to_lowercase()).collect()
}

/// Número não negativo ou nada.
fn parse_decimal(raw: Option<&str>) -> Option<Decimal> {
    let value = Decimal::from_str(raw?.trim()).ok()?;
    if value.is_sign_negative() {
        return None;
    }
    Some(value.normalize())
}

fn parse_bool(raw: Option<&str>) -> Option<bool> {
    match raw?.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|r| r.trim().parse::<i64>().ok())
        .map(|page| page.clamp(1, u32::MAX as i64) as u32)
        .unwrap_or(1)
}

fn parse_limit(raw: Option<&str>) -> u32 {
    raw.and_then(|r| r.trim().parse::<i64>().ok())
        .map(|limit| limit.clamp(1, MAX_LIMIT as i64) as u32)
        .unwrap_or(DEFAULT_LIMIT)
}

fn parse_order(raw: Option<&str>, sort_by: SortKey) -> SortOrder {
    if !sort_by.accepts_order() {
        return sort_by.natural_order();
    }
    match raw.map(|r| r.trim().to_lowercase()).as_deref() {
        Some("asc") => SortOrder::Asc,
        Some("desc") => SortOrder::Desc,
        _ => sort_by.natural_order(),
    }
}

/// Mínimo maior que máximo: inverte em vez de devolver vazio.
fn ordered_range(min: Option<Decimal>, max: Option<Decimal>) -> (Option<Decimal>, Option<Decimal>) {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(lo)),
        other => other,
    }
}

#[derive(Clone)]
pub struct SearchQueryBuilder {
    resolver: Arc<dyn ReferenceResolver>,
    // Prazo total da resolução de nomes de uma consulta
    timeout: Duration,
}

impl SearchQueryBuilder {
    pub fn new(resolver: Arc<dyn ReferenceResolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    /// Parâmetros crus -> consulta normalizada. Nunca falha: entrada ruim vira
    /// o valor padrão, nome de faceta desconhecido vira "nada casa nessa faceta".
    pub async fn build(&self, raw: &SearchParams) -> NormalizedQuery {
        let sort_by = SortKey::parse_lenient(raw.sort_by.as_deref());
        let (min_price, max_price) = ordered_range(
            parse_decimal(raw.min_price.as_deref()),
            parse_decimal(raw.max_price.as_deref()),
        );
        let (min_abv, max_abv) = ordered_range(
            parse_decimal(raw.min_abv.as_deref()),
            parse_decimal(raw.max_abv.as_deref()),
        );
        let deadline = Instant::now() + self.timeout;

        NormalizedQuery {
            text: raw
                .query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_lowercase),
            categories: self
                .resolve_facet(ReferenceKind::Category, &raw.category, deadline)
                .await,
            sub_categories: self
                .resolve_facet(ReferenceKind::SubCategory, &raw.sub_category, deadline)
                .await,
            brands: self
                .resolve_facet(ReferenceKind::Brand, &raw.brand, deadline)
                .await,
            tags: lowered_set(&raw.tags),
            flavors: lowered_set(&raw.flavors),
            origin_countries: lowered_set(&raw.origin_country),
            regions: lowered_set(&raw.region),
            types: lowered_set(&raw.item_type),
            sub_types: lowered_set(&raw.sub_type),
            min_price,
            max_price,
            min_abv,
            max_abv,
            min_rating: parse_decimal(raw.min_rating.as_deref()),
            is_alcoholic: parse_bool(raw.is_alcoholic.as_deref()),
            is_featured: parse_bool(raw.is_featured.as_deref()),
            on_sale: parse_bool(raw.on_sale.as_deref()).unwrap_or(false),
            in_stock: parse_bool(raw.in_stock.as_deref()).unwrap_or(true),
            sort_by,
            order: parse_order(raw.order.as_deref(), sort_by),
            page: parse_page(raw.page.as_deref()),
            limit: parse_limit(raw.limit.as_deref()),
            tenant_id: raw
                .tenant_id
                .as_deref()
                .and_then(|id| Uuid::parse_str(id.trim()).ok()),
        }
    }

    // UUID passa direto; nome vai ao resolver. Falha ou prazo estourado remove o termo.
    async fn resolve_facet(
        &self,
        kind: ReferenceKind,
        raw: &[String],
        deadline: Instant,
    ) -> Option<BTreeSet<Uuid>> {
        let values = split_values(raw);
        if values.is_empty() {
            return None;
        }

        let mut ids = BTreeSet::new();
        for value in values {
            if let Ok(id) = Uuid::parse_str(&value) {
                ids.insert(id);
                continue;
            }
            match tokio::time::timeout_at(deadline, self.resolver.resolve(kind, &value)).await {
                Ok(Ok(Some(id))) => {
                    ids.insert(id);
                }
                Ok(Ok(None)) => {
                    tracing::debug!(?kind, name = %value, "referência não encontrada, termo ignorado");
                }
                Ok(Err(e)) => {
                    tracing::warn!(?kind, name = %value, "falha ao resolver referência: {}", e);
                }
                Err(_) => {
                    tracing::warn!(?kind, name = %value, timeout_ms = self.timeout.as_millis() as u64, "⏱️ resolução de referência estourou o prazo");
                }
            }
        }

        Some(ids)
    }
}
