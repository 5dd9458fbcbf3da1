// src/services/ranking.rs

use std::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive;

use crate::services::{
    pricing::PricedItem,
    query_builder::{NormalizedQuery, SortKey, SortOrder},
};

// --- Pesos da relevância ---
pub const EXACT_NAME_WEIGHT: f64 = 100.0;
pub const PARTIAL_NAME_WEIGHT: f64 = 50.0;
pub const BRAND_WEIGHT: f64 = 30.0;
pub const CATEGORY_WEIGHT: f64 = 20.0;
pub const TYPE_WEIGHT: f64 = 15.0;
pub const RATING_WEIGHT: f64 = 2.0;
pub const POPULARITY_WEIGHT: f64 = 0.01;
pub const FEATURED_BONUS: f64 = 10.0;

/// Ordenação determinística: mesma entrada, mesma ordem. Nada estatístico.
pub struct RelevanceRanker;

impl RelevanceRanker {
    /// Pontua (se houver texto) e ordena. Ordenações por campo gravado
    /// (rating, newest, popular, name) são estáveis por cima da relevância;
    /// ordenação por preço fica para o pós-filtro.
    pub fn rank(mut items: Vec<PricedItem>, query: &NormalizedQuery) -> Vec<PricedItem> {
        match query.text.as_deref() {
            Some(text) => {
                let needle = text.to_lowercase();
                for priced in items.iter_mut() {
                    priced.relevance_score = Some(Self::score(priced, &needle));
                }
                items.sort_by(Self::by_score);
            }
            None => items.sort_by(Self::by_popularity),
        }

        if !query.sort_by.is_price() && query.sort_by != SortKey::Relevance {
            items.sort_by(|a, b| {
                let ord = Self::by_stored_field(query.sort_by, a, b);
                match query.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        items
    }

    /// Cada campo conta uma vez só. Nome exato e nome parcial são excludentes.
    pub fn score(priced: &PricedItem, lowered_needle: &str) -> f64 {
        let item = &priced.item;
        let name = item.name.to_lowercase();
        let field_hit = |field: Option<&str>| {
            field.is_some_and(|value| value.to_lowercase().contains(lowered_needle))
        };

        let mut score = 0.0;
        if name == lowered_needle {
            score += EXACT_NAME_WEIGHT;
        } else if name.contains(lowered_needle) {
            score += PARTIAL_NAME_WEIGHT;
        }
        if field_hit(item.brand_name.as_deref()) {
            score += BRAND_WEIGHT;
        }
        if field_hit(item.category_name.as_deref()) {
            score += CATEGORY_WEIGHT;
        }
        if field_hit(Some(item.item_type.as_str())) {
            score += TYPE_WEIGHT;
        }

        score += item.average_rating.to_f64().unwrap_or(0.0) * RATING_WEIGHT;
        score += item.total_sold as f64 * POPULARITY_WEIGHT;
        if item.is_featured {
            score += FEATURED_BONUS;
        }
        score
    }

    fn by_stored_field(key: SortKey, a: &PricedItem, b: &PricedItem) -> Ordering {
        match key {
            SortKey::Rating => a.item.average_rating.cmp(&b.item.average_rating),
            SortKey::Newest => a.item.created_at.cmp(&b.item.created_at),
            SortKey::Popular => a.item.total_sold.cmp(&b.item.total_sold),
            SortKey::Name => a.item.name.to_lowercase().cmp(&b.item.name.to_lowercase()),
            SortKey::Relevance | SortKey::PriceLow | SortKey::PriceHigh => Ordering::Equal,
        }
    }

    fn by_score(a: &PricedItem, b: &PricedItem) -> Ordering {
        let sa = a.relevance_score.unwrap_or(0.0);
        let sb = b.relevance_score.unwrap_or(0.0);
        sb.total_cmp(&sa)
            .then_with(|| b.item.average_rating.cmp(&a.item.average_rating))
            .then_with(|| b.item.total_sold.cmp(&a.item.total_sold))
            .then_with(|| a.item.id.cmp(&b.item.id))
    }

    fn by_popularity(a: &PricedItem, b: &PricedItem) -> Ordering {
        b.item
            .total_sold
            .cmp(&a.item.total_sold)
            .then_with(|| b.item.average_rating.cmp(&a.item.average_rating))
            .then_with(|| b.item.created_at.cmp(&a.item.created_at))
            .then_with(|| a.item.id.cmp(&b.item.id))
    }
}
