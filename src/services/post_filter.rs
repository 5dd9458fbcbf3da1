// src/services/post_filter.rs
//
// Filtros que dependem do preço calculado (não existem como coluna) e tudo o
// que vem depois deles: ordenação por preço, facetas e paginação.

use std::{collections::BTreeMap, fmt, str::FromStr};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    models::search::{AvailableFilters, FacetValue, Pagination},
    services::{
        pricing::PricedItem,
        query_builder::{NormalizedQuery, SortKey},
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceRangeMode {
    /// A faixa [min, max] do item intersecta a faixa pedida.
    #[default]
    Overlap,
    /// Alguma variante tem preço efetivo dentro da faixa pedida.
    Contained,
}

impl FromStr for PriceRangeMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "overlap" => Ok(PriceRangeMode::Overlap),
            "contained" => Ok(PriceRangeMode::Contained),
            other => Err(format!("modo de faixa de preço desconhecido: {other}")),
        }
    }
}

impl fmt::Display for PriceRangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceRangeMode::Overlap => f.write_str("overlap"),
            PriceRangeMode::Contained => f.write_str("contained"),
        }
    }
}

pub struct PostAggregationFilter;

impl PostAggregationFilter {
    /// Faixa de preço + "só promoções" + ordenação por preço. Preserva a ordem
    /// de relevância em todo o resto.
    pub fn apply(
        items: Vec<PricedItem>,
        query: &NormalizedQuery,
        mode: PriceRangeMode,
    ) -> Vec<PricedItem> {
        let mut kept: Vec<PricedItem> = items
            .into_iter()
            .filter(|priced| Self::in_price_range(priced, query.min_price, query.max_price, mode))
            .filter(|priced| !query.on_sale || priced.has_active_discount())
            .collect();

        // sort_by é estável: empates de preço mantêm a ordem do ranking
        match query.sort_by {
            SortKey::PriceLow => kept.sort_by(|a, b| a.min_price.cmp(&b.min_price)),
            SortKey::PriceHigh => kept.sort_by(|a, b| b.min_price.cmp(&a.min_price)),
            _ => {}
        }

        kept
    }

    pub fn in_price_range(
        priced: &PricedItem,
        min: Option<Decimal>,
        max: Option<Decimal>,
        mode: PriceRangeMode,
    ) -> bool {
        if min.is_none() && max.is_none() {
            return true;
        }
        match mode {
            PriceRangeMode::Overlap => {
                min.is_none_or(|min| priced.max_price >= min)
                    && max.is_none_or(|max| priced.min_price <= max)
            }
            PriceRangeMode::Contained => priced
                .offers
                .iter()
                .flat_map(|offer| offer.variants.iter())
                .map(|variant| variant.price.effective)
                .any(|price| min.is_none_or(|min| price >= min) && max.is_none_or(|max| price <= max)),
        }
    }

    /// Facetas sobre o conjunto filtrado inteiro (antes da paginação).
    /// Ordem: contagem desc, depois valor asc.
    pub fn facets(items: &[PricedItem]) -> AvailableFilters {
        let mut categories = FacetCounter::default();
        let mut sub_categories = FacetCounter::default();
        let mut brands = FacetCounter::default();
        let mut tags = FacetCounter::default();
        let mut flavors = FacetCounter::default();
        let mut countries = FacetCounter::default();
        let mut types = FacetCounter::default();

        for priced in items {
            let item = &priced.item;
            categories.add_ref(item.category_id, item.category_name.as_deref());
            sub_categories.add_ref(item.sub_category_id, item.sub_category_name.as_deref());
            brands.add_ref(item.brand_id, item.brand_name.as_deref());
            for tag in &item.tags {
                tags.add_value(tag);
            }
            for flavor in &item.flavor_tags {
                flavors.add_value(flavor);
            }
            if let Some(country) = &item.origin_country {
                countries.add_value(country);
            }
            types.add_value(&item.item_type);
        }

        AvailableFilters {
            categories: categories.finish(),
            sub_categories: sub_categories.finish(),
            brands: brands.finish(),
            tags: tags.finish(),
            flavors: flavors.finish(),
            countries: countries.finish(),
            types: types.finish(),
        }
    }

    /// Recorta a página pedida. Página além do fim devolve vazio com os totais
    /// corretos.
    pub fn paginate<T>(items: Vec<T>, page: u32, limit: u32) -> (Vec<T>, Pagination) {
        let limit = limit.max(1);
        let page = page.max(1);
        let total = items.len();
        let total_pages = total.div_ceil(limit as usize) as u32;

        let start = (page as usize - 1).saturating_mul(limit as usize);
        let page_items: Vec<T> = items.into_iter().skip(start).take(limit as usize).collect();

        let pagination = Pagination {
            current_page: page,
            total_pages,
            total_results: total,
            results_per_page: limit,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        };
        (page_items, pagination)
    }
}

// Contagem por valor. Strings contam case-insensitive e exibem a primeira grafia vista.
#[derive(Default)]
struct FacetCounter {
    counts: BTreeMap<String, (Option<Uuid>, String, usize)>,
}

impl FacetCounter {
    fn add_ref(&mut self, id: Option<Uuid>, name: Option<&str>) {
        let Some(id) = id else {
            return;
        };
        let name = name.unwrap_or_default();
        self.counts
            .entry(id.to_string())
            .or_insert_with(|| (Some(id), name.to_string(), 0))
            .2 += 1;
    }

    fn add_value(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        self.counts
            .entry(value.to_lowercase())
            .or_insert_with(|| (None, value.to_string(), 0))
            .2 += 1;
    }

    fn finish(self) -> Vec<FacetValue> {
        let mut facets: Vec<FacetValue> = self
            .counts
            .into_values()
            .map(|(id, value, count)| FacetValue { id, value, count })
            .collect();
        facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        facets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::memory_repo::ItemFixture,
        models::{
            catalog::Availability,
            search::{PricedVariant, ResolvedPrice, TenantOffer},
            tenancy::RevenueModelKind,
        },
    };
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn priced_variant(effective: &str, discounted: bool) -> PricedVariant {
        let effective = dec(effective);
        PricedVariant {
            variant_id: Some(Uuid::new_v4()),
            name: "750ml".into(),
            volume_ml: Some(750),
            sku: None,
            stock: 5,
            availability: Availability::InStock,
            price: ResolvedPrice {
                cost: Decimal::ZERO,
                selling: effective,
                effective,
                currency: "BRL".into(),
                discount: discounted.then(|| crate::models::search::AppliedDiscount {
                    kind: crate::models::discount::DiscountType::Fixed,
                    value: Decimal::ONE,
                    original_price: effective + Decimal::ONE,
                    discounted_price: effective,
                    savings: Decimal::ONE,
                    ends_at: None,
                }),
            },
        }
    }

    fn priced(name: &str, prices: &[&str], on_sale: bool) -> PricedItem {
        let variants: Vec<PricedVariant> = prices.iter().map(|p| priced_variant(p, on_sale)).collect();
        let min = variants.iter().map(|v| v.price.effective).min().unwrap();
        let max = variants.iter().map(|v| v.price.effective).max().unwrap();
        PricedItem {
            item: ItemFixture::new(name).build(),
            offers: vec![TenantOffer {
                tenant_id: Uuid::new_v4(),
                tenant_name: "T".into(),
                listing_id: Uuid::new_v4(),
                currency: "BRL".into(),
                revenue_model: RevenueModelKind::Markup,
                lowest_price: min,
                variants,
            }],
            min_price: min,
            max_price: max,
            currency: "BRL".into(),
            best_discount: None,
            total_stock: 5,
            relevance_score: None,
        }
    }

    fn names(items: &[PricedItem]) -> Vec<&str> {
        items.iter().map(|p| p.item.name.as_str()).collect()
    }

    #[test]
    fn overlap_keeps_items_whose_range_touches_the_request() {
        // Faixa [10, 100] não tem nenhuma variante entre 40 e 60, mas intersecta.
        let wide = priced("Larga", &["10", "100"], false);
        let cheap = priced("Barata", &["5", "8"], false);
        let pricey = priced("Cara", &["200"], false);
        let min = Some(dec("40"));
        let max = Some(dec("60"));

        assert!(PostAggregationFilter::in_price_range(&wide, min, max, PriceRangeMode::Overlap));
        assert!(!PostAggregationFilter::in_price_range(&cheap, min, max, PriceRangeMode::Overlap));
        assert!(!PostAggregationFilter::in_price_range(&pricey, min, max, PriceRangeMode::Overlap));

        assert!(!PostAggregationFilter::in_price_range(&wide, min, max, PriceRangeMode::Contained));
        let inside = priced("Dentro", &["10", "50"], false);
        assert!(PostAggregationFilter::in_price_range(&inside, min, max, PriceRangeMode::Contained));
    }

    #[test]
    fn open_ended_ranges() {
        let item = priced("X", &["30"], false);
        assert!(PostAggregationFilter::in_price_range(&item, Some(dec("30")), None, PriceRangeMode::Overlap));
        assert!(!PostAggregationFilter::in_price_range(&item, Some(dec("30.01")), None, PriceRangeMode::Overlap));
        assert!(PostAggregationFilter::in_price_range(&item, None, Some(dec("30")), PriceRangeMode::Contained));
        assert!(PostAggregationFilter::in_price_range(&item, None, None, PriceRangeMode::Contained));
    }

    #[test]
    fn on_sale_only_and_price_sort() {
        let items = vec![
            priced("Média", &["50"], true),
            priced("Sem promo", &["10"], false),
            priced("Barata", &["20"], true),
            priced("Cara", &["90"], true),
        ];
        let query = NormalizedQuery {
            on_sale: true,
            sort_by: SortKey::PriceLow,
            ..NormalizedQuery::default()
        };
        let kept = PostAggregationFilter::apply(items.clone(), &query, PriceRangeMode::Overlap);
        assert_eq!(names(&kept), vec!["Barata", "Média", "Cara"]);

        let query = NormalizedQuery {
            sort_by: SortKey::PriceHigh,
            ..NormalizedQuery::default()
        };
        let kept = PostAggregationFilter::apply(items, &query, PriceRangeMode::Overlap);
        assert_eq!(names(&kept), vec!["Cara", "Média", "Barata", "Sem promo"]);
    }

    #[test]
    fn price_sort_ties_keep_incoming_order() {
        let items = vec![
            priced("Primeiro", &["10"], false),
            priced("Segundo", &["10"], false),
            priced("Terceiro", &["5"], false),
        ];
        let query = NormalizedQuery {
            sort_by: SortKey::PriceLow,
            ..NormalizedQuery::default()
        };
        let kept = PostAggregationFilter::apply(items, &query, PriceRangeMode::Overlap);
        assert_eq!(names(&kept), vec!["Terceiro", "Primeiro", "Segundo"]);
    }

    #[test]
    fn pages_are_disjoint_and_totals_are_consistent() {
        let items: Vec<u32> = (0..25).collect();

        let (first, p1) = PostAggregationFilter::paginate(items.clone(), 1, 10);
        let (second, p2) = PostAggregationFilter::paginate(items.clone(), 2, 10);
        let (third, p3) = PostAggregationFilter::paginate(items.clone(), 3, 10);
        let (beyond, p4) = PostAggregationFilter::paginate(items, 9, 10);

        assert!(first.iter().all(|i| !second.contains(i)));
        assert_eq!(p1.total_pages, 3);
        assert_eq!(p1.total_results, 25);
        assert!(p1.has_next_page && !p1.has_previous_page);
        assert!(p2.has_next_page && p2.has_previous_page);
        assert_eq!(third, vec![20, 21, 22, 23, 24]);
        assert!(!p3.has_next_page);
        assert!(beyond.is_empty());
        assert_eq!(p4.total_pages, 3);
        assert!(!p4.has_next_page);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let (items, p) = PostAggregationFilter::paginate(Vec::<u32>::new(), 1, 20);
        assert!(items.is_empty());
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
        assert!(!p.has_previous_page);
    }

    #[test]
    fn facets_count_the_filtered_set() {
        let islay = Uuid::new_v4();
        let mut a = priced("A", &["10"], false);
        a.item = ItemFixture::new("A")
            .category(islay, "Whisky")
            .tags(&["Smoky", "peated"])
            .origin("Scotland")
            .build();
        let mut b = priced("B", &["10"], false);
        b.item = ItemFixture::new("B")
            .category(islay, "Whisky")
            .tags(&["smoky"])
            .item_type("whisky")
            .build();

        let facets = PostAggregationFilter::facets(&[a, b]);
        assert_eq!(
            facets.categories,
            vec![FacetValue { id: Some(islay), value: "Whisky".into(), count: 2 }]
        );
        assert_eq!(facets.tags[0], FacetValue { id: None, value: "Smoky".into(), count: 2 });
        assert_eq!(facets.tags[1].count, 1);
        assert_eq!(facets.countries.len(), 1);
        assert!(facets.brands.is_empty());
        assert_eq!(facets.types.len(), 2);
    }
}
