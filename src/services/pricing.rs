// src/services/pricing.rs

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::CatalogItem,
        discount::Discount,
        search::{AppliedDiscount, PricedVariant, ResolvedPrice, TenantOffer},
        tenancy::{RevenueModel, Tenant},
    },
    services::catalog_join::{JoinedItem, JoinedOffer},
};

/// Tudo o que o cálculo de UMA variante precisa.
#[derive(Debug, Clone, Copy)]
pub struct PriceInput<'a> {
    pub item_id: Uuid,
    pub tenant: &'a Tenant,
    pub selling_price: Decimal,
    pub cost_price: Option<Decimal>,
    pub variant_discount: &'a Discount,
    pub listing_discount: &'a Discount,
}

// Item com todos os preços resolvidos. É o que o ranking, o pós-filtro e a
// paginação manipulam.
#[derive(Debug, Clone)]
pub struct PricedItem {
    pub item: CatalogItem,
    pub offers: Vec<TenantOffer>,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub currency: String,
    pub best_discount: Option<AppliedDiscount>,
    pub total_stock: i64,
    pub relevance_score: Option<f64>,
}

impl PricedItem {
    pub fn has_active_discount(&self) -> bool {
        self.offers
            .iter()
            .flat_map(|offer| offer.variants.iter())
            .any(|variant| variant.price.discount.is_some())
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub struct PriceResolver;

impl PriceResolver {
    /// Desconto da variante se ativo, senão o da listing se ativo, senão nenhum.
    pub fn applicable_discount<'a>(
        variant_discount: &'a Discount,
        listing_discount: &'a Discount,
        now: DateTime<Utc>,
    ) -> Option<&'a Discount> {
        if variant_discount.is_active(now) {
            Some(variant_discount)
        } else if listing_discount.is_active(now) {
            Some(listing_discount)
        } else {
            None
        }
    }

    /// Preço efetivo de uma variante para um tenant.
    pub fn resolve(input: &PriceInput<'_>, now: DateTime<Utc>) -> Result<ResolvedPrice, AppError> {
        if input.selling_price.is_sign_negative() {
            return Err(AppError::InvalidPrice {
                item_id: input.item_id,
                tenant_id: input.tenant.id,
                reason: format!("preço de venda negativo ({})", input.selling_price),
            });
        }

        // 1. O preço gravado já contém o markup; não recalculamos a partir do custo.
        // 2. Comissão: a plataforma soma por cima do líquido do tenant.
        let customer_price = match input.tenant.revenue_model {
            RevenueModel::Markup { .. } => input.selling_price,
            RevenueModel::Commission { percentage } => {
                input.selling_price * (Decimal::ONE + percentage / Decimal::ONE_HUNDRED)
            }
        };
        let selling = round_money(customer_price);

        // 3. Desconto (piso em zero dentro do `apply`)
        let discount = Self::applicable_discount(input.variant_discount, input.listing_discount, now);
        let (effective, applied) = match discount.and_then(|d| d.kind().map(|kind| (d, kind))) {
            Some((discount, kind)) => {
                // 4. Arredonda no fim
                let effective = round_money(discount.apply(customer_price));
                let applied = AppliedDiscount {
                    kind,
                    value: discount.value(),
                    original_price: selling,
                    discounted_price: effective,
                    savings: (selling - effective).max(Decimal::ZERO),
                    ends_at: discount.ends_at(),
                };
                (effective, Some(applied))
            }
            None => (selling, None),
        };

        Ok(ResolvedPrice {
            // Custo é só informativo
            cost: round_money(input.cost_price.unwrap_or(Decimal::ZERO)),
            selling,
            effective,
            currency: input.tenant.currency.clone(),
            discount: applied,
        })
    }

    /// Resolve todas as variantes de um item. Variante com preço inválido sai
    /// sozinha; oferta sem variantes e item sem ofertas somem.
    pub fn price_item(joined: JoinedItem, now: DateTime<Utc>) -> Option<PricedItem> {
        let JoinedItem { item, offers } = joined;

        let offers: Vec<TenantOffer> = offers
            .into_iter()
            .filter_map(|offer| Self::price_offer(&item, offer, now))
            .collect();
        if offers.is_empty() {
            return None;
        }

        // Faixa global: o menor e o maior preço efetivo entre todos os tenants.
        let mut prices = offers
            .iter()
            .flat_map(|offer| offer.variants.iter())
            .map(|variant| &variant.price);
        let first = prices.next()?;
        let (mut min, mut max, mut currency) = (first.effective, first.effective, &first.currency);
        for price in prices {
            if price.effective < min {
                min = price.effective;
                currency = &price.currency;
            }
            max = max.max(price.effective);
        }
        let currency = currency.clone();

        // Melhor desconto = maior economia absoluta
        let best_discount = offers
            .iter()
            .flat_map(|offer| offer.variants.iter())
            .filter_map(|variant| variant.price.discount.as_ref())
            .max_by(|a, b| a.savings.cmp(&b.savings))
            .cloned();

        let total_stock = offers
            .iter()
            .flat_map(|offer| offer.variants.iter())
            .map(|variant| i64::from(variant.stock.max(0)))
            .sum();

        Some(PricedItem {
            item,
            offers,
            min_price: min,
            max_price: max,
            currency,
            best_discount,
            total_stock,
            relevance_score: None,
        })
    }

    fn price_offer(item: &CatalogItem, offer: JoinedOffer, now: DateTime<Utc>) -> Option<TenantOffer> {
        let JoinedOffer {
            tenant,
            listing,
            variants,
        } = offer;

        let priced: Vec<PricedVariant> = variants
            .into_iter()
            .filter_map(|variant| {
                let input = PriceInput {
                    item_id: item.id,
                    tenant: &tenant,
                    selling_price: variant.selling_price,
                    cost_price: variant.cost_price.or(listing.cost_price),
                    variant_discount: &variant.discount,
                    listing_discount: &listing.discount,
                };
                match Self::resolve(&input, now) {
                    Ok(price) => Some(PricedVariant {
                        variant_id: variant.id,
                        name: variant.name,
                        volume_ml: variant.volume_ml,
                        sku: variant.sku,
                        stock: variant.stock,
                        availability: variant.availability,
                        price,
                    }),
                    Err(e) => {
                        tracing::warn!(
                            item_id = %item.id,
                            tenant_id = %tenant.id,
                            variant_id = ?variant.id,
                            "variante descartada: {}", e
                        );
                        None
                    }
                }
            })
            .collect();

        let lowest_price = priced.iter().map(|v| v.price.effective).min()?;

        Some(TenantOffer {
            tenant_id: tenant.id,
            tenant_name: tenant.name,
            listing_id: listing.id,
            currency: tenant.currency,
            revenue_model: tenant.revenue_model.kind(),
            lowest_price,
            variants: priced,
        })
    }
}
