// src/db/memory_repo.rs
//
// Catálogo em memória para os testes. Implementa as mesmas portas do Postgres
// (CatalogStore + ReferenceResolver), mas devolve listings e variantes SEM
// filtrar status de tenant/estoque: quem garante isso é o CatalogJoinEngine.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogStore, ReferenceResolver},
    models::{
        catalog::{
            Availability, CatalogItem, Listing, ListingStatus, ReferenceKind, TenantListing,
            Variant, VariantStatus,
        },
        discount::Discount,
        tenancy::{ApprovalStatus, RevenueModel, SubscriptionStatus, Tenant},
    },
    services::query_builder::NormalizedQuery,
};

#[derive(Default)]
pub struct InMemoryCatalog {
    references: Vec<(ReferenceKind, Uuid, String)>,
    items: Vec<CatalogItem>,
    listings: Vec<TenantListing>,
    variants: Vec<Variant>,
    latency: Option<Duration>,
    resolver_latency: Option<Duration>,
    fail_store: AtomicBool,
    fail_resolver: AtomicBool,
    item_queries: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn add_category(&mut self, name: &str) -> Uuid {
        self.add_reference(ReferenceKind::Category, name)
    }

    pub fn add_brand(&mut self, name: &str) -> Uuid {
        self.add_reference(ReferenceKind::Brand, name)
    }

    fn add_reference(&mut self, kind: ReferenceKind, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.references.push((kind, id, name.to_string()));
        id
    }

    pub fn add_item(&mut self, item: CatalogItem) -> CatalogItem {
        self.items.push(item.clone());
        item
    }

    pub fn add_listing(&mut self, listing: Listing, tenant: &Tenant) -> Listing {
        self.listings.push(TenantListing {
            listing: listing.clone(),
            tenant: tenant.clone(),
        });
        listing
    }

    pub fn add_variant(&mut self, variant: Variant) -> Variant {
        self.variants.push(variant.clone());
        variant
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_resolver_latency(mut self, latency: Duration) -> Self {
        self.resolver_latency = Some(latency);
        self
    }

    pub fn fail_store(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    pub fn fail_resolver(&self, fail: bool) {
        self.fail_resolver.store(fail, Ordering::SeqCst);
    }

    /// Quantas vezes a busca de itens chegou ao "banco".
    pub fn item_queries(&self) -> usize {
        self.item_queries.load(Ordering::SeqCst)
    }

    async fn simulate_io(&self) -> Result<(), AppError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl ReferenceResolver for InMemoryCatalog {
    async fn resolve(&self, kind: ReferenceKind, name: &str) -> Result<Option<Uuid>, AppError> {
        if let Some(latency) = self.resolver_latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_resolver.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .references
            .iter()
            .find(|(k, _, n)| *k == kind && n.eq_ignore_ascii_case(name.trim()))
            .map(|(_, id, _)| *id))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn find_items(
        &self,
        query: &NormalizedQuery,
        limit: i64,
    ) -> Result<Vec<CatalogItem>, AppError> {
        self.item_queries.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;

        let mut items: Vec<CatalogItem> = self
            .items
            .iter()
            .filter(|item| query.matches_item(item))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.total_sold.cmp(&a.total_sold).then(a.id.cmp(&b.id)));
        items.truncate(limit.max(0) as usize);
        Ok(items)
    }

    async fn find_listings(
        &self,
        item_ids: &[Uuid],
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<TenantListing>, AppError> {
        self.simulate_io().await?;
        Ok(self
            .listings
            .iter()
            .filter(|tl| item_ids.contains(&tl.listing.catalog_item_id))
            .filter(|tl| tenant_id.is_none_or(|id| tl.listing.tenant_id == id))
            .cloned()
            .collect())
    }

    async fn find_variants(&self, listing_ids: &[Uuid]) -> Result<Vec<Variant>, AppError> {
        self.simulate_io().await?;
        Ok(self
            .variants
            .iter()
            .filter(|v| listing_ids.contains(&v.listing_id))
            .cloned()
            .collect())
    }

    async fn suggest_names(&self, prefix: &str, limit: i64) -> Result<Vec<String>, AppError> {
        self.simulate_io().await?;
        let prefix = prefix.to_lowercase();

        let mut weighted: Vec<(i64, String)> = self
            .items
            .iter()
            .map(|i| (i.total_sold, i.name.clone()))
            .chain(self.references.iter().map(|(_, _, n)| (0, n.clone())))
            .filter(|(_, name)| name.to_lowercase().starts_with(&prefix))
            .collect();
        weighted.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut names: Vec<String> = Vec::new();
        for (_, name) in weighted {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.truncate(limit.max(0) as usize);
        Ok(names)
    }
}

// ---
// Fixtures
// ---

pub struct ItemFixture(CatalogItem);

impl ItemFixture {
    pub fn new(name: &str) -> Self {
        Self(CatalogItem {
            id: Uuid::new_v4(),
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            description: None,
            item_type: "spirit".to_string(),
            sub_type: None,
            category_id: None,
            category_name: None,
            sub_category_id: None,
            sub_category_name: None,
            brand_id: None,
            brand_name: None,
            abv: None,
            volume_ml: Some(750),
            origin_country: None,
            region: None,
            flavor_tags: Vec::new(),
            tags: Vec::new(),
            is_alcoholic: true,
            is_featured: false,
            average_rating: Decimal::ZERO,
            review_count: 0,
            total_sold: 0,
            created_at: Utc::now(),
        })
    }

    pub fn description(mut self, text: &str) -> Self {
        self.0.description = Some(text.to_string());
        self
    }

    pub fn item_type(mut self, item_type: &str) -> Self {
        self.0.item_type = item_type.to_string();
        self
    }

    pub fn origin(mut self, country: &str) -> Self {
        self.0.origin_country = Some(country.to_string());
        self
    }

    pub fn flavors(mut self, flavors: &[&str]) -> Self {
        self.0.flavor_tags = flavors.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.0.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn abv(mut self, abv: i64) -> Self {
        self.0.abv = Some(Decimal::from(abv));
        self.0.is_alcoholic = true;
        self
    }

    pub fn non_alcoholic(mut self) -> Self {
        self.0.abv = None;
        self.0.is_alcoholic = false;
        self
    }

    pub fn featured(mut self) -> Self {
        self.0.is_featured = true;
        self
    }

    pub fn rating(mut self, rating: Decimal) -> Self {
        self.0.average_rating = rating;
        self
    }

    pub fn sold(mut self, total_sold: i64) -> Self {
        self.0.total_sold = total_sold;
        self
    }

    pub fn category(mut self, id: Uuid, name: &str) -> Self {
        self.0.category_id = Some(id);
        self.0.category_name = Some(name.to_string());
        self
    }

    pub fn brand(mut self, id: Uuid, name: &str) -> Self {
        self.0.brand_id = Some(id);
        self.0.brand_name = Some(name.to_string());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.0.created_at = at;
        self
    }

    pub fn build(self) -> CatalogItem {
        self.0
    }
}

pub fn tenant(name: &str, revenue_model: RevenueModel) -> Tenant {
    Tenant {
        id: Uuid::new_v4(),
        name: name.to_string(),
        revenue_model,
        currency: "BRL".to_string(),
        approval_status: ApprovalStatus::Approved,
        subscription_status: SubscriptionStatus::Active,
    }
}

pub fn markup(percentage: i64) -> RevenueModel {
    RevenueModel::Markup {
        percentage: Decimal::from(percentage),
    }
}

pub fn commission(percentage: i64) -> RevenueModel {
    RevenueModel::Commission {
        percentage: Decimal::from(percentage),
    }
}

pub fn listing(item: &CatalogItem, tenant: &Tenant, selling_price: Decimal) -> Listing {
    Listing {
        id: Uuid::new_v4(),
        catalog_item_id: item.id,
        tenant_id: tenant.id,
        cost_price: None,
        selling_price,
        discount: Discount::None,
        status: ListingStatus::Active,
        has_variants: true,
        stock_quantity: 0,
        availability: Availability::InStock,
    }
}

pub fn variant(listing: &Listing, name: &str, selling_price: Decimal, stock: i32) -> Variant {
    Variant {
        id: Some(Uuid::new_v4()),
        listing_id: listing.id,
        name: name.to_string(),
        volume_ml: None,
        sku: None,
        selling_price,
        cost_price: None,
        stock,
        status: VariantStatus::Active,
        availability: if stock > 0 {
            Availability::InStock
        } else {
            Availability::OutOfStock
        },
        discount: Discount::None,
    }
}
