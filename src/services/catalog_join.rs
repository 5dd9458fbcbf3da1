// src/services/catalog_join.rs

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CatalogStore,
    models::{
        catalog::{CatalogItem, Listing, ListingStatus, TenantListing, Variant},
        tenancy::Tenant,
    },
    services::query_builder::NormalizedQuery,
};

// Uma listing que sobreviveu ao JOIN, com as variantes já filtradas.
#[derive(Debug, Clone)]
pub struct JoinedOffer {
    pub tenant: Tenant,
    pub listing: Listing,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone)]
pub struct JoinedItem {
    pub item: CatalogItem,
    pub offers: Vec<JoinedOffer>,
}

#[derive(Clone)]
pub struct CatalogJoinEngine {
    store: Arc<dyn CatalogStore>,
    timeout: Duration,
    max_results: i64,
}

impl CatalogJoinEngine {
    pub fn new(store: Arc<dyn CatalogStore>, timeout: Duration, max_results: i64) -> Self {
        Self {
            store,
            timeout,
            max_results,
        }
    }

    /// Item -> listings -> variantes. Tudo ou nada: em timeout ou erro de banco
    /// nada parcial é devolvido.
    pub async fn join(&self, query: &NormalizedQuery) -> Result<Vec<JoinedItem>, AppError> {
        if query.matches_nothing() {
            return Ok(Vec::new());
        }

        // Ao estourar o prazo o future é descartado e as queries em andamento
        // são canceladas junto.
        match tokio::time::timeout(self.timeout, self.fetch(query)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "⏱️ Catálogo não respondeu a tempo");
                Err(AppError::UpstreamTimeout(self.timeout))
            }
        }
    }

    async fn fetch(&self, query: &NormalizedQuery) -> Result<Vec<JoinedItem>, AppError> {
        // 1. Itens (push-down no banco, depois o predicado em memória)
        let fetched = self.store.find_items(query, self.max_results).await?;
        if fetched.len() as i64 >= self.max_results {
            tracing::debug!(max_results = self.max_results, "busca atingiu o teto de itens");
        }
        let items: Vec<CatalogItem> = fetched
            .into_iter()
            .filter(|item| query.matches_item(item))
            .collect();
        if items.is_empty() {
            return Ok(Vec::new());
        }

        // 2. Listings de tenants em dia
        let item_ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        let listings: Vec<TenantListing> = self
            .store
            .find_listings(&item_ids, query.tenant_id)
            .await?
            .into_iter()
            .filter(|tl| is_listing_eligible(tl, query.tenant_id))
            .collect();
        if listings.is_empty() {
            return Ok(Vec::new());
        }

        // 3. Variantes (só das listings que têm variantes)
        let listing_ids: Vec<Uuid> = listings
            .iter()
            .filter(|tl| tl.listing.has_variants)
            .map(|tl| tl.listing.id)
            .collect();
        let variants = if listing_ids.is_empty() {
            Vec::new()
        } else {
            self.store.find_variants(&listing_ids).await?
        };

        // 4 e 5. Monta e descarta o que ficou vazio
        Ok(assemble(items, listings, variants, !query.in_stock))
    }
}

fn is_listing_eligible(tl: &TenantListing, tenant_scope: Option<Uuid>) -> bool {
    tl.listing.tenant_id == tl.tenant.id
        && tl.tenant.is_in_good_standing()
        && tl.listing.status == ListingStatus::Active
        && tenant_scope.is_none_or(|id| tl.tenant.id == id)
}

/// Junta as três camadas preservando a ordem dos itens.
fn assemble(
    items: Vec<CatalogItem>,
    listings: Vec<TenantListing>,
    variants: Vec<Variant>,
    include_out_of_stock: bool,
) -> Vec<JoinedItem> {
    let mut variants_by_listing: HashMap<Uuid, Vec<Variant>> = HashMap::new();
    for variant in variants {
        variants_by_listing
            .entry(variant.listing_id)
            .or_default()
            .push(variant);
    }

    let mut listings_by_item: HashMap<Uuid, Vec<TenantListing>> = HashMap::new();
    let mut seen_pairs: HashSet<(Uuid, Uuid)> = HashSet::new();
    for tl in listings {
        // Uma listing por (item, tenant). Duplicata é erro do lado da escrita.
        if !seen_pairs.insert((tl.listing.catalog_item_id, tl.tenant.id)) {
            tracing::warn!(
                item_id = %tl.listing.catalog_item_id,
                tenant_id = %tl.tenant.id,
                listing_id = %tl.listing.id,
                "listing duplicada para o mesmo tenant, ignorada"
            );
            continue;
        }
        listings_by_item
            .entry(tl.listing.catalog_item_id)
            .or_default()
            .push(tl);
    }

    items
        .into_iter()
        .filter_map(|item| {
            let offers: Vec<JoinedOffer> = listings_by_item
                .remove(&item.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|tl| {
                    let eligible: Vec<Variant> = if tl.listing.has_variants {
                        variants_by_listing
                            .remove(&tl.listing.id)
                            .unwrap_or_default()
                            .into_iter()
                            .filter(|v| v.is_eligible(include_out_of_stock))
                            .collect()
                    } else {
                        let synthetic = Variant::synthetic_for(&tl.listing, &item);
                        if synthetic.is_eligible(include_out_of_stock) {
                            vec![synthetic]
                        } else {
                            Vec::new()
                        }
                    };

                    if eligible.is_empty() {
                        return None;
                    }
                    Some(JoinedOffer {
                        tenant: tl.tenant,
                        listing: tl.listing,
                        variants: eligible,
                    })
                })
                .collect();

            if offers.is_empty() {
                None
            } else {
                Some(JoinedItem { item, offers })
            }
        })
        .collect()
}
