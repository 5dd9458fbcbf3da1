// src/db/catalog_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{CatalogItem, TenantListing, Variant},
    services::query_builder::NormalizedQuery,
};

/// A fronteira com o banco. Tudo o que a busca lê passa por aqui.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Itens que casam com o filtro (push-down), no máximo `limit`.
    async fn find_items(
        &self,
        query: &NormalizedQuery,
        limit: i64,
    ) -> Result<Vec<CatalogItem>, AppError>;

    /// Listings ativas de tenants em dia, com o tenant já no JOIN.
    async fn find_listings(
        &self,
        item_ids: &[Uuid],
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<TenantListing>, AppError>;

    async fn find_variants(&self, listing_ids: &[Uuid]) -> Result<Vec<Variant>, AppError>;

    /// Nomes de produtos, marcas e categorias que começam com `prefix`.
    async fn suggest_names(&self, prefix: &str, limit: i64) -> Result<Vec<String>, AppError>;
}

// Colunas + JOINs dos nomes de referência. O WHERE é montado dinamicamente.
const ITEM_SELECT: &str = r#"
    SELECT ci.id, ci.slug, ci.name, ci.description, ci.item_type, ci.sub_type,
           ci.category_id, c.name AS category_name,
           ci.sub_category_id, sc.name AS sub_category_name,
           ci.brand_id, b.name AS brand_name,
           ci.abv, ci.volume_ml, ci.origin_country, ci.region,
           ci.flavor_tags, ci.tags, ci.is_alcoholic, ci.is_featured,
           ci.average_rating, ci.review_count, ci.total_sold, ci.created_at
    FROM catalog_items ci
    LEFT JOIN categories c ON c.id = ci.category_id
    LEFT JOIN sub_categories sc ON sc.id = ci.sub_category_id
    LEFT JOIN brands b ON b.id = ci.brand_id
    WHERE ci.is_active = TRUE
"#;

const LISTING_SELECT: &str = r#"
    SELECT l.id, l.catalog_item_id, l.tenant_id, l.cost_price, l.selling_price,
           l.discount_type, l.discount_value, l.discount_starts_at, l.discount_ends_at,
           l.status, l.has_variants, l.stock_quantity, l.availability,
           t.name AS tenant_name,
           t.revenue_model AS tenant_revenue_model,
           t.markup_percentage AS tenant_markup_percentage,
           t.commission_percentage AS tenant_commission_percentage,
           t.currency AS tenant_currency,
           t.approval_status AS tenant_approval_status,
           t.subscription_status AS tenant_subscription_status
    FROM listings l
    JOIN tenants t ON t.id = l.tenant_id
    WHERE l.catalog_item_id = ANY($1)
      AND l.status = 'active'
      AND t.approval_status = 'approved'
      AND t.subscription_status IN ('active', 'trialing')
      AND ($2::uuid IS NULL OR l.tenant_id = $2)
    ORDER BY l.catalog_item_id, l.created_at, l.id
"#;

const VARIANT_SELECT: &str = r#"
    SELECT v.id, v.listing_id, v.name, v.volume_ml, v.sku,
           v.selling_price, v.cost_price, v.stock, v.status, v.availability,
           v.discount_type, v.discount_value, v.discount_starts_at, v.discount_ends_at
    FROM listing_variants v
    WHERE v.listing_id = ANY($1)
      AND v.status = 'active'
    ORDER BY v.listing_id, v.volume_ml NULLS LAST, v.id
"#;

const SUGGEST_SELECT: &str = r#"
    SELECT name FROM (
        SELECT name, total_sold AS weight FROM catalog_items WHERE is_active = TRUE AND name ILIKE $1
        UNION ALL
        SELECT name, 0 AS weight FROM brands WHERE name ILIKE $1
        UNION ALL
        SELECT name, 0 AS weight FROM categories WHERE name ILIKE $1
    ) s
    GROUP BY name
    ORDER BY max(weight) DESC, name ASC
    LIMIT $2
"#;

/// Escapa os curingas do LIKE para que o texto do usuário seja literal.
pub(crate) fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Empurra para o SQL todos os filtros que são colunas de verdade.
    // Preço NÃO entra aqui: ele é calculado depois, por tenant.
    fn push_item_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &NormalizedQuery) {
        if let Some(text) = &query.text {
            let pattern = format!("%{}%", escape_like(text));
            qb.push(" AND (ci.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR ci.description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR ci.item_type ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR ci.origin_country ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR EXISTS (SELECT 1 FROM unnest(ci.flavor_tags) AS f WHERE f ILIKE ")
                .push_bind(pattern)
                .push("))");
        }

        for (column, ids) in [
            ("ci.category_id", &query.categories),
            ("ci.sub_category_id", &query.sub_categories),
            ("ci.brand_id", &query.brands),
        ] {
            if let Some(ids) = ids {
                let ids: Vec<Uuid> = ids.iter().copied().collect();
                qb.push(format!(" AND {column} = ANY("))
                    .push_bind(ids)
                    .push(")");
            }
        }

        for (column, values) in [
            ("ci.tags", &query.tags),
            ("ci.flavor_tags", &query.flavors),
        ] {
            if !values.is_empty() {
                let values: Vec<String> = values.iter().cloned().collect();
                qb.push(format!(
                    " AND EXISTS (SELECT 1 FROM unnest({column}) AS v WHERE lower(v) = ANY("
                ))
                .push_bind(values)
                .push("))");
            }
        }

        for (column, values) in [
            ("ci.origin_country", &query.origin_countries),
            ("ci.region", &query.regions),
            ("ci.item_type", &query.types),
            ("ci.sub_type", &query.sub_types),
        ] {
            if !values.is_empty() {
                let values: Vec<String> = values.iter().cloned().collect();
                qb.push(format!(" AND lower({column}) = ANY("))
                    .push_bind(values)
                    .push(")");
            }
        }

        if let Some(min_abv) = query.min_abv {
            qb.push(" AND ci.abv >= ").push_bind(min_abv);
        }
        if let Some(max_abv) = query.max_abv {
            qb.push(" AND ci.abv <= ").push_bind(max_abv);
        }
        if let Some(is_alcoholic) = query.is_alcoholic {
            qb.push(" AND ci.is_alcoholic = ").push_bind(is_alcoholic);
        }
        if let Some(is_featured) = query.is_featured {
            qb.push(" AND ci.is_featured = ").push_bind(is_featured);
        }
        if let Some(min_rating) = query.min_rating {
            qb.push(" AND ci.average_rating >= ").push_bind(min_rating);
        }
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn find_items(
        &self,
        query: &NormalizedQuery,
        limit: i64,
    ) -> Result<Vec<CatalogItem>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(ITEM_SELECT);
        Self::push_item_filters(&mut qb, query);

        // O teto corta pelos mais vendidos; a ordem final é do RelevanceRanker.
        qb.push(" ORDER BY ci.total_sold DESC, ci.id ASC LIMIT ")
            .push_bind(limit);

        let items = qb
            .build_query_as::<CatalogItem>()
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn find_listings(
        &self,
        item_ids: &[Uuid],
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<TenantListing>, AppError> {
        let listings = sqlx::query_as::<_, TenantListing>(LISTING_SELECT)
            .bind(item_ids)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(listings)
    }

    async fn find_variants(&self, listing_ids: &[Uuid]) -> Result<Vec<Variant>, AppError> {
        let variants = sqlx::query_as::<_, Variant>(VARIANT_SELECT)
            .bind(listing_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(variants)
    }

    async fn suggest_names(&self, prefix: &str, limit: i64) -> Result<Vec<String>, AppError> {
        let pattern = format!("{}%", escape_like(prefix));

        let names = sqlx::query_scalar::<_, String>(SUGGEST_SELECT)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(names)
    }
}
