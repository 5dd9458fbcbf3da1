// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    discount::{Discount, DiscountType},
    tenancy::Tenant,
};

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "listing_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Inactive,
    Discontinued,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "variant_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VariantStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "stock_availability", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    InStock,
    LowStock,
    OutOfStock,
    Discontinued,
}

impl Availability {
    /// Estados em que a variante pode ser vendida.
    pub fn is_sellable(self) -> bool {
        matches!(
            self,
            Availability::Available | Availability::InStock | Availability::LowStock
        )
    }
}

// ---
// 1. CatalogItem (o "Produto" canônico)
// ---
// Independente de tenant. A busca só lê. Os nomes de categoria/marca vêm do JOIN.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub item_type: String,
    pub sub_type: Option<String>,

    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub sub_category_id: Option<Uuid>,
    pub sub_category_name: Option<String>,
    pub brand_id: Option<Uuid>,
    pub brand_name: Option<String>,

    pub abv: Option<Decimal>,
    pub volume_ml: Option<i32>,
    pub origin_country: Option<String>,
    pub region: Option<String>,
    pub flavor_tags: Vec<String>,
    pub tags: Vec<String>,
    pub is_alcoholic: bool,

    // Merchandising
    pub is_featured: bool,
    pub average_rating: Decimal,
    pub review_count: i32,
    pub total_sold: i64,

    pub created_at: DateTime<Utc>,
}

// ---
// 2. Listing (a oferta de UM tenant para um CatalogItem)
// ---
#[derive(Debug, Clone)]
pub struct Listing {
    pub id: Uuid,
    pub catalog_item_id: Uuid,
    pub tenant_id: Uuid,
    pub cost_price: Option<Decimal>,
    pub selling_price: Decimal,
    pub discount: Discount,
    pub status: ListingStatus,
    // 'false' = vende sem variantes; o estoque da própria listing vale
    pub has_variants: bool,
    pub stock_quantity: i32,
    pub availability: Availability,
}

impl<'r> FromRow<'r, PgRow> for Listing {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let discount_type: Option<DiscountType> = row.try_get("discount_type")?;
        Ok(Self {
            id: row.try_get("id")?,
            catalog_item_id: row.try_get("catalog_item_id")?,
            tenant_id: row.try_get("tenant_id")?,
            cost_price: row.try_get("cost_price")?,
            selling_price: row.try_get("selling_price")?,
            discount: Discount::from_parts(
                discount_type,
                row.try_get("discount_value")?,
                row.try_get("discount_starts_at")?,
                row.try_get("discount_ends_at")?,
            ),
            status: row.try_get("status")?,
            has_variants: row.try_get("has_variants")?,
            stock_quantity: row.try_get("stock_quantity")?,
            availability: row.try_get("availability")?,
        })
    }
}

// Listing + Tenant na mesma linha (JOIN tenants).
#[derive(Debug, Clone)]
pub struct TenantListing {
    pub listing: Listing,
    pub tenant: Tenant,
}

impl<'r> FromRow<'r, PgRow> for TenantListing {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            listing: Listing::from_row(row)?,
            tenant: Tenant::from_row(row)?,
        })
    }
}

// ---
// 3. Variant (o tamanho de embalagem: 350ml, 750ml, caixa com 6...)
// ---
#[derive(Debug, Clone)]
pub struct Variant {
    // None = variante sintética de uma listing sem variantes
    pub id: Option<Uuid>,
    pub listing_id: Uuid,
    pub name: String,
    pub volume_ml: Option<i32>,
    pub sku: Option<String>,
    pub selling_price: Decimal,
    pub cost_price: Option<Decimal>,
    pub stock: i32,
    pub status: VariantStatus,
    pub availability: Availability,
    pub discount: Discount,
}

impl Variant {
    /// Ativa, vendável e (salvo pedido explícito) com estoque positivo.
    /// Com `include_out_of_stock`, variantes marcadas `out_of_stock` também
    /// entram; `discontinued` nunca.
    pub fn is_eligible(&self, include_out_of_stock: bool) -> bool {
        if self.status != VariantStatus::Active {
            return false;
        }
        if include_out_of_stock {
            return self.availability.is_sellable() || self.availability == Availability::OutOfStock;
        }
        self.availability.is_sellable() && self.stock > 0
    }

    /// A listing sem variantes vira uma variante única; o desconto fica só no
    /// nível da listing.
    pub fn synthetic_for(listing: &Listing, item: &CatalogItem) -> Self {
        Self {
            id: None,
            listing_id: listing.id,
            name: item
                .volume_ml
                .map(|ml| format!("{ml}ml"))
                .unwrap_or_else(|| "Unidade".to_string()),
            volume_ml: item.volume_ml,
            sku: None,
            selling_price: listing.selling_price,
            cost_price: listing.cost_price,
            stock: listing.stock_quantity,
            status: VariantStatus::Active,
            availability: listing.availability,
            discount: Discount::None,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Variant {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let discount_type: Option<DiscountType> = row.try_get("discount_type")?;
        Ok(Self {
            id: Some(row.try_get("id")?),
            listing_id: row.try_get("listing_id")?,
            name: row.try_get("name")?,
            volume_ml: row.try_get("volume_ml")?,
            sku: row.try_get("sku")?,
            selling_price: row.try_get("selling_price")?,
            cost_price: row.try_get("cost_price")?,
            stock: row.try_get("stock")?,
            status: row.try_get("status")?,
            availability: row.try_get("availability")?,
            discount: Discount::from_parts(
                discount_type,
                row.try_get("discount_value")?,
                row.try_get("discount_starts_at")?,
                row.try_get("discount_ends_at")?,
            ),
        })
    }
}

// Categoria / marca / subcategoria: só o necessário para a resolução de nomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Category,
    SubCategory,
    Brand,
}

impl ReferenceKind {
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Category => "categories",
            ReferenceKind::SubCategory => "sub_categories",
            ReferenceKind::Brand => "brands",
        }
    }
}
