// src/models/tenancy.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Enums de status (tipos nativos do Postgres)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "revenue_model", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RevenueModelKind {
    Markup,
    Commission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Cancelled,
    Expired,
}

// ---
// 2. Modelo de receita (fechado, sem campos opcionais soltos)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum RevenueModel {
    /// O tenant embute a margem no preço de venda no momento da escrita.
    Markup { percentage: Decimal },
    /// A plataforma soma a comissão por cima do preço líquido do tenant.
    Commission { percentage: Decimal },
}

impl RevenueModel {
    pub fn from_parts(kind: RevenueModelKind, markup: Decimal, commission: Decimal) -> Self {
        match kind {
            RevenueModelKind::Markup => RevenueModel::Markup { percentage: markup },
            RevenueModelKind::Commission => RevenueModel::Commission {
                percentage: commission,
            },
        }
    }

    pub fn kind(&self) -> RevenueModelKind {
        match self {
            RevenueModel::Markup { .. } => RevenueModelKind::Markup,
            RevenueModel::Commission { .. } => RevenueModelKind::Commission,
        }
    }
}

// ---
// 3. Tenant (o "Vendedor")
// ---
// Só os campos que a busca precisa. Lido sempre junto com a listing
// (colunas com prefixo `tenant_` no SELECT).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub revenue_model: RevenueModel,
    pub currency: String,
    pub approval_status: ApprovalStatus,
    pub subscription_status: SubscriptionStatus,
}

impl Tenant {
    /// Aprovado e com assinatura ativa (ou em trial).
    pub fn is_in_good_standing(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved
            && matches!(
                self.subscription_status,
                SubscriptionStatus::Active | SubscriptionStatus::Trialing
            )
    }
}

impl<'r> FromRow<'r, PgRow> for Tenant {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let kind: RevenueModelKind = row.try_get("tenant_revenue_model")?;
        let markup: Option<Decimal> = row.try_get("tenant_markup_percentage")?;
        let commission: Option<Decimal> = row.try_get("tenant_commission_percentage")?;

        Ok(Self {
            id: row.try_get("tenant_id")?,
            name: row.try_get("tenant_name")?,
            revenue_model: RevenueModel::from_parts(
                kind,
                markup.unwrap_or(Decimal::ZERO),
                commission.unwrap_or(Decimal::ZERO),
            ),
            currency: row.try_get("tenant_currency")?,
            approval_status: row.try_get("tenant_approval_status")?,
            subscription_status: row.try_get("tenant_subscription_status")?,
        })
    }
}
