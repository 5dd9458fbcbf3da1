// src/models/discount.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "discount_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

// Janela de validade. Limite ausente = aberto daquele lado.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountWindow {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl DiscountWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let started = self.starts_at.map_or(true, |start| start <= now);
        let not_ended = self.ends_at.map_or(true, |end| now <= end);
        started && not_ended
    }
}

/// Desconto de listing ou de variante, já resolvido a partir das colunas
/// `discount_type / discount_value / discount_starts_at / discount_ends_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    #[default]
    None,
    Percentage { value: Decimal, window: DiscountWindow },
    Fixed { value: Decimal, window: DiscountWindow },
}

impl Discount {
    pub fn from_parts(
        kind: Option<DiscountType>,
        value: Option<Decimal>,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        let window = DiscountWindow { starts_at, ends_at };
        match (kind, value) {
            (Some(DiscountType::Percentage), Some(value)) => Discount::Percentage { value, window },
            (Some(DiscountType::Fixed), Some(value)) => Discount::Fixed { value, window },
            _ => Discount::None,
        }
    }

    pub fn kind(&self) -> Option<DiscountType> {
        match self {
            Discount::None => None,
            Discount::Percentage { .. } => Some(DiscountType::Percentage),
            Discount::Fixed { .. } => Some(DiscountType::Fixed),
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            Discount::None => Decimal::ZERO,
            Discount::Percentage { value, .. } | Discount::Fixed { value, .. } => *value,
        }
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Discount::None => None,
            Discount::Percentage { window, .. } | Discount::Fixed { window, .. } => window.ends_at,
        }
    }

    /// Ativo sse o valor é positivo e `now` está dentro da janela.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self {
            Discount::None => false,
            Discount::Percentage { value, window } | Discount::Fixed { value, window } => {
                *value > Decimal::ZERO && window.contains(now)
            }
        }
    }

    /// Aplica o desconto sem olhar a janela (quem chama já decidiu que está ativo).
    /// Nunca devolve preço negativo.
    pub fn apply(&self, price: Decimal) -> Decimal {
        let discounted = match self {
            Discount::None => price,
            Discount::Percentage { value, .. } => {
                price * (Decimal::ONE - *value / Decimal::ONE_HUNDRED)
            }
            Discount::Fixed { value, .. } => price - *value,
        };
        discounted.max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn window(start_offset_days: Option<i64>, end_offset_days: Option<i64>) -> (DateTime<Utc>, DiscountWindow) {
        let now = Utc::now();
        let window = DiscountWindow {
            starts_at: start_offset_days.map(|d| now + Duration::days(d)),
            ends_at: end_offset_days.map(|d| now + Duration::days(d)),
        };
        (now, window)
    }

    #[test]
    fn open_bounds_are_unbounded() {
        let (now, w) = window(None, None);
        assert!(w.contains(now));

        let (now, w) = window(Some(-1), None);
        assert!(w.contains(now));

        let (now, w) = window(None, Some(1));
        assert!(w.contains(now));
    }

    #[test]
    fn past_and_future_windows_are_inactive() {
        let (now, past) = window(Some(-10), Some(-1));
        let (_, future) = window(Some(1), Some(10));

        let d_past = Discount::Percentage { value: Decimal::from(20), window: past };
        let d_future = Discount::Fixed { value: Decimal::from(5), window: future };

        assert!(!d_past.is_active(now));
        assert!(!d_future.is_active(now));
    }

    #[test]
    fn zero_value_is_never_active() {
        let (now, w) = window(None, None);
        let d = Discount::Percentage { value: Decimal::ZERO, window: w };
        assert!(!d.is_active(now));
    }

    #[test]
    fn missing_type_or_value_means_no_discount() {
        assert_eq!(Discount::from_parts(None, Some(Decimal::TEN), None, None), Discount::None);
        assert_eq!(
            Discount::from_parts(Some(DiscountType::Fixed), None, None, None),
            Discount::None
        );
    }

    #[test]
    fn apply_floors_at_zero() {
        let w = DiscountWindow::default();
        let huge_fixed = Discount::Fixed { value: Decimal::from(500), window: w };
        let over_hundred = Discount::Percentage { value: Decimal::from(150), window: w };

        assert_eq!(huge_fixed.apply(Decimal::from(120)), Decimal::ZERO);
        assert_eq!(over_hundred.apply(Decimal::from(120)), Decimal::ZERO);
        assert_eq!(
            Discount::Percentage { value: Decimal::from(20), window: w }.apply(Decimal::from(132)),
            Decimal::new(10560, 2)
        );
    }
}
