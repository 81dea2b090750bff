//! Order money math.
//!
//! Every figure is a [`Decimal`] rounded to cents with the midpoint rounded
//! away from zero. The total is always derived from the already rounded
//! subtotal and shipping, so `total == round(subtotal + shipping, 2)` holds
//! exactly for every computed [`Amounts`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::models::{Amounts, LineItem, Shipping};

pub const CENTS: u32 = 2;

pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CENTS, RoundingStrategy::MidpointAwayFromZero)
}

/// Amounts recorded previously on the same order. Only `shipping` is
/// consulted, as the fee fallback when the shipping block carries none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorAmounts {
    pub subtotal: Option<Decimal>,
    pub shipping: Option<Decimal>,
    pub total: Option<Decimal>,
}

impl PriorAmounts {
    /// Reads whatever numeric fields a stored amounts document has.
    pub fn from_json(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(lenient::number_to_decimal);
        Self {
            subtotal: field("subtotal"),
            shipping: field("shipping"),
            total: field("total"),
        }
    }
}

/// Derives subtotal, shipping and total for a set of lines. Pure and
/// deterministic; negative inputs are not rejected here.
pub fn compute_amounts(
    items: &[LineItem],
    shipping: &Shipping,
    prior: Option<&PriorAmounts>,
) -> Amounts {
    let subtotal = items
        .iter()
        .map(line_total)
        .fold(Decimal::ZERO, |acc, line| acc.checked_add(line).unwrap_or(acc));

    let fee = shipping
        .fee
        .or_else(|| prior.and_then(|p| p.shipping))
        .unwrap_or(Decimal::ZERO);

    let subtotal = round_cents(subtotal);
    let shipping = round_cents(fee);
    let total = round_cents(subtotal.checked_add(shipping).unwrap_or(subtotal));

    Amounts {
        subtotal,
        shipping,
        total,
    }
}

/// `price * quantity`, or zero when the product does not fit a Decimal.
fn line_total(item: &LineItem) -> Decimal {
    item.unit_price
        .checked_mul(Decimal::from(item.quantity))
        .unwrap_or(Decimal::ZERO)
}

/// Reads a stored amounts document, returning `None` unless all three
/// figures are JSON numbers.
pub fn stored_amounts(value: Option<&Value>) -> Option<Amounts> {
    let value = value?;
    let number = |name: &str| match value.get(name) {
        Some(v) if v.is_number() => lenient::number_to_decimal(v),
        _ => None,
    };
    Some(Amounts {
        subtotal: number("subtotal")?,
        shipping: number("shipping")?,
        total: number("total")?,
    })
}

/// Coercing deserializers for order documents written by older clients.
pub mod lenient {
    use std::str::FromStr;

    use rust_decimal::{Decimal, prelude::FromPrimitive};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Numbers and numeric strings become decimals; anything else is `None`.
    pub fn number_to_decimal(value: &Value) -> Option<Decimal> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Decimal::from(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Decimal::from(u))
                } else {
                    n.as_f64().and_then(Decimal::from_f64)
                }
            }
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    pub fn decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(number_to_decimal(&value).unwrap_or(Decimal::ZERO))
    }

    pub fn optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(number_to_decimal(&value))
    }

    /// Text fields of old documents: numbers and booleans are rendered,
    /// anything else becomes empty.
    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value_to_string(value).unwrap_or_default())
    }

    pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value_to_string(value))
    }

    fn value_to_string(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Whole quantities only; fractional, missing or garbage values count as 0.
    pub fn quantity<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let quantity = match &value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        Ok(quantity.unwrap_or(0))
    }
}
