//! Price reconciliation
//!
//! The original price always comes from the first variant. A special-price
//! block, when present and non-empty, supplies the current price (falling
//! back to the item's top-level price). The current price never exceeds the
//! original one.

use crate::catalog::payload::DetailPayload;
use crate::catalog::PriceData;
use crate::NormalizationError;

/// Builds the price block for an item whose original price is already known
pub fn resolve_price(
    payload: &DetailPayload,
    original: f64,
    item: &str,
) -> Result<PriceData, NormalizationError> {
    check_price(original, item)?;

    let special = payload
        .special_price
        .as_ref()
        .filter(|block| !block.is_empty())
        .and_then(|block| block.price.or(payload.price));

    let current = match special {
        Some(price) => {
            check_price(price, item)?;
            price.min(original)
        }
        None => original,
    };

    let sale_tag = if current < original {
        format!("Скидка {}%", discount_percent(current, original))
    } else {
        String::new()
    };

    Ok(PriceData {
        current,
        original,
        sale_tag,
    })
}

/// Whole-number discount percentage, rounded half to even
///
/// The raw ratio is snapped to 6 decimal places first so that values like
/// 12.499999999 or 12.500000001 produced by binary floating point land on
/// the intended tie.
pub fn discount_percent(current: f64, original: f64) -> i64 {
    let raw = (1.0 - current / original) * 100.0;
    let snapped = (raw * 1e6).round() / 1e6;
    snapped.round_ties_even() as i64
}

fn check_price(value: f64, item: &str) -> Result<(), NormalizationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(NormalizationError::InvalidPrice {
            item: item.to_string(),
            value,
        });
    }
    Ok(())
}
