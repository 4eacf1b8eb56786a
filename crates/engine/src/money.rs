//! Money calculator.
//!
//! Turns line items and a tax rate into subtotal/tax/total using decimal
//! fixed-point arithmetic. Every monetary value leaving this module has
//! exactly two decimals, so a stored invoice can be recomputed from its
//! stored lines and land on the same numbers.
//!
//! # Examples
//!
//! ```rust
//! use engine::money::{LineItemInput, calculate_totals, format_money};
//!
//! let totals = calculate_totals(&[LineItemInput::new("Consulting", "7", "300.00")], "10").unwrap();
//! assert_eq!(format_money(totals.subtotal), "2100.00");
//! assert_eq!(format_money(totals.tax), "210.00");
//! assert_eq!(format_money(totals.total), "2310.00");
//! ```

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{EngineError, ResultEngine};

/// Number of decimals kept for every stored amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest subtotal or total an invoice may carry.
pub fn max_amount() -> Decimal {
    Decimal::from(100_000_000_i64)
}

/// Tolerance used when the caller does not configure one (0.02).
pub fn default_total_tolerance() -> Decimal {
    Decimal::new(2, 2)
}

/// A line item as received from a caller.
///
/// Quantity and price are kept as text so that non-numeric input is a
/// validation failure of the calculator rather than a decoding failure
/// somewhere upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
}

impl LineItemInput {
    pub fn new(
        description: impl Into<String>,
        quantity: impl ToString,
        unit_price: impl ToString,
    ) -> Self {
        Self {
            description: description.into(),
            quantity: quantity.to_string(),
            unit_price: unit_price.to_string(),
        }
    }
}

/// A validated line item with its computed amount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricedLine {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

/// Output of [`calculate_totals`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub lines: Vec<PricedLine>,
}

/// Round half away from zero and pin the scale to two decimals.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Render an amount with exactly two decimals (`2310.00`).
pub fn format_money(value: Decimal) -> String {
    round_money(value).to_string()
}

/// Parse a decimal from caller or storage text.
pub fn parse_decimal(value: &str, label: &str) -> ResultEngine<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} is required")));
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| EngineError::Validation(format!("{label} must be numeric, got '{trimmed}'")))
}

/// Parse and range-check a tax rate percentage (`0..=100`).
pub fn parse_tax_rate(value: &str) -> ResultEngine<Decimal> {
    let rate = parse_decimal(value, "tax rate")?;
    if rate.is_sign_negative() && !rate.is_zero() || rate > Decimal::ONE_HUNDRED {
        return Err(EngineError::Validation(format!(
            "tax rate must be between 0 and 100, got {rate}"
        )));
    }
    Ok(round_money(rate))
}

fn price_line(index: usize, item: &LineItemInput) -> ResultEngine<PricedLine> {
    let position = index + 1;
    let description = item.description.trim();
    if description.is_empty() {
        return Err(EngineError::Validation(format!(
            "line item {position}: description must not be empty"
        )));
    }

    let quantity = round_money(parse_decimal(
        &item.quantity,
        &format!("line item {position}: quantity"),
    )?);
    if quantity <= Decimal::ZERO {
        return Err(EngineError::Validation(format!(
            "line item {position}: quantity must be > 0"
        )));
    }

    let unit_price = round_money(parse_decimal(
        &item.unit_price,
        &format!("line item {position}: price"),
    )?);
    if unit_price.is_sign_negative() && !unit_price.is_zero() {
        return Err(EngineError::Validation(format!(
            "line item {position}: price must be >= 0"
        )));
    }

    let amount = quantity
        .checked_mul(unit_price)
        .map(round_money)
        .ok_or_else(|| {
            EngineError::Validation(format!("line item {position}: amount too large"))
        })?;

    Ok(PricedLine {
        description: description.to_string(),
        quantity,
        unit_price,
        amount,
    })
}

/// Compute subtotal, tax and total for a set of line items.
///
/// Fails with [`EngineError::Validation`] if the list is empty, an item is
/// non-numeric, has a non-positive quantity or a negative price, the tax
/// rate is outside `0..=100`, or the result exceeds [`max_amount`].
pub fn calculate_totals(items: &[LineItemInput], tax_rate: &str) -> ResultEngine<Totals> {
    if items.is_empty() {
        return Err(EngineError::Validation(
            "at least one line item is required".to_string(),
        ));
    }
    let tax_rate = parse_tax_rate(tax_rate)?;

    let lines = items
        .iter()
        .enumerate()
        .map(|(index, item)| price_line(index, item))
        .collect::<ResultEngine<Vec<_>>>()?;

    let too_large = || {
        EngineError::Validation(format!("invoice total exceeds {}", format_money(max_amount())))
    };
    let subtotal = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.amount))
        .ok_or_else(too_large)?;
    if subtotal > max_amount() {
        return Err(too_large());
    }

    let tax = round_money(subtotal * tax_rate / Decimal::ONE_HUNDRED);
    let total = round_money(subtotal + tax);
    if total > max_amount() {
        return Err(too_large());
    }

    Ok(Totals {
        subtotal: round_money(subtotal),
        tax_rate,
        tax,
        total,
        lines,
    })
}

/// Reject a caller supplied total that differs from the server one by more
/// than 0.02. The server total is always the one persisted.
pub fn validate_total_match(server_total: Decimal, client_total: Decimal) -> ResultEngine<()> {
    validate_total_match_with(server_total, client_total, default_total_tolerance())
}

/// Like [`validate_total_match`] with an explicit tolerance.
pub fn validate_total_match_with(
    server_total: Decimal,
    client_total: Decimal,
    tolerance: Decimal,
) -> ResultEngine<()> {
    let difference = (server_total - client_total).abs();
    if difference > tolerance {
        return Err(EngineError::TotalMismatch(format!(
            "computed total {} differs from submitted total {} by {}",
            format_money(server_total),
            format_money(client_total),
            format_money(difference)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn computes_reference_example() {
        let totals = calculate_totals(&[LineItemInput::new("Design", 7, "300.00")], "10").unwrap();
        assert_eq!(format_money(totals.subtotal), "2100.00");
        assert_eq!(format_money(totals.tax), "210.00");
        assert_eq!(format_money(totals.total), "2310.00");
        assert_eq!(format_money(totals.lines[0].amount), "2100.00");
    }

    #[test]
    fn is_idempotent() {
        let items = vec![
            LineItemInput::new("Hours", "3.5", "49.99"),
            LineItemInput::new("Licence", "1", "0.10"),
        ];
        let first = calculate_totals(&items, "19").unwrap();
        let second = calculate_totals(&items, "19").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn total_is_subtotal_plus_rounded_tax() {
        let items = vec![
            LineItemInput::new("A", "1", "0.05"),
            LineItemInput::new("B", "3", "33.33"),
            LineItemInput::new("C", "0.5", "0.01"),
        ];
        for rate in ["0", "7", "7.5", "19", "21", "100"] {
            let totals = calculate_totals(&items, rate).unwrap();
            let expected_tax = round_money(totals.subtotal * dec(rate) / Decimal::ONE_HUNDRED);
            assert_eq!(totals.tax, expected_tax, "rate {rate}");
            assert_eq!(totals.total, totals.subtotal + totals.tax, "rate {rate}");
            assert_eq!(totals.total.scale(), 2);
        }
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 0.5 * 0.01 = 0.005 -> 0.01
        let totals = calculate_totals(&[LineItemInput::new("Tiny", "0.5", "0.01")], "0").unwrap();
        assert_eq!(format_money(totals.subtotal), "0.01");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            calculate_totals(&[], "10"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            calculate_totals(&[LineItemInput::new("X", "abc", "1")], "10"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            calculate_totals(&[LineItemInput::new("X", "0", "1")], "10"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            calculate_totals(&[LineItemInput::new("X", "-1", "1")], "10"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            calculate_totals(&[LineItemInput::new("X", "1", "-0.01")], "10"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            calculate_totals(&[LineItemInput::new("X", "1", "1")], "100.01"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            calculate_totals(&[LineItemInput::new("X", "1", "1")], "-1"),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn free_items_are_allowed() {
        let totals = calculate_totals(&[LineItemInput::new("Gift", "2", "0")], "20").unwrap();
        assert_eq!(format_money(totals.total), "0.00");
    }

    #[test]
    fn rejects_amounts_beyond_cap() {
        let result = calculate_totals(&[LineItemInput::new("Jet", "2", "60000000")], "0");
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn total_match_tolerance() {
        let x = dec("2310.00");
        assert!(validate_total_match(x, x).is_ok());
        assert!(validate_total_match(x, dec("2310.02")).is_ok());
        assert!(validate_total_match(x, dec("2309.98")).is_ok());
        assert!(matches!(
            validate_total_match(x, x + dec("0.03")),
            Err(EngineError::TotalMismatch(_))
        ));
        assert!(matches!(
            validate_total_match_with(x, dec("2310.02"), dec("0.01")),
            Err(EngineError::TotalMismatch(_))
        ));
    }

    #[test]
    fn format_pads_to_two_decimals() {
        assert_eq!(format_money(dec("5")), "5.00");
        assert_eq!(format_money(dec("5.1")), "5.10");
        assert_eq!(format_money(dec("5.125")), "5.13");
        assert_eq!(format_money(dec("-5.125")), "-5.13");
    }
}
