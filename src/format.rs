use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::DisplayConfig;

fn group_int_digits(int_part: &str, separator: &str) -> String {
    if separator.is_empty() {
        return int_part.to_string();
    }
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3 * separator.len());
    let len = int_part.chars().count();
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push_str(separator);
        }
    }
    out
}

/// Format a local-currency amount for the console report, e.g. `$1.234.567`.
///
/// The value is rounded half away from zero to `currency_decimals` places and
/// always rendered with exactly that many decimals.
pub fn format_amount(value: Decimal, display: &DisplayConfig) -> String {
    let dp = display.currency_decimals;
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);

    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let abs = rounded.abs().normalize().to_string();

    let (int_part, frac_part) = match abs.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (abs, String::new()),
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&display.currency_symbol);
    out.push_str(&group_int_digits(&int_part, &display.grouping_separator));
    if dp > 0 {
        out.push_str(&display.decimal_separator);
        let mut frac: String = frac_part.chars().take(dp as usize).collect();
        while frac.len() < dp as usize {
            frac.push('0');
        }
        out.push_str(&frac);
    }
    out
}

/// Format a USD exchange rate, keeping two decimals.
pub fn format_rate(value: Decimal) -> String {
    value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_string()
}
