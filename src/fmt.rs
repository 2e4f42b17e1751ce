use rust_decimal::{Decimal, RoundingStrategy};

/// Dollar amount with thousands separators, rounded half away from zero to
/// cents: $1,234.56
pub fn money(val: Decimal) -> String {
    let cents = val
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let dollars = cents.trunc();
    let fraction = ((cents - dollars) * Decimal::ONE_HUNDRED).trunc().normalize();

    let digits = dollars.normalize().to_string();
    let groups: Vec<&str> = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect();

    let sign = if val.is_sign_negative() && !cents.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${}.{:0>2}", groups.join(","), fraction.to_string())
}
