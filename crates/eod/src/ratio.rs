//! Split ratio reduction.

use minuteup_core::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Greatest common divisor of two fixed-point values (Euclid).
///
/// `gcd(a, 0) == a`.
pub fn gcd(mut a: Decimal, mut b: Decimal) -> Decimal {
    while !b.is_zero() {
        let remainder = a % b;
        a = b;
        b = remainder;
    }
    a
}

fn to_shares(value: Decimal) -> Result<i64> {
    value
        .trunc()
        .to_i64()
        .ok_or_else(|| Error::conversion(format!("share count {value} does not fit in i64")))
}

/// Reduce `old:new` to smallest integer terms.
///
/// A 1.0 → 0.5 ratio change becomes `(2, 1)`.
pub fn reduce_split(old: Decimal, new: Decimal) -> Result<(i64, i64)> {
    let divisor = gcd(old, new);
    if divisor.is_zero() {
        return Err(Error::conversion(format!("cannot reduce split ratio {old}/{new}")));
    }
    let old_shares = old.checked_div(divisor).ok_or_else(|| Error::conversion("split ratio overflow"))?;
    let new_shares = new.checked_div(divisor).ok_or_else(|| Error::conversion("split ratio overflow"))?;
    Ok((to_shares(old_shares)?, to_shares(new_shares)?))
}
