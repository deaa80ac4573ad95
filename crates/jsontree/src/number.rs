//! Numeric payload of a JSON number node.
//!
//! The parser picks the narrowest representation that reproduces the
//! literal exactly: `Int` for 32-bit integers, `Long` for 64-bit ones,
//! `BigInt` beyond that, `Double` for short fractional/exponent literals
//! and `Decimal` (the literal text itself) for long ones.
//!
//! # Narrowing
//!
//! [`Number::as_i32`], [`Number::as_i16`] and [`Number::as_i8`] never fail.
//! Integral sources keep the low bits of their two's complement form (the
//! same result as an `as` cast between integer types); floating sources
//! saturate at the bounds of the target type and map NaN to zero (the same
//! result as an `as` cast from `f64`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

use crate::error::JsonError;

/// Literals with at least this many significant characters are kept as
/// [`Decimal`] instead of being rounded through `f64`.
pub const DOUBLE_DIGIT_LIMIT: usize = 17;

/// Integer literals with at least this many digits go straight to `BigInt`.
pub const LONG_DIGIT_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub enum Number {
    Int(i32),
    Long(i64),
    BigInt(BigInt),
    Double(f64),
    Decimal(Decimal),
}

impl Number {
    /// Builds the narrowest integer variant for `value`.
    pub fn from_i64(value: i64) -> Number {
        match i32::try_from(value) {
            Ok(small) => Number::Int(small),
            Err(_) => Number::Long(value),
        }
    }

    pub fn from_u64(value: u64) -> Number {
        match i64::try_from(value) {
            Ok(signed) => Number::from_i64(signed),
            Err(_) => Number::BigInt(BigInt::from(value)),
        }
    }

    pub fn from_bigint(value: BigInt) -> Number {
        match value.to_i64() {
            Some(signed) => Number::from_i64(signed),
            None => Number::BigInt(value),
        }
    }

    /// Converts a scanned literal. `digits` counts the integer and fraction
    /// digits (sign and exponent excluded); `fractional` is set when a `.`
    /// or an exponent was present.
    pub(crate) fn from_scanned(literal: &str, digits: usize, fractional: bool) -> Option<Number> {
        if fractional {
            if digits < DOUBLE_DIGIT_LIMIT {
                if let Ok(value) = literal.parse::<f64>() {
                    // Underflow to zero would lose a nonzero literal.
                    let underflow = value == 0.0 && !is_zero_literal(literal);
                    if value.is_finite() && !underflow {
                        return Some(Number::Double(value));
                    }
                }
            }
            return Some(Number::Decimal(Decimal {
                literal: literal.to_string(),
            }));
        }
        if digits < LONG_DIGIT_LIMIT {
            if let Ok(value) = literal.parse::<i64>() {
                return Some(Number::from_i64(value));
            }
        }
        BigInt::from_str(literal).ok().map(Number::BigInt)
    }

    pub fn is_integral(&self) -> bool {
        match self {
            Number::Int(_) | Number::Long(_) | Number::BigInt(_) => true,
            Number::Double(value) => value.is_finite() && value.fract() == 0.0,
            Number::Decimal(decimal) => decimal.is_integral(),
        }
    }

    /// True for the variants that store an integer exactly.
    pub fn is_integer_variant(&self) -> bool {
        matches!(self, Number::Int(_) | Number::Long(_) | Number::BigInt(_))
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(value) => f64::from(*value),
            Number::Long(value) => *value as f64,
            Number::BigInt(value) => value.to_f64().unwrap_or(f64::NAN),
            Number::Double(value) => *value,
            Number::Decimal(decimal) => decimal.as_f64(),
        }
    }

    pub fn as_f32(&self) -> f32 {
        self.as_f64() as f32
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Number::Int(value) => i64::from(*value),
            Number::Long(value) => *value,
            Number::BigInt(value) => low_bits(value),
            Number::Double(value) => *value as i64,
            Number::Decimal(decimal) => decimal.as_f64() as i64,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Number::Double(value) => *value as i32,
            Number::Decimal(decimal) => decimal.as_f64() as i32,
            integral => integral.as_i64() as i32,
        }
    }

    pub fn as_i16(&self) -> i16 {
        match self {
            Number::Double(value) => *value as i16,
            Number::Decimal(decimal) => decimal.as_f64() as i16,
            integral => integral.as_i64() as i16,
        }
    }

    pub fn as_i8(&self) -> i8 {
        match self {
            Number::Double(value) => *value as i8,
            Number::Decimal(decimal) => decimal.as_f64() as i8,
            integral => integral.as_i64() as i8,
        }
    }

    /// Exact integer value, for the integer variants only.
    pub fn as_bigint(&self) -> Option<BigInt> {
        match self {
            Number::Int(value) => Some(BigInt::from(*value)),
            Number::Long(value) => Some(BigInt::from(*value)),
            Number::BigInt(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn exact_i64(&self) -> Option<i64> {
        match self {
            Number::Int(value) => Some(i64::from(*value)),
            Number::Long(value) => Some(*value),
            _ => None,
        }
    }

    /// Total-enough ordering used by sorted merges: integers compare
    /// exactly, everything else through `f64` (NaN sorts as equal).
    pub fn compare(&self, other: &Number) -> Ordering {
        if let (Some(a), Some(b)) = (self.exact_i64(), other.exact_i64()) {
            return a.cmp(&b);
        }
        if let (Some(a), Some(b)) = (self.as_bigint(), other.as_bigint()) {
            return a.cmp(&b);
        }
        self.as_f64()
            .partial_cmp(&other.as_f64())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialEq for Number {
    /// Integers and decimals compare exactly; only a comparison involving a
    /// `Double` goes through `f64`.
    fn eq(&self, other: &Number) -> bool {
        if let (Some(a), Some(b)) = (self.exact_i64(), other.exact_i64()) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (self.as_bigint(), other.as_bigint()) {
            return a == b;
        }
        match (self, other) {
            (Number::Decimal(a), Number::Decimal(b)) => a == b,
            (Number::Decimal(decimal), integer) | (integer, Number::Decimal(decimal))
                if integer.is_integer_variant() =>
            {
                decimal.normalized() == Normalized::parse(&integer.to_string())
            }
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(value) => write!(f, "{value}"),
            Number::Long(value) => write!(f, "{value}"),
            Number::BigInt(value) => write!(f, "{value}"),
            Number::Double(value) => f.write_str(&format_double(*value)),
            Number::Decimal(decimal) => f.write_str(&decimal.literal),
        }
    }
}

/// Renders a double so that it reads back as a double: `1.0` rather than
/// `1`, exponent form for very large or small magnitudes. Non-finite
/// values have no JSON spelling and render as `null`.
pub fn format_double(value: f64) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    format!("{value:?}")
}

/// Low 64 bits of the two's complement form of `value`.
fn low_bits(value: &BigInt) -> i64 {
    let (sign, digits) = value.to_u64_digits();
    let magnitude = digits.first().copied().unwrap_or(0);
    let low = match sign {
        Sign::Minus => magnitude.wrapping_neg(),
        _ => magnitude,
    };
    low as i64
}

macro_rules! number_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Number {
            fn from(value: $ty) -> Self {
                Number::from_i64(i64::from(value))
            }
        })*
    };
}

number_from_signed!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number::from_u64(value)
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number::from_u64(value as u64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Double(value)
    }
}

impl From<f32> for Number {
    fn from(value: f32) -> Self {
        Number::Double(f64::from(value))
    }
}

impl From<BigInt> for Number {
    fn from(value: BigInt) -> Self {
        Number::from_bigint(value)
    }
}

impl From<Decimal> for Number {
    fn from(value: Decimal) -> Self {
        Number::Decimal(value)
    }
}

// ── Decimal ───────────────────────────────────────────────────────────────

/// Arbitrary-precision decimal kept as its (validated) JSON literal.
///
/// Equality is by value: `1.50` equals `15e-1`.
#[derive(Debug, Clone)]
pub struct Decimal {
    literal: String,
}

impl Decimal {
    pub fn as_str(&self) -> &str {
        &self.literal
    }

    pub fn as_f64(&self) -> f64 {
        self.literal.parse().unwrap_or(f64::NAN)
    }

    /// True when no digit survives to the right of the decimal point once
    /// the exponent is applied.
    pub fn is_integral(&self) -> bool {
        match self.normalized() {
            Some(n) => n.digits.is_empty() || n.point >= BigInt::from(n.digits.len()),
            None => false,
        }
    }

    fn normalized(&self) -> Option<Normalized> {
        Normalized::parse(&self.literal)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Decimal) -> bool {
        match (self.normalized(), other.normalized()) {
            (Some(a), Some(b)) => a == b,
            _ => self.literal == other.literal,
        }
    }
}

impl Eq for Decimal {}

/// A decimal value as `0.digits × 10^point`, with no leading or trailing
/// zeros in `digits`. Zero has no digits, no sign and a zero point.
#[derive(Debug, PartialEq, Eq)]
struct Normalized {
    negative: bool,
    digits: String,
    point: BigInt,
}

impl Normalized {
    /// `None` unless `literal` is a JSON number literal. The exponent is
    /// read as a `BigInt`, so no literal is out of range.
    fn parse(literal: &str) -> Option<Normalized> {
        if !is_number_literal(literal) {
            return None;
        }
        let (negative, body) = match literal.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, literal),
        };
        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(at) => {
                let exponent = &body[at + 1..];
                let exponent = exponent.strip_prefix('+').unwrap_or(exponent);
                (&body[..at], BigInt::from_str(exponent).ok()?)
            }
            None => (body, BigInt::from(0)),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let all: String = int_part.chars().chain(frac_part.chars()).collect();
        let significant = all.trim_start_matches('0');
        let leading = all.len() - significant.len();
        let digits = significant.trim_end_matches('0');
        if digits.is_empty() {
            return Some(Normalized {
                negative: false,
                digits: String::new(),
                point: BigInt::from(0),
            });
        }
        Some(Normalized {
            negative,
            digits: digits.to_string(),
            point: exponent + BigInt::from(int_part.len()) - BigInt::from(leading),
        })
    }
}

impl FromStr for Decimal {
    type Err = JsonError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if is_number_literal(text) {
            Ok(Decimal {
                literal: text.to_string(),
            })
        } else {
            Err(JsonError::MalformedInput {
                offset: 0,
                message: "not a JSON number literal".to_string(),
                excerpt: text.chars().take(20).collect(),
            })
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

/// True when every mantissa digit of `literal` is zero.
fn is_zero_literal(literal: &str) -> bool {
    literal
        .split(['e', 'E'])
        .next()
        .unwrap_or(literal)
        .bytes()
        .all(|b| !matches!(b, b'1'..=b'9'))
}

/// `-?digits(.digits)?([eE][+-]?digits)?`
fn is_number_literal(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut x = 0;
    let digits = |x: &mut usize| {
        let start = *x;
        while *x < bytes.len() && bytes[*x].is_ascii_digit() {
            *x += 1;
        }
        *x > start
    };
    if x < bytes.len() && bytes[x] == b'-' {
        x += 1;
    }
    if !digits(&mut x) {
        return false;
    }
    if x < bytes.len() && bytes[x] == b'.' {
        x += 1;
        if !digits(&mut x) {
            return false;
        }
    }
    if x < bytes.len() && (bytes[x] == b'e' || bytes[x] == b'E') {
        x += 1;
        if x < bytes.len() && (bytes[x] == b'+' || bytes[x] == b'-') {
            x += 1;
        }
        if !digits(&mut x) {
            return false;
        }
    }
    x == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(literal: &str) -> Number {
        let digits = literal
            .split(['e', 'E'])
            .next()
            .unwrap()
            .bytes()
            .filter(u8::is_ascii_digit)
            .count();
        let fractional = literal.contains(['.', 'e', 'E']);
        Number::from_scanned(literal, digits, fractional).unwrap()
    }

    #[test]
    fn integers_pick_the_narrowest_variant() {
        assert!(matches!(scan("42"), Number::Int(42)));
        assert!(matches!(scan("-2147483649"), Number::Long(-2147483649)));
        assert!(matches!(scan("9007199254740993"), Number::Long(9007199254740993)));
        assert!(matches!(scan("9223372036854775808"), Number::BigInt(_)));
        assert!(matches!(scan("123456789012345678901234"), Number::BigInt(_)));
    }

    #[test]
    fn fractions_switch_to_decimal_at_the_digit_limit() {
        assert!(matches!(scan("3.25"), Number::Double(_)));
        assert!(matches!(scan("1e3"), Number::Double(_)));
        let long = scan("3.14159265358979323846");
        assert!(matches!(long, Number::Decimal(_)));
        assert_eq!(long.to_string(), "3.14159265358979323846");
    }

    #[test]
    fn overflowing_doubles_are_kept_verbatim() {
        let huge = scan("1e400");
        assert!(matches!(huge, Number::Decimal(_)));
        assert_eq!(huge.to_string(), "1e400");
    }

    #[test]
    fn underflowing_doubles_are_kept_verbatim() {
        let tiny = scan("1e-99999999999999999999");
        assert!(matches!(tiny, Number::Decimal(_)));
        assert!(!tiny.is_integral());
        assert!(matches!(scan("0e-400"), Number::Double(_)));
        assert!(matches!(scan("-0.0"), Number::Double(_)));
    }

    #[test]
    fn doubles_print_as_doubles() {
        assert_eq!(Number::Double(1.0).to_string(), "1.0");
        assert_eq!(Number::Double(0.1).to_string(), "0.1");
        assert_eq!(Number::Double(f64::NAN).to_string(), "null");
    }

    #[test]
    fn equality_crosses_variants() {
        assert_eq!(Number::Int(1), Number::Long(1));
        assert_eq!(Number::Int(1), Number::Double(1.0));
        assert_ne!(Number::Int(1), Number::Double(1.5));
        assert_eq!(
            Number::BigInt(BigInt::from(5)),
            Number::Int(5),
        );
    }

    #[test]
    fn integral_sources_wrap_when_narrowed() {
        let n = Number::Long(i64::from(i32::MAX) + 1);
        assert_eq!(n.as_i32(), i32::MIN);
        assert_eq!(Number::Int(300).as_i8(), 44);
        assert_eq!(Number::Int(70000).as_i16(), 4464);
        let big = Number::BigInt(BigInt::from(u64::MAX) + 2u32);
        assert_eq!(big.as_i64(), 1);
        let negative = Number::BigInt(-(BigInt::from(u64::MAX) + 2u32));
        assert_eq!(negative.as_i64(), -1);
    }

    #[test]
    fn floating_sources_saturate_when_narrowed() {
        assert_eq!(Number::Double(1e12).as_i32(), i32::MAX);
        assert_eq!(Number::Double(-1e12).as_i8(), i8::MIN);
        assert_eq!(Number::Double(f64::NAN).as_i32(), 0);
        assert_eq!(Number::Double(2.9).as_i32(), 2);
    }

    #[test]
    fn decimal_integrality_follows_the_exponent() {
        let d = |s: &str| s.parse::<Decimal>().unwrap();
        assert!(d("12.000000000000000000").is_integral());
        assert!(!d("1.00000000000000000001").is_integral());
        assert!(d("1.5e1").is_integral());
        assert!(!d("15e-1").is_integral());
        assert!(d("0.0").is_integral());
    }

    #[test]
    fn integrality_survives_extreme_exponents() {
        let d = |s: &str| s.parse::<Decimal>().unwrap();
        assert!(d("1e9223372036854775807").is_integral());
        assert!(d("1e99999999999999999999").is_integral());
        assert!(!d("1e-9223372036854775808").is_integral());
        assert!(!d("1e-99999999999999999999").is_integral());
        assert!(d("0e-99999999999999999999").is_integral());
        assert!(Number::Decimal(d("-2.5E+99999999999999999999")).is_integral());
    }

    #[test]
    fn decimals_compare_exactly() {
        let d = |s: &str| Number::Decimal(s.parse::<Decimal>().unwrap());
        assert_ne!(d("1.00000000000000000001"), d("1.00000000000000000002"));
        assert_eq!(d("1.50000000000000000000"), d("15e-1"));
        assert_eq!(d("0.0"), d("-0e5"));
        assert_ne!(d("-1.5"), d("1.5"));
        assert_eq!(d("1.2345678901234567890e19"), Number::BigInt("12345678901234567890".parse().unwrap()));
        assert_eq!(d("100.000000000000000000"), Number::Int(100));
        assert_ne!(d("100.000000000000000001"), Number::Int(100));
    }

    #[test]
    fn decimal_rejects_non_json_literals() {
        assert!("1.".parse::<Decimal>().is_err());
        assert!("+1".parse::<Decimal>().is_err());
        assert!("NaN".parse::<Decimal>().is_err());
        assert!("-0.5e+7".parse::<Decimal>().is_ok());
    }
}
