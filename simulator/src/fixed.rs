// fixed.rs — Signed fixed-point values with exact width growth
//
// A `Fixed` pairs raw two's-complement bits, held in an arbitrary-precision
// `BigInt`, with a `Format` (integer bits, fraction bits). Multiplication,
// addition, subtraction and negation grow the format so that every result is
// exact; `resize` is the only operation that can lose precision or range.
//
// Preconditions: none.
// Postconditions: arithmetic results are exact at any width; `resize` rounds
//                 half to even and saturates.
// Failure modes: `Format::new` rejects empty formats and declarations wider
//                than `MAX_WIDTH`. Derived formats are not limited.
// Side effects: none.

use std::cmp::max;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{FromPrimitive, One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Format ──────────────────────────────────────────────────────────────────

/// Error raised when a declared fixed-point format is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("sfixed({int_bits}, {frac_bits}) has no bits")]
    Empty { int_bits: u32, frac_bits: u32 },

    #[error(
        "sfixed({int_bits}, {frac_bits}) is {width} bits wide; declared formats are at most {max} bits",
        max = Format::MAX_WIDTH
    )]
    TooWide {
        int_bits: u32,
        frac_bits: u32,
        width: u64,
    },
}

/// Signed fixed-point format: `int_bits` (sign bit included) and `frac_bits`.
///
/// A format of width `w = int_bits + frac_bits` stores values in
/// `[-2^(int_bits-1), 2^(int_bits-1) - 2^-frac_bits]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FormatSpec", into = "FormatSpec")]
pub struct Format {
    int_bits: u32,
    frac_bits: u32,
}

/// Unvalidated serde representation of a [`Format`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct FormatSpec {
    int_bits: u32,
    frac_bits: u32,
}

impl TryFrom<FormatSpec> for Format {
    type Error = FormatError;

    fn try_from(spec: FormatSpec) -> Result<Self, Self::Error> {
        Format::new(spec.int_bits, spec.frac_bits)
    }
}

impl From<Format> for FormatSpec {
    fn from(format: Format) -> Self {
        FormatSpec {
            int_bits: format.int_bits,
            frac_bits: format.frac_bits,
        }
    }
}

impl Format {
    /// Widest format accepted from a declaration. Growth may exceed it.
    pub const MAX_WIDTH: u32 = 1 << 16;

    pub fn new(int_bits: u32, frac_bits: u32) -> Result<Self, FormatError> {
        let width = u64::from(int_bits) + u64::from(frac_bits);
        if width == 0 {
            return Err(FormatError::Empty {
                int_bits,
                frac_bits,
            });
        }
        if width > u64::from(Self::MAX_WIDTH) {
            return Err(FormatError::TooWide {
                int_bits,
                frac_bits,
                width,
            });
        }
        Ok(Format {
            int_bits,
            frac_bits,
        })
    }

    pub const fn int_bits(self) -> u32 {
        self.int_bits
    }

    pub const fn frac_bits(self) -> u32 {
        self.frac_bits
    }

    pub const fn width(self) -> u32 {
        self.int_bits + self.frac_bits
    }

    /// Format of the exact product of values in `self` and `rhs`.
    pub fn product(self, rhs: Format) -> Format {
        Format {
            int_bits: self.int_bits + rhs.int_bits,
            frac_bits: self.frac_bits + rhs.frac_bits,
        }
    }

    /// Format of the exact sum (or difference) of values in `self` and `rhs`.
    pub fn sum(self, rhs: Format) -> Format {
        Format {
            int_bits: max(self.int_bits, rhs.int_bits) + 1,
            frac_bits: max(self.frac_bits, rhs.frac_bits),
        }
    }

    /// Format of the exact negation of a value in `self`.
    pub fn negated(self) -> Format {
        Format {
            int_bits: self.int_bits + 1,
            frac_bits: self.frac_bits,
        }
    }

    /// True when every value of `other` is exactly representable in `self`.
    pub fn contains(self, other: Format) -> bool {
        self.int_bits >= other.int_bits && self.frac_bits >= other.frac_bits
    }

    /// Weight of the least significant bit.
    pub fn resolution(self) -> f64 {
        pow2(-(self.frac_bits as i32))
    }

    pub fn min_value(self) -> f64 {
        -pow2(self.int_bits as i32 - 1)
    }

    pub fn max_value(self) -> f64 {
        pow2(self.int_bits as i32 - 1) - self.resolution()
    }

    pub(crate) fn raw_min(self) -> BigInt {
        -(BigInt::one() << (self.width() - 1))
    }

    pub(crate) fn raw_max(self) -> BigInt {
        (BigInt::one() << (self.width() - 1)) - 1u32
    }

    fn modulus(self) -> BigInt {
        BigInt::one() << self.width()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("sfixed({}, {})", self.int_bits, self.frac_bits))
    }
}

// ── Fixed ───────────────────────────────────────────────────────────────────

/// A signed fixed-point value: `raw × 2^-frac_bits` in `format`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fixed {
    raw: BigInt,
    format: Format,
}

impl Fixed {
    pub fn zero(format: Format) -> Self {
        Fixed {
            raw: BigInt::zero(),
            format,
        }
    }

    /// Build a value from raw bits, or `None` when `raw` is outside `format`.
    pub fn from_raw(format: Format, raw: impl Into<BigInt>) -> Option<Self> {
        let raw = raw.into();
        (format.raw_min() <= raw && raw <= format.raw_max()).then_some(Fixed { raw, format })
    }

    /// Interpret the low `format.width()` bits of `bits` as a two's-complement value.
    pub fn from_bits(format: Format, bits: &BigUint) -> Self {
        let mask = (BigUint::one() << format.width()) - 1u32;
        let mut raw = BigInt::from(bits & mask);
        if raw > format.raw_max() {
            raw -= format.modulus();
        }
        Fixed { raw, format }
    }

    /// Quantize a real number: round half to even, then saturate.
    pub fn from_f64(value: f64, format: Format) -> Self {
        let scaled = (value * pow2(format.frac_bits as i32)).round_ties_even();
        let raw = match BigInt::from_f64(scaled) {
            Some(raw) => raw.clamp(format.raw_min(), format.raw_max()),
            None if scaled.is_nan() => BigInt::zero(),
            None if scaled < 0.0 => format.raw_min(),
            None => format.raw_max(),
        };
        Fixed { raw, format }
    }

    pub fn raw(&self) -> &BigInt {
        &self.raw
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Unsigned bit pattern as it appears on a port of this format.
    pub fn to_bits(&self) -> BigUint {
        let wrapped = if self.raw.sign() == Sign::Minus {
            &self.raw + self.format.modulus()
        } else {
            self.raw.clone()
        };
        wrapped.magnitude().clone()
    }

    pub fn to_f64(&self) -> f64 {
        self.raw.to_f64().unwrap_or(f64::NAN) * self.format.resolution()
    }

    /// Narrow (or widen) to `target`.
    ///
    /// Dropped fraction bits are rounded half to even; values outside the
    /// target range saturate to its nearest bound.
    pub fn resize(&self, target: Format) -> Fixed {
        let (raw, up) = if target.frac_bits < self.format.frac_bits {
            (
                round_half_even(&self.raw, self.format.frac_bits - target.frac_bits),
                0,
            )
        } else {
            (self.raw.clone(), target.frac_bits - self.format.frac_bits)
        };

        let raw = if significant_bits(&raw) + u64::from(up) <= u64::from(target.width()) {
            raw << up
        } else if raw.sign() == Sign::Minus {
            target.raw_min()
        } else {
            target.raw_max()
        };

        Fixed {
            raw,
            format: target,
        }
    }

    fn aligned(&self, frac_bits: u32) -> BigInt {
        &self.raw << (frac_bits - self.format.frac_bits)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

impl Mul for &Fixed {
    type Output = Fixed;

    fn mul(self, rhs: &Fixed) -> Fixed {
        Fixed {
            raw: &self.raw * &rhs.raw,
            format: self.format.product(rhs.format),
        }
    }
}

impl Add for &Fixed {
    type Output = Fixed;

    fn add(self, rhs: &Fixed) -> Fixed {
        let format = self.format.sum(rhs.format);
        Fixed {
            raw: self.aligned(format.frac_bits) + rhs.aligned(format.frac_bits),
            format,
        }
    }
}

impl Sub for &Fixed {
    type Output = Fixed;

    fn sub(self, rhs: &Fixed) -> Fixed {
        let format = self.format.sum(rhs.format);
        Fixed {
            raw: self.aligned(format.frac_bits) - rhs.aligned(format.frac_bits),
            format,
        }
    }
}

impl Neg for &Fixed {
    type Output = Fixed;

    fn neg(self) -> Fixed {
        Fixed {
            raw: -&self.raw,
            format: self.format.negated(),
        }
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    fn neg(self) -> Fixed {
        -&self
    }
}

macro_rules! forward_owned_binop {
    ($($tr:ident :: $method:ident),*) => {$(
        impl $tr for Fixed {
            type Output = Fixed;

            fn $method(self, rhs: Fixed) -> Fixed {
                (&self).$method(&rhs)
            }
        }
    )*};
}

forward_owned_binop!(Mul::mul, Add::add, Sub::sub);

// ── Helpers ─────────────────────────────────────────────────────────────────

fn pow2(exp: i32) -> f64 {
    2f64.powi(exp)
}

/// Minimal two's-complement width of `raw` (1 for 0 and -1).
fn significant_bits(raw: &BigInt) -> u64 {
    let magnitude = if raw.sign() == Sign::Minus {
        -raw - 1u32
    } else {
        raw.clone()
    };
    magnitude.bits() + 1
}

/// Divide by `2^shift` (`shift >= 1`), rounding to nearest with ties to even.
fn round_half_even(raw: &BigInt, shift: u32) -> BigInt {
    // `>>` on a negative BigInt rounds toward negative infinity.
    let floor = raw >> shift;
    let rem = raw - (&floor << shift);
    let half = BigInt::one() << (shift - 1);
    let odd = (&floor & BigInt::one()).is_one();
    if rem > half || (rem == half && odd) {
        floor + 1u32
    } else {
        floor
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(i: u32, f: u32) -> Format {
        Format::new(i, f).unwrap()
    }

    fn val(x: f64, i: u32, f: u32) -> Fixed {
        Fixed::from_f64(x, fmt(i, f))
    }

    // ── Format ──

    #[test]
    fn format_rejects_empty_and_oversized_declarations() {
        assert!(matches!(Format::new(0, 0), Err(FormatError::Empty { .. })));
        assert!(matches!(
            Format::new(Format::MAX_WIDTH, 1),
            Err(FormatError::TooWide { .. })
        ));
        assert_eq!(fmt(64, 64).width(), 128);
        assert_eq!(fmt(100, 100).width(), 200);
    }

    #[test]
    fn format_range() {
        let f = fmt(4, 4);
        assert_eq!(f.min_value(), -8.0);
        assert_eq!(f.max_value(), 8.0 - 0.0625);
        assert_eq!(f.resolution(), 0.0625);
        assert_eq!(fmt(0, 4).min_value(), -0.5);
    }

    #[test]
    fn growth_rules() {
        let a = fmt(4, 4);
        let b = fmt(6, 2);
        assert_eq!(a.product(b), fmt(10, 6));
        assert_eq!(a.sum(b), fmt(7, 4));
        assert_eq!(a.negated(), fmt(5, 4));
        // Derived formats are not bounded by MAX_WIDTH.
        let wide = fmt(40000, 0).product(fmt(40000, 0));
        assert_eq!(wide.width(), 80000);
    }

    #[test]
    fn format_display() {
        assert_eq!(fmt(4, 12).to_string(), "sfixed(4, 12)");
    }

    #[test]
    fn format_serde_validates() {
        let ok: Format = serde_json::from_str(r#"{"int_bits":4,"frac_bits":4}"#).unwrap();
        assert_eq!(ok, fmt(4, 4));
        let bad = serde_json::from_str::<Format>(r#"{"int_bits":0,"frac_bits":0}"#);
        assert!(bad.is_err());
    }

    // ── Arithmetic ──

    #[test]
    fn product_is_exact() {
        let p = val(1.5, 4, 4) * val(2.0, 4, 4);
        assert_eq!(p.format(), fmt(8, 8));
        assert_eq!(p.to_f64(), 3.0);
    }

    #[test]
    fn sum_aligns_fraction_bits() {
        let s = val(0.25, 4, 2) + val(-1.125, 3, 3);
        assert_eq!(s.format(), fmt(5, 3));
        assert_eq!(s.to_f64(), -0.875);
    }

    #[test]
    fn difference_and_negation() {
        let d = val(0.25, 4, 4) - val(4.5, 4, 4);
        assert_eq!(d.to_f64(), -4.25);
        let n = -val(-8.0, 4, 4);
        assert_eq!(n.format(), fmt(5, 4));
        assert_eq!(n.to_f64(), 8.0);
    }

    #[test]
    fn product_past_128_bits_does_not_wrap() {
        let f = fmt(64, 63);
        let raw = (1i128 << 126) - 1;
        let a = Fixed::from_raw(f, raw).unwrap();
        let p = &a * &a;
        assert_eq!(p.format(), fmt(128, 126));
        assert_eq!(*p.raw(), BigInt::from(raw) * BigInt::from(raw));
        assert!(p.raw().sign() == Sign::Plus);

        let lo = Fixed::from_raw(f, -(1i128 << 126)).unwrap();
        let q = &lo * &lo;
        assert_eq!(*q.raw(), BigInt::one() << 252u32);
        assert_eq!((-&q).raw().sign(), Sign::Minus);
    }

    #[test]
    fn wide_sum_carries_into_the_extra_bit() {
        let f = fmt(100, 0);
        let top = Fixed::from_raw(f, f.raw_max()).unwrap();
        let s = &top + &top;
        assert_eq!(s.format(), fmt(101, 0));
        assert_eq!(*s.raw(), f.raw_max() * 2u32);
        assert_eq!(s.resize(f), top);
    }

    // ── Narrowing ──

    #[test]
    fn resize_rounds_half_to_even() {
        let target = fmt(4, 1);
        // 0.25 -> tie between 0.0 and 0.5 -> even (0.0)
        assert_eq!(val(0.25, 4, 2).resize(target).to_f64(), 0.0);
        // 0.75 -> tie between 0.5 and 1.0 -> even (1.0)
        assert_eq!(val(0.75, 4, 2).resize(target).to_f64(), 1.0);
        // -0.75 -> tie between -1.0 and -0.5 -> even (-1.0)
        assert_eq!(val(-0.75, 4, 2).resize(target).to_f64(), -1.0);
        // 0.625 -> nearest is 0.5
        assert_eq!(val(0.625, 4, 3).resize(target).to_f64(), 0.5);
    }

    #[test]
    fn resize_saturates() {
        let wide = val(100.0, 9, 2);
        assert_eq!(wide.resize(fmt(4, 4)).to_f64(), 8.0 - 0.0625);
        let neg = val(-100.0, 9, 2);
        assert_eq!(neg.resize(fmt(4, 4)).to_f64(), -8.0);
    }

    #[test]
    fn resize_rounding_can_saturate() {
        // 7.96875 rounds up to 8.0, which does not fit sfixed(4, 1).
        let v = val(7.96875, 5, 5);
        assert_eq!(v.resize(fmt(4, 1)).to_f64(), 7.5);
    }

    #[test]
    fn resize_widening_is_exact() {
        let v = val(-3.25, 4, 2);
        let w = v.resize(fmt(12, 20));
        assert_eq!(w.to_f64(), -3.25);
        assert_eq!(*w.raw(), BigInt::from(-13i64 << 18));
    }

    #[test]
    fn resize_of_wide_values() {
        let v = Fixed::from_raw(fmt(1, 200), -1).unwrap();
        assert!(v.resize(fmt(1, 0)).is_zero());
        let big = Fixed::from_raw(fmt(200, 0), fmt(200, 0).raw_max()).unwrap();
        assert_eq!(*big.resize(fmt(8, 0)).raw(), BigInt::from(127));
        // Tie at bit 150 of a 192-bit value: rounds to the even neighbor.
        let half = BigInt::one() << 149u32;
        let tie = Fixed::from_raw(fmt(42, 150), (BigInt::from(3) << 150u32) + half).unwrap();
        assert_eq!(*tie.resize(fmt(42, 0)).raw(), BigInt::from(4));
    }

    // ── Conversions ──

    #[test]
    fn bits_round_trip_sign_extends() {
        let f = fmt(4, 4);
        let v = val(-1.5, 4, 4);
        assert_eq!(v.to_bits(), BigUint::from(0xE8u32));
        assert_eq!(Fixed::from_bits(f, &BigUint::from(0xE8u32)), v);
        assert_eq!(Fixed::from_bits(f, &BigUint::from(0x1E8u32)), v);
    }

    #[test]
    fn from_f64_saturates_and_rounds() {
        assert_eq!(val(1000.0, 4, 4).to_f64(), 7.9375);
        assert_eq!(val(0.03125, 4, 4).to_f64(), 0.0);
        assert_eq!(val(0.09375, 4, 4).to_f64(), 0.125);
        assert!(val(f64::NAN, 4, 4).is_zero());
        assert_eq!(val(f64::NEG_INFINITY, 4, 4).to_f64(), -8.0);
    }

    #[test]
    fn from_raw_checks_range() {
        assert!(Fixed::from_raw(fmt(4, 0), 7).is_some());
        assert!(Fixed::from_raw(fmt(4, 0), 8).is_none());
        assert!(Fixed::from_raw(fmt(4, 0), -8).is_some());
    }

    #[test]
    fn significant_bits_of_edges() {
        let bits = |v: i64| significant_bits(&BigInt::from(v));
        assert_eq!(bits(0), 1);
        assert_eq!(bits(-1), 1);
        assert_eq!(bits(1), 2);
        assert_eq!(bits(-2), 2);
        assert_eq!(bits(127), 8);
        assert_eq!(bits(-128), 8);
    }
}
