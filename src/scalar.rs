// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Scalar payload types for lane records.
//!
//! Every record in the lane layout is a pair of 32-bit fields. The second
//! field holds either a matrix value or, for a row-advance marker, the skip
//! count. [`Scalar`] captures exactly the operations the codec needs:
//!
//! - bit-exact 32-bit storage (`to_bits` / `from_bits`)
//! - encoding and recovering a skip count
//! - multiply and accumulate
//!
//! ## Supported Types
//!
//! | Type      | Storage          | Arithmetic                     |
//! |-----------|------------------|--------------------------------|
//! | `f32`     | IEEE-754 bits    | native                         |
//! | `i32`     | two's complement | native                         |
//! | `u32`     | raw              | native                         |
//! | `Fixed32` | signed Q8.24     | saturating add, rounding mul   |

use std::fmt;
use std::ops::{Add, Mul};

/// A 32-bit numeric payload usable as a matrix value.
pub trait Scalar:
    Copy
    + Send
    + Sync
    + PartialEq
    + fmt::Debug
    + Add<Output = Self>
    + Mul<Output = Self>
    + 'static
{
    /// Additive identity; also the value of padding records.
    const ZERO: Self;

    /// Encode a row-advance skip count.
    fn from_count(count: u32) -> Self;

    /// Decode a row-advance skip count.
    ///
    /// Returns `None` if the value is not a non-negative integer count.
    fn to_count(self) -> Option<u32>;

    /// Raw 32-bit storage pattern.
    fn to_bits(self) -> u32;

    /// Rebuild from a raw 32-bit storage pattern.
    fn from_bits(bits: u32) -> Self;
}

impl Scalar for f32 {
    const ZERO: Self = 0.0;

    #[allow(clippy::cast_precision_loss)]
    fn from_count(count: u32) -> Self {
        count as f32
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn to_count(self) -> Option<u32> {
        if self.is_finite() && self >= 0.0 && self.fract() == 0.0 && self <= u32::MAX as f32 {
            Some(self as u32)
        } else {
            None
        }
    }

    fn to_bits(self) -> u32 {
        f32::to_bits(self)
    }

    fn from_bits(bits: u32) -> Self {
        f32::from_bits(bits)
    }
}

impl Scalar for i32 {
    const ZERO: Self = 0;

    fn from_count(count: u32) -> Self {
        count.cast_signed()
    }

    fn to_count(self) -> Option<u32> {
        u32::try_from(self).ok()
    }

    fn to_bits(self) -> u32 {
        self.cast_unsigned()
    }

    fn from_bits(bits: u32) -> Self {
        bits.cast_signed()
    }
}

impl Scalar for u32 {
    const ZERO: Self = 0;

    fn from_count(count: u32) -> Self {
        count
    }

    fn to_count(self) -> Option<u32> {
        Some(self)
    }

    fn to_bits(self) -> u32 {
        self
    }

    fn from_bits(bits: u32) -> Self {
        bits
    }
}

/// Signed Q8.24 fixed-point number.
///
/// Emulates the saturating, rounding 32-bit fixed-point value type used by
/// streaming accelerators. Addition saturates; multiplication rounds to
/// nearest and saturates.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed32(i32);

impl Fixed32 {
    /// Number of fractional bits.
    pub const FRAC_BITS: u32 = 24;

    /// The value 1.0.
    pub const ONE: Self = Self(1 << Self::FRAC_BITS);

    /// Build from the raw Q8.24 representation.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw Q8.24 representation.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Convert from `f32`, rounding to nearest and saturating.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f32(value: f32) -> Self {
        let scaled = (f64::from(value) * f64::from(1u32 << Self::FRAC_BITS)).round();
        // `as` saturates at the i32 bounds and maps NaN to zero
        Self(scaled as i32)
    }

    /// Convert to `f32`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_f32(self) -> f32 {
        (f64::from(self.0) / f64::from(1u32 << Self::FRAC_BITS)) as f32
    }

    /// Build from an integer, saturating outside the representable range.
    #[must_use]
    pub fn from_int(value: i32) -> Self {
        let wide = i64::from(value) << Self::FRAC_BITS;
        Self(saturate(wide))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn saturate(wide: i64) -> i32 {
    wide.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl Add for Fixed32 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Mul for Fixed32 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let product = i64::from(self.0) * i64::from(rhs.0);
        let rounded = (product + (1 << (Self::FRAC_BITS - 1))) >> Self::FRAC_BITS;
        Self(saturate(rounded))
    }
}

impl fmt::Debug for Fixed32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed32({})", self.to_f32())
    }
}

impl fmt::Display for Fixed32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

impl Scalar for Fixed32 {
    const ZERO: Self = Self(0);

    fn from_count(count: u32) -> Self {
        Self(saturate(i64::from(count) << Self::FRAC_BITS))
    }

    fn to_count(self) -> Option<u32> {
        let frac_mask = (1i32 << Self::FRAC_BITS) - 1;
        if self.0 < 0 || self.0 & frac_mask != 0 {
            return None;
        }
        u32::try_from(self.0 >> Self::FRAC_BITS).ok()
    }

    fn to_bits(self) -> u32 {
        self.0.cast_unsigned()
    }

    fn from_bits(bits: u32) -> Self {
        Self(bits.cast_signed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_encoding() {
        assert_eq!(f32::from_count(3).to_count(), Some(3));
        assert_eq!(1.5f32.to_count(), None);
        assert_eq!((-1.0f32).to_count(), None);
        assert_eq!(i32::from_count(7).to_count(), Some(7));
        assert_eq!((-2i32).to_count(), None);
        assert_eq!(Fixed32::from_count(5).to_count(), Some(5));
        assert_eq!(Fixed32::from_f32(0.5).to_count(), None);
    }

    #[test]
    fn test_bits_are_lossless() {
        for v in [0.0f32, -0.0, 1.25, f32::MAX, f32::MIN_POSITIVE] {
            assert_eq!(<f32 as Scalar>::from_bits(Scalar::to_bits(v)).to_bits(), v.to_bits());
        }
        assert_eq!(<i32 as Scalar>::from_bits(Scalar::to_bits(-17i32)), -17);
        let fx = Fixed32::from_f32(-3.75);
        assert_eq!(<Fixed32 as Scalar>::from_bits(fx.to_bits()), fx);
    }

    #[test]
    fn test_fixed_point_arithmetic() {
        let a = Fixed32::from_f32(1.5);
        let b = Fixed32::from_f32(2.0);
        assert_eq!(a * b, Fixed32::from_int(3));
        assert_eq!(a + a, Fixed32::from_int(3));
        assert_eq!(Fixed32::ONE * Fixed32::ONE, Fixed32::ONE);

        // Q8.24 tops out just below 128
        let big = Fixed32::from_int(100);
        assert_eq!(big + big, Fixed32::from_raw(i32::MAX));
        assert_eq!(big * big, Fixed32::from_raw(i32::MAX));
    }
}
