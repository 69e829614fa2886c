//! Prime field arithmetic
//!
//! Every value inside a circuit is a [`FieldElement`]: an integer modulo the
//! BN254 scalar field prime
//! `P = 0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001`.
//! Arithmetic is delegated to `halo2curves::bn256::Fr`; [`U256`] is the plain
//! integer view used for parsing, range reasoning and byte conversion.
//!
//! Conversions never reduce silently: anything at or above `P` is rejected
//! with [`FieldError::OutOfFieldRange`].

use crate::error::FieldError;
use ff::{Field, PrimeField};
use halo2curves::bn256::Fr;
use ruint::aliases::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

/// The field modulus `P` as a 256-bit integer
pub const MODULUS: U256 = U256::from_limbs([
    0x43e1_f593_f000_0001,
    0x2833_e848_79b9_7091,
    0xb850_45b6_8181_585d,
    0x3064_4e72_e131_a029,
]);

/// Number of bits needed to represent `P - 1`
pub const MODULUS_BITS: usize = 254;

/// An element of the BN254 scalar field, always reduced into `[0, P)`
///
/// # Examples
///
/// ```
/// use zkplay_runtime::FieldElement;
///
/// let three = FieldElement::from_u64(3);
/// let nine = three * three;
/// assert_eq!(nine, FieldElement::from_u64(9));
/// assert_eq!((nine / three).unwrap(), three);
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldElement(Fr);

impl FieldElement {
    pub const ZERO: Self = Self(Fr::ZERO);
    pub const ONE: Self = Self(Fr::ONE);

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn one() -> Self {
        Self::ONE
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Fr::from(value))
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }

    /// Encodes a signed integer, mapping negatives to `P - |value|`
    pub fn from_i128(value: i128) -> Self {
        let magnitude = U256::from(value.unsigned_abs());
        // |i128| < 2^128 < P
        let element = Self::from_u256_unchecked(magnitude);
        if value < 0 {
            -element
        } else {
            element
        }
    }

    /// Converts an integer, rejecting values `>= P`
    pub fn try_from_u256(value: U256) -> Result<Self, FieldError> {
        if value >= MODULUS {
            return Err(FieldError::OutOfFieldRange(value.to_string()));
        }
        Ok(Self::from_u256_unchecked(value))
    }

    /// Converts an integer of any size by reducing it modulo `P`
    pub fn from_u256_reduced(value: U256) -> Self {
        Self::from_u256_unchecked(value % MODULUS)
    }

    fn from_u256_unchecked(value: U256) -> Self {
        let bytes = value.to_le_bytes::<32>();
        let mut repr = <Fr as PrimeField>::Repr::default();
        repr.as_mut().copy_from_slice(&bytes);
        // Canonical by construction: callers guarantee value < P.
        Self(Option::<Fr>::from(Fr::from_repr(repr)).unwrap_or(Fr::ZERO))
    }

    pub fn to_u256(&self) -> U256 {
        let repr = self.0.to_repr();
        U256::from_le_slice(repr.as_ref())
    }

    /// The value as a `u64` if it fits
    pub fn to_u64(&self) -> Option<u64> {
        let value = self.to_u256();
        let limbs = value.as_limbs();
        if limbs[1..].iter().all(|&limb| limb == 0) {
            Some(limbs[0])
        } else {
            None
        }
    }

    /// Interprets the element as a signed integer (`x > P/2` is negative)
    pub fn to_i128(&self) -> Option<i128> {
        let value = self.to_u256();
        let half = MODULUS >> 1usize;
        let (negative, magnitude) =
            if value > half { (true, MODULUS - value) } else { (false, value) };
        let limbs = magnitude.as_limbs();
        if limbs[2] != 0 || limbs[3] != 0 || limbs[1] >> 63 != 0 {
            return None;
        }
        let magnitude = (u128::from(limbs[1]) << 64) | u128::from(limbs[0]);
        let magnitude = magnitude as i128;
        Some(if negative { -magnitude } else { magnitude })
    }

    /// Big-endian 32-byte encoding
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.to_u256().to_be_bytes::<32>()
    }

    /// Decodes a big-endian 32-byte encoding, rejecting non-canonical values
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Result<Self, FieldError> {
        Self::try_from_u256(U256::from_be_slice(bytes))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }

    pub fn is_zero(&self) -> bool {
        bool::from(self.0.is_zero())
    }

    pub fn is_one(&self) -> bool {
        *self == Self::ONE
    }

    /// Returns the `index`-th bit of the canonical integer representation
    pub fn bit(&self, index: usize) -> bool {
        index < 256 && self.to_u256().bit(index)
    }

    /// Number of significant bits of the canonical representation
    pub fn bit_len(&self) -> usize {
        self.to_u256().bit_len()
    }

    pub fn inverse(&self) -> Result<Self, FieldError> {
        Option::<Fr>::from(self.0.invert()).map(Self).ok_or(FieldError::DivisionByZero)
    }

    pub fn checked_div(&self, divisor: &Self) -> Result<Self, FieldError> {
        Ok(*self * divisor.inverse()?)
    }

    pub fn pow(&self, exponent: u64) -> Self {
        Self(self.0.pow_vartime([exponent]))
    }

    pub fn square(&self) -> Self {
        Self(self.0.square())
    }

    /// `2^exponent` as a field element
    pub fn power_of_two(exponent: usize) -> Self {
        Self::from_u64(2).pow(exponent as u64)
    }
}

impl Add for FieldElement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for FieldElement {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for FieldElement {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Neg for FieldElement {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::ops::Div for FieldElement {
    type Output = Result<Self, FieldError>;

    fn div(self, rhs: Self) -> Result<Self, FieldError> {
        self.checked_div(&rhs)
    }
}

impl std::iter::Sum for FieldElement {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<bool> for FieldElement {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

impl TryFrom<U256> for FieldElement {
    type Error = FieldError;

    fn try_from(value: U256) -> Result<Self, FieldError> {
        Self::try_from_u256(value)
    }
}

impl FromStr for FieldElement {
    type Err = FieldError;

    /// Parses decimal, `0x` hexadecimal, and `-`-prefixed (negated) integers
    fn from_str(text: &str) -> Result<Self, FieldError> {
        let trimmed = text.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let digits: String = digits.chars().filter(|&c| c != '_').collect();
        let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            Some(hex_digits) if !hex_digits.is_empty() => U256::from_str_radix(hex_digits, 16),
            Some(_) => return Err(FieldError::InvalidLiteral(text.to_string())),
            None if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
                U256::from_str_radix(&digits, 10)
            }
            None => return Err(FieldError::InvalidLiteral(text.to_string())),
        };
        let value = parsed.map_err(|_| FieldError::OutOfFieldRange(text.to_string()))?;
        let element = Self::try_from_u256(value)?;
        Ok(if negative { -element } else { element })
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u256())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_u256())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.to_be_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldVisitor;

        impl<'de> de::Visitor<'de> for FieldVisitor {
            type Value = FieldElement;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a field element as an integer string or 32 big-endian bytes")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldElement, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldElement, E> {
                Ok(FieldElement::from_u64(v))
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<FieldElement, E> {
                let bytes: &[u8; 32] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &"32 big-endian bytes"))?;
                FieldElement::from_be_bytes(bytes).map_err(E::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_any(FieldVisitor)
        } else {
            deserializer.deserialize_bytes(FieldVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulus_matches_curve() {
        let expected = U256::from_str_radix(Fr::MODULUS.trim_start_matches("0x"), 16).unwrap();
        assert_eq!(MODULUS, expected);
        assert_eq!(MODULUS.bit_len(), MODULUS_BITS);
    }

    #[test]
    fn test_minus_one_is_modulus_minus_one() {
        let minus_one = FieldElement::zero() - FieldElement::one();
        assert_eq!(minus_one.to_u256(), MODULUS - U256::from(1u64));
    }

    #[test]
    fn test_byte_order_is_big_endian() {
        let bytes = FieldElement::from_u64(0x0102).to_be_bytes();
        assert_eq!(bytes[31], 0x02);
        assert_eq!(bytes[30], 0x01);
        assert!(bytes[..30].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_signed_round_trip() {
        for value in [-5i128, -1, 0, 1, 127, -128, i128::from(i64::MIN)] {
            assert_eq!(FieldElement::from_i128(value).to_i128(), Some(value));
        }
    }
}
