//! Integration tests for BN254 field arithmetic

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ruint::aliases::U256;
use zkplay_runtime::{FieldElement, FieldError, MODULUS};

fn random_element(rng: &mut StdRng) -> FieldElement {
    let limbs: [u64; 4] = rng.gen();
    FieldElement::from_u256_reduced(U256::from_limbs(limbs))
}

// ============================================================================
// Arithmetic laws
// ============================================================================

#[test]
fn test_small_arithmetic() {
    let a = FieldElement::from_u64(7);
    let b = FieldElement::from_u64(5);

    assert_eq!(a + b, FieldElement::from_u64(12));
    assert_eq!(a - b, FieldElement::from_u64(2));
    assert_eq!(a * b, FieldElement::from_u64(35));
    assert_eq!(b - a, -FieldElement::from_u64(2));
}

#[test]
fn test_inverse_of_random_elements() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..64 {
        let x = random_element(&mut rng);
        if x.is_zero() {
            continue;
        }
        assert_eq!(x * x.inverse().unwrap(), FieldElement::one());
    }
}

#[test]
fn test_distributivity() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..64 {
        let a = random_element(&mut rng);
        let b = random_element(&mut rng);
        let c = random_element(&mut rng);
        assert_eq!(a * (b + c), a * b + a * c);
    }
}

#[test]
fn test_inverse_of_zero_fails() {
    assert_eq!(FieldElement::zero().inverse(), Err(FieldError::DivisionByZero));
    assert_eq!(FieldElement::one() / FieldElement::zero(), Err(FieldError::DivisionByZero));
}

#[test]
fn test_pow_and_square() {
    let three = FieldElement::from_u64(3);

    assert_eq!(three.pow(4), FieldElement::from_u64(81));
    assert_eq!(three.square(), FieldElement::from_u64(9));
    assert_eq!(three.pow(0), FieldElement::one());
    assert_eq!(FieldElement::power_of_two(10), FieldElement::from_u64(1024));
}

#[test]
fn test_wraparound_at_modulus() {
    let max = FieldElement::try_from_u256(MODULUS - U256::from(1u64)).unwrap();

    assert_eq!(max + FieldElement::one(), FieldElement::zero());
}

// ============================================================================
// Conversions
// ============================================================================

#[test]
fn test_rejects_values_at_or_above_modulus() {
    assert!(matches!(FieldElement::try_from_u256(MODULUS), Err(FieldError::OutOfFieldRange(_))));
    assert!(FieldElement::try_from(MODULUS + U256::from(5u64)).is_err());
    assert!(FieldElement::from_be_bytes(&[0xff; 32]).is_err());
}

#[test]
fn test_be_bytes_round_trip() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..16 {
        let x = random_element(&mut rng);
        assert_eq!(FieldElement::from_be_bytes(&x.to_be_bytes()).unwrap(), x);
    }
}

#[test]
fn test_small_integer_views() {
    assert_eq!(FieldElement::from_u64(u64::MAX).to_u64(), Some(u64::MAX));
    assert_eq!((FieldElement::from_u64(u64::MAX) + FieldElement::one()).to_u64(), None);
    assert_eq!(FieldElement::from_i128(-42).to_i128(), Some(-42));
}

#[test]
fn test_parse_formats() {
    assert_eq!("255".parse::<FieldElement>().unwrap(), FieldElement::from_u64(255));
    assert_eq!("0xff".parse::<FieldElement>().unwrap(), FieldElement::from_u64(255));
    assert_eq!("1_000".parse::<FieldElement>().unwrap(), FieldElement::from_u64(1000));
    assert_eq!("-1".parse::<FieldElement>().unwrap(), -FieldElement::one());
    assert!("".parse::<FieldElement>().is_err());
    assert!("0x".parse::<FieldElement>().is_err());
}

#[test]
fn test_hex_rendering() {
    let hex = FieldElement::from_u64(0xabcd).to_hex();

    assert!(hex.starts_with("0x"));
    assert_eq!(hex.len(), 66);
    assert!(hex.ends_with("abcd"));
}

#[test]
fn test_bits() {
    let x = FieldElement::from_u64(0b1011);

    assert!(x.bit(0));
    assert!(x.bit(1));
    assert!(!x.bit(2));
    assert!(x.bit(3));
    assert_eq!(x.bit_len(), 4);
    assert!(!x.bit(300));
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_json_uses_decimal_strings() {
    let x = FieldElement::from_u64(123456789);
    let json = serde_json::to_string(&x).unwrap();

    assert_eq!(json, "\"123456789\"");
    assert_eq!(serde_json::from_str::<FieldElement>(&json).unwrap(), x);
    assert_eq!(serde_json::from_str::<FieldElement>("17").unwrap(), FieldElement::from_u64(17));
}

#[test]
fn test_bincode_uses_fixed_bytes() {
    let x = -FieldElement::from_u64(3);
    let bytes = bincode::serialize(&x).unwrap();

    // 8-byte length prefix followed by the 32-byte big-endian encoding
    assert_eq!(bytes.len(), 40);
    assert_eq!(bincode::deserialize::<FieldElement>(&bytes).unwrap(), x);
}
