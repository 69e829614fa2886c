//! Integration tests for error handling in zkplay-runtime

use zkplay_runtime::{FieldElement, FieldError, InputError, RuntimeError};

#[test]
fn test_division_by_zero_message() {
    let error = FieldElement::from_u64(5).checked_div(&FieldElement::zero()).unwrap_err();

    assert_eq!(error, FieldError::DivisionByZero);
    assert_eq!(error.to_string(), "Division by zero");
}

#[test]
fn test_out_of_field_range_message() {
    let error: FieldError = "0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001"
        .parse::<FieldElement>()
        .unwrap_err();

    let error_msg = error.to_string();
    assert!(error_msg.contains("not below the field modulus"));
}

#[test]
fn test_invalid_literal_message() {
    let error = "12ab".parse::<FieldElement>().unwrap_err();

    assert_eq!(error, FieldError::InvalidLiteral("12ab".to_string()));
    assert!(error.to_string().contains("12ab"));
}

#[test]
fn test_input_error_messages() {
    let missing = InputError::Missing("x".to_string());
    assert!(missing.to_string().contains("Missing input"));
    assert!(missing.to_string().contains("'x'"));

    let mismatch = InputError::TypeMismatch {
        path: "arr[1]".to_string(),
        expected: "u8".to_string(),
        found: "boolean".to_string(),
    };
    let error_msg = mismatch.to_string();
    assert!(error_msg.contains("arr[1]"));
    assert!(error_msg.contains("expected u8"));
    assert!(error_msg.contains("found boolean"));
}

#[test]
fn test_serialization_error_message() {
    let error = RuntimeError::serialization("invalid JSON format");

    let error_msg = error.to_string();
    assert!(error_msg.contains("Serialization error"));
    assert!(error_msg.contains("invalid JSON format"));
}

#[test]
fn test_other_error_message() {
    let error = RuntimeError::other("unexpected error occurred");

    assert_eq!(error.to_string(), "unexpected error occurred");
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: RuntimeError = io_error.into();

    let error_msg = error.to_string();
    assert!(error_msg.contains("I/O error"));
    assert!(error_msg.contains("file not found"));
}

#[test]
fn test_field_error_conversion_is_transparent() {
    let error: RuntimeError = FieldError::DivisionByZero.into();

    assert!(matches!(error, RuntimeError::Field(FieldError::DivisionByZero)));
    assert_eq!(error.to_string(), "Division by zero");
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let error: RuntimeError = json_error.into();

    assert!(matches!(error, RuntimeError::Serialization(_)));
}

