//! Validation utilities for workflow requests
//!
//! Field rules are declared on the request structs with `validator`; this
//! module holds the custom rules and flattens `validator` output into a
//! single list of field-level errors so callers see every violation at once.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// One violated rule on one field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    /// Path of the field, e.g. `items[2].quantity`
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: &str, message: &str) -> Self {
        Self {
            field: field.into(),
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Typed request that can report all of its violations
pub trait ValidateRequest {
    fn validation_errors(&self) -> Vec<FieldError>;
}

/// Run the derived rules of `value` and prefix every field path
pub fn derived_errors<T: Validate>(prefix: &str, value: &T) -> Vec<FieldError> {
    match value.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => flatten(prefix, &errors),
    }
}

fn flatten(prefix: &str, errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    for (field, kind) in errors.errors() {
        let path = format!("{prefix}{field}");
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    out.push(FieldError {
                        field: path.clone(),
                        code: err.code.to_string(),
                        message: message_for(err),
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                out.extend(flatten(&format!("{path}."), inner));
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    out.extend(flatten(&format!("{path}[{index}]."), inner));
                }
            }
        }
    }
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
    out
}

fn message_for(err: &ValidationError) -> String {
    match &err.message {
        Some(message) => message.to_string(),
        None => match err.code.as_ref() {
            "range" => "value is out of range".to_string(),
            "length" => "length is out of range".to_string(),
            code => code.replace('_', " "),
        },
    }
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

// ============================================================================
// Limits
// ============================================================================

/// Largest quantity one request line may carry; kept in step with the
/// `range(max = ...)` rules on the request structs
pub const MAX_LINE_QUANTITY: i64 = 1_000_000_000;

/// Largest unit cost a line may carry
pub fn max_unit_cost() -> Decimal {
    Decimal::from(1_000_000_000i64)
}

/// Largest declared document value
pub fn max_document_value() -> Decimal {
    Decimal::from(1_000_000_000_000_000_000i64)
}

// ============================================================================
// Custom Rules
// ============================================================================

/// Costs and values may be zero but never negative
pub fn validate_non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(rule("non_negative", "amount cannot be negative"));
    }
    Ok(())
}

pub fn validate_unit_cost(value: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative_amount(value)?;
    if *value > max_unit_cost() {
        return Err(rule("range", "unit cost is too large"));
    }
    Ok(())
}

pub fn validate_document_value(value: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative_amount(value)?;
    if *value > max_document_value() {
        return Err(rule("range", "document value is too large"));
    }
    Ok(())
}

/// Batch numbers are printable and free of surrounding whitespace
pub fn validate_batch_number(value: &str) -> Result<(), ValidationError> {
    if value.trim() != value || value.chars().any(|c| c.is_control()) {
        return Err(rule(
            "batch_number",
            "batch number must not contain control characters or surrounding whitespace",
        ));
    }
    Ok(())
}

/// Serial numbers must be non-empty and unique within a line
pub fn validate_serial_numbers(values: &[String]) -> Result<(), ValidationError> {
    if values.iter().any(|s| s.trim().is_empty()) {
        return Err(rule("serial_numbers", "serial numbers cannot be blank"));
    }
    let mut seen = std::collections::HashSet::new();
    if !values.iter().all(|s| seen.insert(s.as_str())) {
        return Err(rule("serial_numbers", "serial numbers must be unique"));
    }
    Ok(())
}
