//! Typed workflow requests
//!
//! Each request declares its field rules with `validator` and implements
//! [`ValidateRequest`] so that header, per-item and cross-field rules are
//! reported together before anything is written.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use crate::models::QualityStatus;
use crate::validation::{
    derived_errors, validate_batch_number, validate_document_value, validate_serial_numbers,
    validate_unit_cost, FieldError, ValidateRequest,
};

fn require_items(count: usize, errors: &mut Vec<FieldError>) {
    if count == 0 {
        errors.push(FieldError::new(
            "items",
            "length",
            "at least one item is required",
        ));
    }
}

fn item_errors<T: Validate>(items: &[T], errors: &mut Vec<FieldError>) {
    for (index, item) in items.iter().enumerate() {
        errors.extend(derived_errors(&format!("items[{index}]."), item));
    }
}

// ============================================================================
// Receipt
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiptRequest {
    pub supplier_id: Option<Uuid>,
    pub purchase_order_id: Option<Uuid>,
    pub receipt_date: Option<NaiveDate>,
    pub received_by: Uuid,
    #[validate(custom = "validate_document_value")]
    pub total_value: Decimal,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub items: Vec<ReceiptItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiptItemRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    #[validate(range(min = 1, max = 1000000000, message = "quantity must be between 1 and 1000000000"))]
    pub quantity: i64,
    #[validate(custom = "validate_unit_cost")]
    pub unit_cost: Decimal,
    #[validate(length(min = 1, max = 64), custom = "validate_batch_number")]
    pub batch_number: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_serial_numbers")]
    pub serial_numbers: Vec<String>,
    pub expiry_date: Option<NaiveDate>,
    #[validate(length(max = 64))]
    pub bin_location: Option<String>,
    #[serde(default)]
    pub quality_status: QualityStatus,
    pub notes: Option<String>,
}

impl ValidateRequest for ReceiptRequest {
    fn validation_errors(&self) -> Vec<FieldError> {
        let mut errors = derived_errors("", self);
        require_items(self.items.len(), &mut errors);
        item_errors(&self.items, &mut errors);
        errors
    }
}

// ============================================================================
// Issue
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IssueRequest {
    pub order_id: Option<Uuid>,
    #[validate(length(min = 1, max = 128))]
    pub department: Option<String>,
    pub issued_to: Uuid,
    pub issue_date: Option<NaiveDate>,
    #[validate(custom = "validate_document_value")]
    pub total_value: Decimal,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub items: Vec<IssueItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IssueItemRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    #[validate(range(min = 1, max = 1000000000, message = "quantity must be between 1 and 1000000000"))]
    pub quantity: i64,
    pub notes: Option<String>,
}

impl ValidateRequest for IssueRequest {
    fn validation_errors(&self) -> Vec<FieldError> {
        let mut errors = derived_errors("", self);
        require_items(self.items.len(), &mut errors);
        item_errors(&self.items, &mut errors);
        errors
    }
}

// ============================================================================
// Transfer
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferRequest {
    pub from_location_id: Uuid,
    pub to_location_id: Uuid,
    pub transfer_date: Option<NaiveDate>,
    pub requested_by: Uuid,
    pub approved_by: Option<Uuid>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub items: Vec<TransferItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1000000000, message = "quantity must be between 1 and 1000000000"))]
    pub quantity: i64,
    #[validate(length(max = 64))]
    pub to_bin_location: Option<String>,
    pub notes: Option<String>,
}

impl ValidateRequest for TransferRequest {
    fn validation_errors(&self) -> Vec<FieldError> {
        let mut errors = derived_errors("", self);
        if self.from_location_id == self.to_location_id {
            errors.push(FieldError::new(
                "to_location_id",
                "same_location",
                "destination must differ from source location",
            ));
        }
        require_items(self.items.len(), &mut errors);
        item_errors(&self.items, &mut errors);
        errors
    }
}

// ============================================================================
// Cycle Count
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CycleCountRequest {
    pub location_id: Uuid,
    pub counted_by: Uuid,
    pub count_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub items: Vec<CycleCountItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CycleCountItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 0, max = 1000000000, message = "counted quantity must be between 0 and 1000000000"))]
    pub counted_quantity: i64,
    #[serde(default)]
    #[validate(custom = "validate_unit_cost")]
    pub unit_cost: Decimal,
    #[validate(length(max = 64))]
    pub bin_location: Option<String>,
    pub notes: Option<String>,
}

impl ValidateRequest for CycleCountRequest {
    fn validation_errors(&self) -> Vec<FieldError> {
        let mut errors = derived_errors("", self);
        require_items(self.items.len(), &mut errors);
        item_errors(&self.items, &mut errors);

        // Two lines for one product would both be compared to the same
        // system quantity and post the variance twice.
        let mut seen = HashSet::new();
        for (index, item) in self.items.iter().enumerate() {
            if !seen.insert(item.product_id) {
                errors.push(FieldError::new(
                    format!("items[{index}].product_id"),
                    "duplicate",
                    "product is counted more than once",
                ));
            }
        }
        errors
    }
}

// ============================================================================
// Reservation
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReservationRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    #[validate(range(min = 1, max = 1000000000, message = "quantity must be between 1 and 1000000000"))]
    pub quantity: i64,
    #[validate(length(min = 1, max = 64))]
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
}

impl ValidateRequest for ReservationRequest {
    fn validation_errors(&self) -> Vec<FieldError> {
        derived_errors("", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{max_unit_cost, MAX_LINE_QUANTITY};

    fn receipt_item(quantity: i64, cost: i64) -> ReceiptItemRequest {
        ReceiptItemRequest {
            product_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            quantity,
            unit_cost: Decimal::from(cost),
            batch_number: Some("B1".to_string()),
            serial_numbers: vec![],
            expiry_date: None,
            bin_location: None,
            quality_status: QualityStatus::Good,
            notes: None,
        }
    }

    fn receipt(items: Vec<ReceiptItemRequest>) -> ReceiptRequest {
        ReceiptRequest {
            supplier_id: None,
            purchase_order_id: None,
            receipt_date: None,
            received_by: Uuid::new_v4(),
            total_value: Decimal::from(100),
            notes: None,
            items,
        }
    }

    #[test]
    fn test_valid_receipt_has_no_errors() {
        assert!(receipt(vec![receipt_item(5, 10)]).validation_errors().is_empty());
    }

    #[test]
    fn test_receipt_reports_every_violation() {
        let mut request = receipt(vec![receipt_item(0, 10), receipt_item(3, -1)]);
        request.total_value = Decimal::from(-5);

        let errors = request.validation_errors();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(fields.contains(&"total_value"));
        assert!(fields.contains(&"items[0].quantity"));
        assert!(fields.contains(&"items[1].unit_cost"));
    }

    #[test]
    fn test_receipt_requires_items() {
        let errors = receipt(vec![]).validation_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "items");
    }

    #[test]
    fn test_receipt_rejects_blank_batch_number() {
        let mut item = receipt_item(1, 1);
        item.batch_number = Some(String::new());
        let errors = receipt(vec![item]).validation_errors();
        assert!(errors.iter().any(|e| e.field == "items[0].batch_number"));
    }

    #[test]
    fn test_transfer_to_same_location_is_rejected() {
        let location = Uuid::new_v4();
        let request = TransferRequest {
            from_location_id: location,
            to_location_id: location,
            transfer_date: None,
            requested_by: Uuid::new_v4(),
            approved_by: None,
            notes: None,
            items: vec![TransferItemRequest {
                product_id: Uuid::new_v4(),
                quantity: 0,
                to_bin_location: None,
                notes: None,
            }],
        };

        let errors = request.validation_errors();
        assert!(errors.iter().any(|e| e.code == "same_location"));
        assert!(errors.iter().any(|e| e.field == "items[0].quantity"));
    }

    #[test]
    fn test_cycle_count_rejects_duplicate_products() {
        let product = Uuid::new_v4();
        let line = |qty| CycleCountItemRequest {
            product_id: product,
            counted_quantity: qty,
            unit_cost: Decimal::ONE,
            bin_location: None,
            notes: None,
        };
        let request = CycleCountRequest {
            location_id: Uuid::new_v4(),
            counted_by: Uuid::new_v4(),
            count_date: None,
            notes: None,
            items: vec![line(3), line(-1)],
        };

        let errors = request.validation_errors();
        assert!(errors
            .iter()
            .any(|e| e.field == "items[1].product_id" && e.code == "duplicate"));
        assert!(errors.iter().any(|e| e.field == "items[1].counted_quantity"));
    }

    #[test]
    fn test_issue_item_quantity_must_be_positive() {
        let request = IssueRequest {
            order_id: None,
            department: None,
            issued_to: Uuid::new_v4(),
            issue_date: None,
            total_value: Decimal::ZERO,
            notes: None,
            items: vec![IssueItemRequest {
                product_id: Uuid::new_v4(),
                location_id: Uuid::new_v4(),
                quantity: -4,
                notes: None,
            }],
        };
        let errors = request.validation_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "quantity must be between 1 and 1000000000");
    }

    #[test]
    fn test_line_limits_keep_arithmetic_in_range() {
        let largest = receipt(vec![receipt_item(MAX_LINE_QUANTITY, 1_000_000_000)]);
        assert!(largest.validation_errors().is_empty());

        let mut item = receipt_item(MAX_LINE_QUANTITY + 1, 0);
        item.unit_cost = max_unit_cost() + Decimal::ONE;
        let errors = receipt(vec![item]).validation_errors();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["items[0].quantity", "items[0].unit_cost"]);
        assert!(errors.iter().all(|e| e.code == "range"));

        // The largest accepted line still has a representable value
        assert!(Decimal::from(MAX_LINE_QUANTITY)
            .checked_mul(max_unit_cost())
            .is_some());
    }

    #[test]
    fn test_receipt_deserializes_with_defaults() {
        let json = serde_json::json!({
            "received_by": Uuid::nil(),
            "total_value": "50.00",
            "items": [{
                "product_id": Uuid::nil(),
                "location_id": Uuid::nil(),
                "quantity": 5,
                "unit_cost": "10",
                "batch_number": "B1"
            }]
        });
        let request: ReceiptRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.items[0].quality_status, QualityStatus::Good);
        assert!(request.items[0].serial_numbers.is_empty());
    }
}
