//! Common types used across the engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Document families that receive a daily sequence number
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DocumentPrefix {
    GoodsReceipt,
    GoodsIssue,
    Transfer,
    CycleCount,
}

impl DocumentPrefix {
    /// Two-letter code printed at the start of the document number
    pub fn code(&self) -> &'static str {
        match self {
            DocumentPrefix::GoodsReceipt => "GR",
            DocumentPrefix::GoodsIssue => "GI",
            DocumentPrefix::Transfer => "TR",
            DocumentPrefix::CycleCount => "CC",
        }
    }
}

impl FromStr for DocumentPrefix {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GR" => Ok(DocumentPrefix::GoodsReceipt),
            "GI" => Ok(DocumentPrefix::GoodsIssue),
            "TR" => Ok(DocumentPrefix::Transfer),
            "CC" => Ok(DocumentPrefix::CycleCount),
            other => Err(UnknownVariant::new("document prefix", other)),
        }
    }
}

/// Format a document number as `{PREFIX}{YY}{MM}{DD}{NNNN}`.
///
/// The counter is zero-padded to four digits. A day with more than 9999
/// documents of one kind produces a wider number instead of wrapping.
pub fn format_document_number(prefix: DocumentPrefix, date: NaiveDate, sequence: u32) -> String {
    format!("{}{}{:04}", prefix.code(), date.format("%y%m%d"), sequence)
}

/// Error returned when a stored string does not name a known enum variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Key of a balance row: one product at one location
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StockKey {
    pub product_id: uuid::Uuid,
    pub location_id: uuid::Uuid,
}

impl StockKey {
    pub fn new(product_id: uuid::Uuid, location_id: uuid::Uuid) -> Self {
        Self {
            product_id,
            location_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_number_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            format_document_number(DocumentPrefix::GoodsReceipt, date, 1),
            "GR2403070001"
        );
        assert_eq!(
            format_document_number(DocumentPrefix::CycleCount, date, 9999),
            "CC2403079999"
        );
    }

    #[test]
    fn test_document_number_widens_past_four_digits() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(
            format_document_number(DocumentPrefix::Transfer, date, 10000),
            "TR25123110000"
        );
    }

    #[test]
    fn test_prefix_codes_round_trip() {
        for prefix in [
            DocumentPrefix::GoodsReceipt,
            DocumentPrefix::GoodsIssue,
            DocumentPrefix::Transfer,
            DocumentPrefix::CycleCount,
        ] {
            assert_eq!(prefix.code().parse::<DocumentPrefix>().unwrap(), prefix);
        }
        assert!("XX".parse::<DocumentPrefix>().is_err());
    }

    #[test]
    fn test_stock_key_ordering_is_product_first() {
        let a = uuid::Uuid::from_u128(1);
        let b = uuid::Uuid::from_u128(2);
        let mut keys = vec![StockKey::new(b, a), StockKey::new(a, b), StockKey::new(a, a)];
        keys.sort();
        assert_eq!(
            keys,
            vec![StockKey::new(a, a), StockKey::new(a, b), StockKey::new(b, a)]
        );
    }
}
