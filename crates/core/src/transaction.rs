use serde::{Deserialize, Serialize};

use super::member::MemberId;
use super::money::Money;

/// Label used for both `category` and `type` when nothing better is known.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A commit-ready transaction as accepted by the batch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: String,
    pub description: String,
    /// Always non-negative.
    pub amount: Money,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub notes: String,
    /// Omitted from the wire form when absent, never sent as null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberId>,
}

impl TransactionRecord {
    pub fn new(date: &str, description: &str, amount: Money) -> Self {
        TransactionRecord {
            date: date.to_string(),
            description: description.to_string(),
            amount: amount.abs(),
            category: UNCATEGORIZED.to_string(),
            kind: UNCATEGORIZED.to_string(),
            notes: String::new(),
            member: None,
        }
    }
}
