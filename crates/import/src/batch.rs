use hearth_core::{MemberId, TransactionRecord, UNCATEGORIZED};
use std::future::Future;
use std::sync::Mutex;
use thiserror::Error;

use crate::mapping::{ColumnMapping, LogicalField};
use crate::resolve::{resolve_amount, resolve_category, resolve_text};
use crate::row::MatchedRow;

/// Builds the commit-ready records. Pure and infallible: every field has a
/// default, and member ids that are not 24 hex characters are left off.
pub fn assemble(rows: &[MatchedRow], mapping: &ColumnMapping) -> Vec<TransactionRecord> {
    rows.iter().map(|row| assemble_row(row, mapping)).collect()
}

pub fn assemble_row(row: &MatchedRow, mapping: &ColumnMapping) -> TransactionRecord {
    let raw = row.raw();
    let member = MemberId::parse(row.member_id());
    if member.is_none() && !row.member_id().is_empty() {
        tracing::debug!("Dropping malformed member id: {:?}", row.member_id());
    }

    TransactionRecord {
        date: resolve_text(raw, mapping, LogicalField::Date).to_string(),
        description: resolve_text(raw, mapping, LogicalField::Description).to_string(),
        amount: resolve_amount(raw, mapping),
        category: resolve_category(raw, mapping).to_string(),
        kind: row.matched_type().unwrap_or(UNCATEGORIZED).to_string(),
        notes: String::new(),
        member,
    }
}

/// The only fault in the pipeline. Deliberately carries no per-row detail;
/// the underlying cause is kept for logging.
#[derive(Debug, Error)]
#[error("batch submission failed")]
pub struct SubmitError {
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SubmitError {
    pub fn new() -> Self {
        Self { source: None }
    }

    pub fn with_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
        }
    }
}

impl Default for SubmitError {
    fn default() -> Self {
        Self::new()
    }
}

/// Destination for an assembled batch. Returns the acknowledgement message
/// on success. Implementations own any timeout; callers never retry.
pub trait BatchSink {
    fn submit_batch(
        &self,
        records: &[TransactionRecord],
    ) -> impl Future<Output = Result<String, SubmitError>> + Send;
}

// ── In-memory sink (dry runs and tests) ───────────────────────────────────────

/// Keeps every submitted batch in memory. Can be told to fail.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<TransactionRecord>>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn batches(&self) -> Vec<Vec<TransactionRecord>> {
        self.batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl BatchSink for MemorySink {
    fn submit_batch(
        &self,
        records: &[TransactionRecord],
    ) -> impl Future<Output = Result<String, SubmitError>> + Send {
        let result = if self.fail {
            Err(SubmitError::new())
        } else {
            self.batches
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(records.to_vec());
            Ok(format!("{} transactions saved", records.len()))
        };
        std::future::ready(result)
    }
}
