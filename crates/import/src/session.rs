use hearth_core::TransactionRecord;
use thiserror::Error;

use crate::batch::{assemble, BatchSink, SubmitError};
use crate::csv::UploadedCsv;
use crate::mapping::{ColumnMapping, LogicalField};
use crate::resolve::{resolve_amount, resolve_text, PreviewRow};
use crate::row::{MatchedRow, UploadResponse};
use crate::rules::CategoryMatcher;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Column mapping incomplete, missing: {}", join_fields(.0))]
    MappingIncomplete(Vec<LogicalField>),
    #[error("No rows to import")]
    NoRows,
    #[error("Row {index} out of range ({len} rows)")]
    RowOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    SubmissionFailed(#[from] SubmitError),
}

fn join_fields(fields: &[LogicalField]) -> String {
    fields
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One file's worth of import state: the fixed header set, the matched rows
/// with their member tags, and the user's current column mapping.
///
/// Re-importing means building a new session.
#[derive(Debug, Clone, Default)]
pub struct ImportSession {
    headers: Vec<String>,
    rows: Vec<MatchedRow>,
    mapping: ColumnMapping,
}

impl ImportSession {
    pub fn new(headers: Vec<String>, rows: Vec<MatchedRow>) -> Self {
        Self {
            headers,
            rows,
            mapping: ColumnMapping::default(),
        }
    }

    /// Rows from a locally parsed file start with no type match.
    pub fn from_csv(upload: UploadedCsv) -> Self {
        let rows = upload
            .rows
            .into_iter()
            .map(|raw| MatchedRow::new(raw, None))
            .collect();
        Self::new(upload.headers, rows)
    }

    /// Rows matched server-side keep the server's type label.
    pub fn from_upload_response(response: UploadResponse) -> Self {
        let headers = response.headers();
        Self::new(headers, response.full_data)
    }

    pub fn with_mapping(mut self, mapping: ColumnMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[MatchedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn set_mapping(&mut self, field: LogicalField, source_column: impl Into<String>) {
        self.mapping.set_mapping(field, source_column);
    }

    pub fn is_complete(&self) -> bool {
        self.mapping.is_complete()
    }

    /// Fills in a type label for rows that have none, reading description
    /// and category through the current mapping. Returns how many rows
    /// gained a label.
    pub fn apply_matcher<M: CategoryMatcher + ?Sized>(&mut self, matcher: &M) -> usize {
        let mut matched = 0;
        for row in self.rows.iter_mut().filter(|r| r.matched_type().is_none()) {
            let raw = row.raw();
            let label = matcher.match_type(
                resolve_text(raw, &self.mapping, LogicalField::Description),
                resolve_text(raw, &self.mapping, LogicalField::Category),
            );
            if let Some(label) = label {
                row.set_matched_type(label);
                matched += 1;
            }
        }
        tracing::debug!("Type matcher labelled {} of {} rows", matched, self.rows.len());
        matched
    }

    /// Tags a row with a household member. The id is stored as given and
    /// only validated at assembly.
    pub fn assign_member(&mut self, index: usize, member_id: impl Into<String>) -> Result<(), ImportError> {
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or(ImportError::RowOutOfRange { index, len })?;
        row.set_member_id(member_id);
        Ok(())
    }

    /// Display rows for the first `limit` rows.
    pub fn preview(&self, limit: usize) -> Vec<PreviewRow> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| PreviewRow::resolve(row, &self.mapping))
            .collect()
    }

    /// Indices of rows whose amount currently resolves to zero. These are
    /// still included in the batch.
    pub fn zero_amount_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| resolve_amount(row.raw(), &self.mapping).is_zero())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn assemble(&self) -> Vec<TransactionRecord> {
        assemble(&self.rows, &self.mapping)
    }

    /// Assembles and hands the batch to `sink`. The session is untouched, so
    /// a failed batch can be submitted again as is.
    pub async fn submit<S: BatchSink>(&self, sink: &S) -> Result<String, ImportError> {
        let missing = self.mapping.missing_required();
        if !missing.is_empty() {
            return Err(ImportError::MappingIncomplete(missing));
        }
        if self.rows.is_empty() {
            return Err(ImportError::NoRows);
        }

        let records = self.assemble();
        tracing::info!("Submitting {} transactions", records.len());
        match sink.submit_batch(&records).await {
            Ok(message) => {
                tracing::info!("Batch accepted: {message}");
                Ok(message)
            }
            Err(e) => {
                tracing::warn!("Batch submission failed: {e:?}");
                Err(e.into())
            }
        }
    }
}
