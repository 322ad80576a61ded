//! Per-row resolution of the mapped fields.
//!
//! Nothing here fails. Malformed numeric cells resolve to zero and malformed
//! dates to the `N/A` sentinel, so a preview can always be rendered and the
//! operator decides what is wrong.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use hearth_core::{Money, UNCATEGORIZED};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use crate::mapping::{ColumnMapping, LogicalField};
use crate::row::{MatchedRow, RawRow};

/// Display sentinel for a missing or unparseable value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Lenient number parsing. Accepts `$`, thousands separators, accounting
/// parentheses and scientific notation; anything else is `None`.
pub fn parse_number(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let cleaned = s.replace([',', '$', ' '], "");
    // rust_decimal reads `1_000` as a digit group; bank exports never do.
    if cleaned.is_empty() || cleaned.contains('_') {
        return None;
    }
    let dec = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;
    Some(if negative { -dec } else { dec })
}

fn cell_number(row: &RawRow, mapping: &ColumnMapping, field: LogicalField) -> Decimal {
    row.lookup(mapping.column(field))
        .and_then(parse_number)
        .unwrap_or(Decimal::ZERO)
}

/// The row's amount, always non-negative.
///
/// With a secondary column mapped, the primary (credit) value wins whenever
/// it is nonzero; otherwise the secondary (debit) value is used.
pub fn resolve_amount(row: &RawRow, mapping: &ColumnMapping) -> Money {
    let primary = cell_number(row, mapping, LogicalField::AmountPrimary);
    if !mapping.is_set(LogicalField::AmountSecondary) {
        return Money::from_decimal(primary.abs());
    }

    let secondary = cell_number(row, mapping, LogicalField::AmountSecondary);
    let amount = if primary.is_zero() { secondary } else { primary };
    Money::from_decimal(amount.abs())
}

/// The mapped cell's raw text, empty when unmapped or absent.
pub fn resolve_text<'a>(row: &'a RawRow, mapping: &ColumnMapping, field: LogicalField) -> &'a str {
    row.lookup(mapping.column(field)).unwrap_or_default()
}

pub fn resolve_category<'a>(row: &'a RawRow, mapping: &ColumnMapping) -> &'a str {
    Some(resolve_text(row, mapping, LogicalField::Category))
        .filter(|c| !c.is_empty())
        .unwrap_or(UNCATEGORIZED)
}

pub fn resolve_date(row: &RawRow, mapping: &ColumnMapping) -> Option<NaiveDate> {
    row.lookup(mapping.column(LogicalField::Date))
        .and_then(parse_date)
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in &[
        "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y", "%d %b %Y",
        "%b %d, %Y",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|dt| dt.date())
}

/// One line of the review table, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRow {
    pub date: String,
    pub description: String,
    pub amount: String,
    pub category: String,
    pub matched_type: String,
}

impl PreviewRow {
    pub fn resolve(row: &MatchedRow, mapping: &ColumnMapping) -> Self {
        let raw = row.raw();
        let description = resolve_text(raw, mapping, LogicalField::Description);
        PreviewRow {
            date: resolve_date(raw, mapping)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            description: if description.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                description.to_string()
            },
            amount: resolve_amount(raw, mapping).to_string(),
            category: resolve_category(raw, mapping).to_string(),
            matched_type: row.matched_type().unwrap_or(UNCATEGORIZED).to_string(),
        }
    }
}
