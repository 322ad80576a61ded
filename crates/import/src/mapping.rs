use serde::{Deserialize, Serialize};
use std::fmt;

/// The transaction fields a source column can be mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicalField {
    Date,
    Description,
    Category,
    /// Credit column, or the sole amount column.
    AmountPrimary,
    /// Optional debit column.
    AmountSecondary,
}

impl LogicalField {
    pub const ALL: [LogicalField; 5] = [
        LogicalField::Date,
        LogicalField::Description,
        LogicalField::Category,
        LogicalField::AmountPrimary,
        LogicalField::AmountSecondary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LogicalField::Date => "date",
            LogicalField::Description => "description",
            LogicalField::Category => "category",
            LogicalField::AmountPrimary => "amountPrimary",
            LogicalField::AmountSecondary => "amountSecondary",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(
            self,
            LogicalField::Date | LogicalField::Description | LogicalField::AmountPrimary
        )
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for LogicalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "date" => Ok(LogicalField::Date),
            "description" => Ok(LogicalField::Description),
            "category" => Ok(LogicalField::Category),
            "amountprimary" | "amount1" | "amount" | "credit" => Ok(LogicalField::AmountPrimary),
            "amountsecondary" | "amount2" | "debit" => Ok(LogicalField::AmountSecondary),
            other => Err(format!("Unknown field: '{other}'")),
        }
    }
}

/// Logical field → source column name. An empty name means unmapped.
///
/// Passed by reference into every resolution call; nothing derived from it
/// is cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnMapping {
    pub date: String,
    pub description: String,
    pub category: String,
    #[serde(alias = "amount1", alias = "amount_primary")]
    pub amount_primary: String,
    #[serde(alias = "amount2", alias = "amount_secondary")]
    pub amount_secondary: String,
}

impl ColumnMapping {
    /// Plain assignment; any string is accepted, including the empty one.
    pub fn set_mapping(&mut self, field: LogicalField, source_column: impl Into<String>) {
        *self.slot_mut(field) = source_column.into();
    }

    pub fn get(&self, field: LogicalField) -> &str {
        match field {
            LogicalField::Date => &self.date,
            LogicalField::Description => &self.description,
            LogicalField::Category => &self.category,
            LogicalField::AmountPrimary => &self.amount_primary,
            LogicalField::AmountSecondary => &self.amount_secondary,
        }
    }

    /// The mapped column, or `None` when the field is unset.
    pub fn column(&self, field: LogicalField) -> Option<&str> {
        Some(self.get(field)).filter(|c| !c.is_empty())
    }

    pub fn is_set(&self, field: LogicalField) -> bool {
        self.column(field).is_some()
    }

    /// True iff date, description and the primary amount are all mapped.
    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn missing_required(&self) -> Vec<LogicalField> {
        LogicalField::ALL
            .into_iter()
            .filter(|f| f.is_required() && !self.is_set(*f))
            .collect()
    }

    /// Mapped fields whose column is not in `headers`. Informational only:
    /// such fields resolve to empty cells.
    pub fn unknown_columns<'a>(&'a self, headers: &[String]) -> Vec<(LogicalField, &'a str)> {
        LogicalField::ALL
            .into_iter()
            .filter_map(|f| self.column(f).map(|c| (f, c)))
            .filter(|(_, c)| !headers.iter().any(|h| h == c))
            .collect()
    }

    fn slot_mut(&mut self, field: LogicalField) -> &mut String {
        match field {
            LogicalField::Date => &mut self.date,
            LogicalField::Description => &mut self.description,
            LogicalField::Category => &mut self.category,
            LogicalField::AmountPrimary => &mut self.amount_primary,
            LogicalField::AmountSecondary => &mut self.amount_secondary,
        }
    }
}
