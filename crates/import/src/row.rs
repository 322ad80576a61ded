use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One imported line: source-column name → raw cell text, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    /// Cell text for `column`, or `None` when the row has no such column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`RawRow::get`] but tolerates an unmapped (`None`) column.
    pub fn lookup(&self, column: Option<&str>) -> Option<&str> {
        column.and_then(|c| self.get(c))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RawRow {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (k, v) in &self.cells {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RawRowVisitor)
    }
}

struct RawRowVisitor;

impl<'de> Visitor<'de> for RawRowVisitor {
    type Value = RawRow;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of column names to cell values")
    }

    // Keeps document order so the first row can stand in for the header set.
    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RawRow, A::Error> {
        let mut cells = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
            let text = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            cells.push((key, text));
        }
        Ok(RawRow { cells })
    }
}

/// A raw row plus its externally supplied type match and the member tag the
/// user assigns during review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRow {
    raw: RawRow,
    #[serde(rename = "match", default, deserialize_with = "blank_as_none")]
    matched_type: Option<String>,
    #[serde(rename = "member", default)]
    member_id: String,
}

impl MatchedRow {
    pub fn new(raw: RawRow, matched_type: Option<String>) -> Self {
        MatchedRow {
            raw,
            matched_type: matched_type.filter(|s| !s.is_empty()),
            member_id: String::new(),
        }
    }

    pub fn raw(&self) -> &RawRow {
        &self.raw
    }

    pub fn matched_type(&self) -> Option<&str> {
        self.matched_type.as_deref()
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn set_member_id(&mut self, member_id: impl Into<String>) {
        self.member_id = member_id.into();
    }

    pub(crate) fn set_matched_type(&mut self, matched_type: String) {
        if !matched_type.is_empty() {
            self.matched_type = Some(matched_type);
        }
    }
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Body returned by the server-side upload endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub preview: Vec<MatchedRow>,
    #[serde(default)]
    pub full_data: Vec<MatchedRow>,
    #[serde(default)]
    pub total_rows: usize,
}

impl UploadResponse {
    /// Header names as they appear in the first preview row, falling back to
    /// the first full-data row.
    pub fn headers(&self) -> Vec<String> {
        self.preview
            .first()
            .or_else(|| self.full_data.first())
            .map(|row| row.raw.columns().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
