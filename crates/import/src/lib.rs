pub mod batch;
pub mod csv;
pub mod mapping;
pub mod resolve;
pub mod row;
pub mod rules;
pub mod session;
pub(crate) mod util;

pub use batch::{assemble, BatchSink, MemorySink, SubmitError};
pub use crate::csv::{parse_upload, CsvError, CsvUploadOptions, UploadedCsv};
pub use mapping::{ColumnMapping, LogicalField};
pub use resolve::{parse_number, resolve_amount, PreviewRow, NOT_AVAILABLE};
pub use row::{MatchedRow, RawRow, UploadResponse};
pub use rules::{CategoryMatcher, CategoryRuleEngine, MatchType, NoMatcher, RuleError, TypeRule};
pub use session::{ImportError, ImportSession};
