use std::fmt;

use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// A single cell of a record set.
///
/// Relational rows only ever produce the scalar variants plus `Null`.
/// Document collections additionally produce `Absent` (the field does not
/// exist on this document), `Id` (driver-generated identifiers) and
/// `Nested` (embedded documents or arrays). Everything non-scalar is
/// flattened away by `coerce` before the load stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// The field is not present on this record at all.
    Absent,
    /// An explicit database NULL.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    /// A driver-generated identifier, e.g. a document `_id`.
    Id(ObjectId),
    /// An embedded document or array, kept as loose JSON until coercion.
    Nested(Value),
}

impl Cell {
    /// True for cells the cleaner treats as incomplete.
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Absent | Cell::Null)
    }

    /// The string form of this cell for key comparison and text columns,
    /// or `None` when the cell is missing.
    pub fn as_display_string(&self) -> Option<String> {
        if self.is_missing() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Absent | Cell::Null => Ok(()),
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(v) => write!(f, "{}", v),
            Cell::Date(v) => write!(f, "{}", v),
            Cell::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Cell::Id(v) => write!(f, "{}", v.to_hex()),
            Cell::Nested(v) => write!(f, "{}", v),
        }
    }
}
