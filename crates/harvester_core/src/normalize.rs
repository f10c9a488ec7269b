use serde::Deserialize;
use serde_json::Value;

use crate::{Envelope, TableName};

/// One opaque record as returned by the service.
pub type Record = Value;

/// Records for one target, in the order the service returned them.
pub type RecordSet = Vec<Record>;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{table}: cannot decode response body: {source}")]
    InvalidJson {
        table: TableName,
        #[source]
        source: serde_json::Error,
    },
    #[error("{table}: expected {expected}")]
    UnexpectedShape {
        table: TableName,
        expected: &'static str,
    },
}

/// Extracts the record array from `raw` using the envelope of `table`.
pub fn normalize(table: TableName, raw: &[u8]) -> Result<RecordSet, DecodeError> {
    let body: Value =
        serde_json::from_slice(raw).map_err(|source| DecodeError::InvalidJson { table, source })?;

    match table.envelope() {
        Envelope::ResultsOrValue => take_array(&body, "Results")
            .or_else(|| take_array(&body, "value"))
            .ok_or(DecodeError::UnexpectedShape {
                table,
                expected: "a `Results` or `value` array",
            }),
        Envelope::Items => take_array(&body, "items").ok_or(DecodeError::UnexpectedShape {
            table,
            expected: "an `items` array",
        }),
        Envelope::Bare => match body {
            Value::Array(records) => Ok(records),
            Value::Object(_) => Ok(vec![body]),
            _ => Err(DecodeError::UnexpectedShape {
                table,
                expected: "a JSON array or object",
            }),
        },
    }
}

fn take_array(body: &Value, field: &str) -> Option<RecordSet> {
    body.get(field).and_then(Value::as_array).cloned()
}

/// One page of a cursor-paginated response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponsePage {
    pub items: RecordSet,
    /// Relative continuation path; empty on the last page.
    pub cursor: String,
}

impl ResponsePage {
    pub fn next_cursor(&self) -> Option<&str> {
        let cursor = self.cursor.trim();
        (!cursor.is_empty()).then_some(cursor)
    }
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(rename = "Items", alias = "items", alias = "value", alias = "Results", default)]
    items: Option<RecordSet>,
    #[serde(rename = "Prev", default)]
    prev: Option<String>,
}

pub fn decode_page(table: TableName, raw: &[u8]) -> Result<ResponsePage, DecodeError> {
    let page: RawPage =
        serde_json::from_slice(raw).map_err(|source| DecodeError::InvalidJson { table, source })?;
    Ok(ResponsePage {
        items: page.items.unwrap_or_default(),
        cursor: page.prev.unwrap_or_default(),
    })
}
