use serde_json::{json, Value};

use crate::{Record, TableName};

/// Maximum records per log-analytics call for paginated targets.
pub const ANALYTICS_CHUNK_SIZE: usize = 1000;

/// How a record set is split into delivery calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Contiguous chunks of at most this many records.
    Chunked(usize),
    /// Everything in one call.
    Single,
}

impl BatchPolicy {
    /// Paginated targets are chunked for the analytics sink; everything else
    /// goes out in one call.
    pub fn for_analytics(paginated: bool) -> Self {
        if paginated {
            BatchPolicy::Chunked(ANALYTICS_CHUNK_SIZE)
        } else {
            BatchPolicy::Single
        }
    }

    /// Partitions `records` in order, without gaps or overlap. An empty input
    /// yields no batches.
    pub fn batches<'a, T>(&self, records: &'a [T]) -> Vec<&'a [T]> {
        if records.is_empty() {
            return Vec::new();
        }
        match *self {
            BatchPolicy::Chunked(size) => records.chunks(size.max(1)).collect(),
            BatchPolicy::Single => vec![records],
        }
    }
}

/// Wraps each record as a log-ingestion event tagged with its table.
pub fn ingestion_events(table: TableName, records: &[Record]) -> Vec<Value> {
    records
        .iter()
        .map(|record| {
            json!({
                "event": record,
                "sourcetype": table.as_str(),
            })
        })
        .collect()
}
