use std::fmt;
use std::path::PathBuf;

use harvester_core::{DecodeError, TableName};

/// Pipeline stage a target is in, or failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticating,
    Fetching,
    Normalizing,
    Delivering,
    WritingFile,
    SendingIngestion,
    SendingAnalytics,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Authenticating => "authenticating",
            Stage::Fetching => "fetching",
            Stage::Normalizing => "normalizing",
            Stage::Delivering => "delivering",
            Stage::WritingFile => "writing file",
            Stage::SendingIngestion => "sending to log ingestion",
            Stage::SendingAnalytics => "sending to log analytics",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Delivery backends, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SinkKind {
    File,
    Ingestion,
    Analytics,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::File => write!(f, "file"),
            SinkKind::Ingestion => write!(f, "log ingestion"),
            SinkKind::Analytics => write!(f, "log analytics"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProgress {
    pub table: TableName,
    pub stage: Stage,
    pub records: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(TargetProgress),
    TargetCompleted {
        table: TableName,
        result: Result<TargetOutcome, HarvestError>,
    },
}

/// What one sink did with one target's records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub sink: SinkKind,
    /// Number of requests (or files) it took.
    pub calls: usize,
    pub records: usize,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub table: TableName,
    pub records: usize,
    pub pages: usize,
    pub receipts: Vec<DeliveryReceipt>,
}

/// A failure of one target's pipeline. Always terminal for that target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} failed ({kind}): {message}")]
pub struct HarvestError {
    pub stage: Stage,
    pub kind: FailureKind,
    pub message: String,
}

impl HarvestError {
    pub(crate) fn new(stage: Stage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn decode(stage: Stage, err: DecodeError) -> Self {
        Self::new(stage, FailureKind::Decode, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// Connection, TLS or protocol failure.
    Transport,
    Timeout,
    HttpStatus(u16),
    TooLarge { max_bytes: u64, actual: Option<u64> },
    /// The server kept returning cursors past the configured page cap.
    PageLimitExceeded { max_pages: usize },
    Decode,
    Signing,
    SinkDelivery { status: Option<u16> },
    Authentication,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Transport => write!(f, "transport error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::PageLimitExceeded { max_pages } => {
                write!(f, "page limit of {max_pages} exceeded")
            }
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::Signing => write!(f, "signing error"),
            FailureKind::SinkDelivery { status: Some(code) } => {
                write!(f, "delivery rejected with status {code}")
            }
            FailureKind::SinkDelivery { status: None } => write!(f, "delivery failed"),
            FailureKind::Authentication => write!(f, "authentication failed"),
        }
    }
}
