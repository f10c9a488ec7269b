use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use engine_logging::engine_info;
use harvester_core::TableName;
use tempfile::NamedTempFile;

use crate::dispatch::{Delivery, Sink};
use crate::{DeliveryReceipt, FailureKind, HarvestError, SinkKind, Stage};

/// `<YYYYMMDD-HHMMSS>-<table>.json`
pub fn timestamped_filename(table: TableName, at: DateTime<Local>) -> String {
    format!("{}-{}.json", at.format("%Y%m%d-%H%M%S"), table.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkConfig {
    pub directory: PathBuf,
}

/// Dumps the delivery's raw payload into the output directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    directory: PathBuf,
}

impl FileSink {
    pub fn new(config: &FileSinkConfig) -> Self {
        Self {
            directory: config.directory.clone(),
        }
    }

    /// Writes through a temp file in the same directory and renames it into
    /// place, so a reader never sees a half-written file.
    fn write_atomic(&self, filename: &str, content: &[u8]) -> Result<PathBuf, HarvestError> {
        ensure_directory(&self.directory)?;
        let target = self.directory.join(filename);

        let mut tmp = NamedTempFile::new_in(&self.directory).map_err(io_failure)?;
        tmp.write_all(content).map_err(io_failure)?;
        tmp.as_file_mut().sync_all().map_err(io_failure)?;
        tmp.persist(&target).map_err(|err| io_failure(err.error))?;
        Ok(target)
    }
}

#[async_trait::async_trait]
impl Sink for FileSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    async fn deliver(&self, delivery: &Delivery<'_>) -> Result<DeliveryReceipt, HarvestError> {
        let filename = timestamped_filename(delivery.table, Local::now());
        let path = self.write_atomic(&filename, delivery.raw)?;
        engine_info!(
            "{}: wrote {} records to {}",
            delivery.table,
            delivery.records.len(),
            path.display()
        );
        Ok(DeliveryReceipt {
            sink: SinkKind::File,
            calls: 1,
            records: delivery.records.len(),
            path: Some(path),
        })
    }
}

fn ensure_directory(dir: &Path) -> Result<(), HarvestError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(HarvestError::new(
                Stage::WritingFile,
                FailureKind::SinkDelivery { status: None },
                format!("{} is not a directory", dir.display()),
            ));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(io_failure)
}

fn io_failure(err: std::io::Error) -> HarvestError {
    HarvestError::new(
        Stage::WritingFile,
        FailureKind::SinkDelivery { status: None },
        err.to_string(),
    )
}
