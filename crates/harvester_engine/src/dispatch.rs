use std::fmt;

use engine_logging::engine_warn;
use harvester_core::{Record, TableName};

use crate::analytics::{AnalyticsConfig, AnalyticsSink};
use crate::fetch::FetchSettings;
use crate::file_sink::{FileSink, FileSinkConfig};
use crate::ingestion::{IngestionConfig, IngestionSink};
use crate::{DeliveryReceipt, HarvestError, SinkKind};

/// One target's harvest, as handed to every sink.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    pub table: TableName,
    pub paginated: bool,
    /// Bytes the file sink writes verbatim.
    pub raw: &'a [u8],
    pub records: &'a [Record],
}

#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    fn kind(&self) -> SinkKind;

    async fn deliver(&self, delivery: &Delivery<'_>) -> Result<DeliveryReceipt, HarvestError>;
}

/// Which sinks are active, with their credentials. Built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkConfig {
    pub file: Option<FileSinkConfig>,
    pub ingestion: Option<IngestionConfig>,
    pub analytics: Option<AnalyticsConfig>,
}

impl SinkConfig {
    pub fn is_empty(&self) -> bool {
        self.file.is_none() && self.ingestion.is_none() && self.analytics.is_none()
    }
}

/// Every sink that failed during one dispatch, and every sink that did not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct DispatchError {
    pub delivered: Vec<DeliveryReceipt>,
    pub failures: Vec<HarvestError>,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.delivered.len() + self.failures.len();
        write!(f, "{} of {total} sinks failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl From<DispatchError> for HarvestError {
    /// Keeps the first failure's stage and kind; the message lists them all.
    fn from(err: DispatchError) -> Self {
        let message = err.to_string();
        match err.failures.into_iter().next() {
            Some(first) => HarvestError { message, ..first },
            None => HarvestError::new(
                crate::Stage::Delivering,
                crate::FailureKind::SinkDelivery { status: None },
                message,
            ),
        }
    }
}

/// Fans a harvest out to the configured sinks in the fixed order file,
/// ingestion, analytics.
///
/// Every sink is attempted. Nothing is rolled back when a later sink fails.
pub struct Dispatcher {
    sinks: Vec<Box<dyn Sink>>,
}

impl Dispatcher {
    pub fn new(mut sinks: Vec<Box<dyn Sink>>) -> Self {
        sinks.sort_by_key(|sink| sink.kind());
        Self { sinks }
    }

    pub fn from_config(config: &SinkConfig, settings: &FetchSettings) -> Result<Self, HarvestError> {
        let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
        if let Some(file) = &config.file {
            sinks.push(Box::new(FileSink::new(file)));
        }
        if let Some(ingestion) = &config.ingestion {
            sinks.push(Box::new(IngestionSink::new(ingestion.clone(), settings)?));
        }
        if let Some(analytics) = &config.analytics {
            sinks.push(Box::new(AnalyticsSink::new(analytics.clone(), settings)?));
        }
        Ok(Self::new(sinks))
    }

    pub fn kinds(&self) -> Vec<SinkKind> {
        self.sinks.iter().map(|sink| sink.kind()).collect()
    }

    pub async fn dispatch(
        &self,
        delivery: &Delivery<'_>,
    ) -> Result<Vec<DeliveryReceipt>, DispatchError> {
        let mut delivered = Vec::with_capacity(self.sinks.len());
        let mut failures = Vec::new();

        for sink in &self.sinks {
            match sink.deliver(delivery).await {
                Ok(receipt) => delivered.push(receipt),
                Err(err) => {
                    engine_warn!("{}: {} sink failed: {}", delivery.table, sink.kind(), err);
                    failures.push(err);
                }
            }
        }

        if failures.is_empty() {
            Ok(delivered)
        } else {
            Err(DispatchError {
                delivered,
                failures,
            })
        }
    }
}
