//! Harvester engine: fetching, paging, delivery and the run loop.
mod analytics;
mod credential;
mod dispatch;
mod engine;
mod fetch;
mod file_sink;
mod ingestion;
mod paging;
mod types;

pub use analytics::{
    AnalyticsConfig, AnalyticsSink, ANALYTICS_API_VERSION, DEFAULT_ANALYTICS_SUFFIX,
    TIME_GENERATED_FIELD,
};
pub use credential::{ClientCredentials, StaticToken, TokenSource, DEFAULT_AUTHORITY, DEFENDER_SCOPE};
pub use dispatch::{Delivery, DispatchError, Dispatcher, Sink, SinkConfig};
pub use engine::{Harvester, RunSummary};
pub use fetch::{
    FetchSettings, Fetcher, ProgressSink, ReqwestFetcher, SourceRequest, BROWSER_USER_AGENT,
};
pub use file_sink::{timestamped_filename, FileSink, FileSinkConfig};
pub use ingestion::{IngestionConfig, IngestionSink, DEFAULT_INGESTION_SCHEME};
pub use paging::{PagedHarvester, PagedRecords};
pub use types::{
    DeliveryReceipt, EngineEvent, FailureKind, HarvestError, SinkKind, Stage, TargetOutcome,
    TargetProgress,
};
