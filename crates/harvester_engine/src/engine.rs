use engine_logging::{engine_debug, engine_error, engine_info};
use harvester_core::{normalize, ApiRoot, HarvestTarget, RecordSet, ResolvedEndpoint, TableName};

use crate::credential::TokenSource;
use crate::dispatch::{Delivery, Dispatcher};
use crate::fetch::{log_body, FetchSettings, Fetcher, ProgressSink, SourceRequest};
use crate::paging::PagedHarvester;
use crate::{EngineEvent, HarvestError, Stage, TargetOutcome, TargetProgress};

/// How a run went, target by target.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: Vec<TargetOutcome>,
    pub failed: Vec<(TableName, HarvestError)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives each planned target through fetch, normalize and dispatch.
///
/// Targets run one after another. A failed target is reported and the run
/// moves on to the next one.
pub struct Harvester {
    fetcher: Box<dyn Fetcher>,
    dispatcher: Dispatcher,
    location: String,
    api_root: ApiRoot,
    max_pages: usize,
}

impl Harvester {
    /// `settings` must be the ones `fetcher` was built with; the page cap is
    /// taken from them.
    pub fn new(
        fetcher: Box<dyn Fetcher>,
        dispatcher: Dispatcher,
        location: impl Into<String>,
        settings: &FetchSettings,
    ) -> Self {
        Self {
            fetcher,
            dispatcher,
            location: location.into(),
            api_root: ApiRoot::default(),
            max_pages: settings.max_pages,
        }
    }

    pub fn with_api_root(mut self, api_root: ApiRoot) -> Self {
        self.api_root = api_root;
        self
    }

    /// Fails up front only when no bearer token can be had; everything after
    /// that is recorded per target.
    pub async fn run(
        &self,
        targets: &[HarvestTarget],
        tokens: &dyn TokenSource,
        progress: &dyn ProgressSink,
    ) -> Result<RunSummary, HarvestError> {
        let token = tokens.bearer_token().await?;
        let mut summary = RunSummary::default();

        for target in targets {
            let table = target.table;
            let result = self.run_target(target, &token, progress).await;
            match &result {
                Ok(outcome) => {
                    summary.succeeded.push(outcome.clone());
                }
                Err(err) => {
                    engine_error!("{table}: {err}");
                    summary.failed.push((table, err.clone()));
                }
            }
            progress.emit(EngineEvent::TargetCompleted { table, result });
        }

        engine_info!(
            "run finished: {} succeeded, {} failed",
            summary.succeeded.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    pub async fn run_target(
        &self,
        target: &HarvestTarget,
        bearer_token: &str,
        progress: &dyn ProgressSink,
    ) -> Result<TargetOutcome, HarvestError> {
        let table = target.table;
        let endpoint = ResolvedEndpoint::new(target, &self.location, &self.api_root);
        engine_info!("{table}: fetching from {}", endpoint.hostname);
        engine_debug!("{table}: {}", endpoint.url);
        emit(progress, table, Stage::Fetching, None);

        let (raw, records, pages) = match &endpoint.cursor_root_url {
            Some(cursor_root_url) => {
                let paged = PagedHarvester::new(self.fetcher.as_ref(), self.max_pages)
                    .fetch_all(table, &endpoint.url, cursor_root_url, bearer_token, progress)
                    .await?;
                let raw = serde_json::to_vec_pretty(&paged.records).map_err(|err| {
                    HarvestError::new(
                        Stage::Normalizing,
                        crate::FailureKind::Decode,
                        err.to_string(),
                    )
                })?;
                (raw, paged.records, paged.pages)
            }
            None => {
                let request = SourceRequest {
                    method: target.method,
                    url: &endpoint.url,
                    body: target.body.as_deref(),
                    bearer_token,
                };
                let body = self.fetcher.fetch(&request).await?;
                log_body(table, &body);

                emit(progress, table, Stage::Normalizing, None);
                let records: RecordSet = normalize(table, &body)
                    .map_err(|err| HarvestError::decode(Stage::Normalizing, err))?;
                (body.to_vec(), records, 1)
            }
        };

        emit(progress, table, Stage::Delivering, Some(records.len()));
        let delivery = Delivery {
            table,
            paginated: target.paginated(),
            raw: &raw,
            records: &records,
        };
        let receipts = self.dispatcher.dispatch(&delivery).await?;

        emit(progress, table, Stage::Done, Some(records.len()));
        Ok(TargetOutcome {
            table,
            records: records.len(),
            pages,
            receipts,
        })
    }
}

fn emit(progress: &dyn ProgressSink, table: TableName, stage: Stage, records: Option<usize>) {
    progress.emit(EngineEvent::Progress(TargetProgress {
        table,
        stage,
        records,
    }));
}
