use std::fmt;

use chrono::Utc;
use engine_logging::{engine_debug, engine_info, redact};
use harvester_core::{
    rfc1123, shared_key_authorization, sign, BatchPolicy, Record, TableName,
    ANALYTICS_CONTENT_TYPE,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::dispatch::{Delivery, Sink};
use crate::fetch::{build_client, map_reqwest_error, FetchSettings};
use crate::{DeliveryReceipt, FailureKind, HarvestError, SinkKind, Stage};

pub const DEFAULT_ANALYTICS_SUFFIX: &str = "ods.opinsights.azure.com";
pub const ANALYTICS_API_VERSION: &str = "2016-04-01";
pub const TIME_GENERATED_FIELD: &str = "DateValue";

#[derive(Clone, PartialEq, Eq)]
pub struct AnalyticsConfig {
    pub workspace_id: String,
    /// Base64 primary or secondary workspace key.
    pub shared_key: String,
    /// Full collector URL; derived from the workspace id when unset.
    pub endpoint: Option<String>,
}

impl AnalyticsConfig {
    pub fn new(workspace_id: impl Into<String>, shared_key: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            shared_key: shared_key.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn endpoint_url(&self) -> String {
        self.endpoint.clone().unwrap_or_else(|| {
            format!(
                "https://{}.{DEFAULT_ANALYTICS_SUFFIX}/api/logs?api-version={ANALYTICS_API_VERSION}",
                self.workspace_id
            )
        })
    }
}

impl fmt::Debug for AnalyticsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsConfig")
            .field("workspace_id", &self.workspace_id)
            .field("shared_key", &redact(&self.shared_key))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Signed posts to the log-analytics data collector.
///
/// Paginated deliveries go out in chunks; a failed chunk stops the rest, and
/// chunks already accepted stay delivered.
pub struct AnalyticsSink {
    config: AnalyticsConfig,
    url: String,
    client: reqwest::Client,
}

impl AnalyticsSink {
    pub fn new(config: AnalyticsConfig, settings: &FetchSettings) -> Result<Self, HarvestError> {
        let client = build_client(settings, false, Stage::SendingAnalytics)?;
        let url = config.endpoint_url();
        Ok(Self {
            config,
            url,
            client,
        })
    }

    async fn post_chunk(&self, table: TableName, chunk: &[Record]) -> Result<(), HarvestError> {
        let body = serde_json::to_vec(chunk).map_err(|err| {
            HarvestError::new(Stage::SendingAnalytics, FailureKind::Decode, err.to_string())
        })?;
        if serde_json::from_slice::<serde::de::IgnoredAny>(&body).is_err() {
            return Err(HarvestError::new(
                Stage::SendingAnalytics,
                FailureKind::Decode,
                format!("{table}: chunk is not well-formed JSON"),
            ));
        }

        // Fresh date per call; the signature covers it.
        let date = rfc1123(Utc::now());
        let signature = sign(body.len(), &date, &self.config.shared_key).map_err(|err| {
            HarvestError::new(Stage::SendingAnalytics, FailureKind::Signing, err.to_string())
        })?;

        let response = self
            .client
            .post(&self.url)
            .header("Log-Type", table.as_str())
            .header(
                AUTHORIZATION,
                shared_key_authorization(&self.config.workspace_id, &signature),
            )
            .header(CONTENT_TYPE, ANALYTICS_CONTENT_TYPE)
            .header("x-ms-date", date)
            .header("time-generated-field", TIME_GENERATED_FIELD)
            .body(body)
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, Stage::SendingAnalytics))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(HarvestError::new(
                Stage::SendingAnalytics,
                FailureKind::SinkDelivery {
                    status: Some(status.as_u16()),
                },
                format!("{table}: collector answered {status}: {}", detail.trim()),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sink for AnalyticsSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Analytics
    }

    async fn deliver(&self, delivery: &Delivery<'_>) -> Result<DeliveryReceipt, HarvestError> {
        let table = delivery.table;
        let batches = BatchPolicy::for_analytics(delivery.paginated).batches(delivery.records);
        let total = batches.len();
        if total == 0 {
            engine_debug!("{table}: no records for log analytics");
        } else {
            engine_info!(
                "{table}: sending {} records to log analytics in {total} batches",
                delivery.records.len()
            );
        }

        for (index, chunk) in batches.iter().enumerate() {
            self.post_chunk(table, chunk).await.map_err(|mut err| {
                err.message = format!("batch {} of {total}: {}", index + 1, err.message);
                err
            })?;
        }

        Ok(DeliveryReceipt {
            sink: SinkKind::Analytics,
            calls: total,
            records: delivery.records.len(),
            path: None,
        })
    }
}
