use std::fmt;

use engine_logging::{engine_debug, engine_info, redact};
use harvester_core::ingestion_events;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;

use crate::dispatch::{Delivery, Sink};
use crate::fetch::{build_client, map_reqwest_error, FetchSettings};
use crate::{DeliveryReceipt, FailureKind, HarvestError, SinkKind, Stage};

pub const DEFAULT_INGESTION_SCHEME: &str = "Splunk";

#[derive(Clone, PartialEq, Eq)]
pub struct IngestionConfig {
    pub url: String,
    pub token: String,
    /// `Authorization: <scheme> <token>`
    pub scheme: String,
    /// Collectors are commonly fronted by self-signed certificates.
    pub accept_invalid_certs: bool,
}

impl IngestionConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            scheme: DEFAULT_INGESTION_SCHEME.to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl fmt::Debug for IngestionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionConfig")
            .field("url", &self.url)
            .field("token", &redact(&self.token))
            .field("scheme", &self.scheme)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// Posts every record of a delivery as one array of `{event, sourcetype}`.
pub struct IngestionSink {
    config: IngestionConfig,
    client: reqwest::Client,
}

impl IngestionSink {
    pub fn new(config: IngestionConfig, settings: &FetchSettings) -> Result<Self, HarvestError> {
        let client = build_client(settings, config.accept_invalid_certs, Stage::SendingIngestion)?;
        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl Sink for IngestionSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Ingestion
    }

    async fn deliver(&self, delivery: &Delivery<'_>) -> Result<DeliveryReceipt, HarvestError> {
        let table = delivery.table;
        if delivery.records.is_empty() {
            engine_debug!("{table}: no records for log ingestion");
            return Ok(DeliveryReceipt {
                sink: SinkKind::Ingestion,
                calls: 0,
                records: 0,
                path: None,
            });
        }

        let events = ingestion_events(table, delivery.records);
        let body = serde_json::to_vec(&events).map_err(|err| {
            HarvestError::new(Stage::SendingIngestion, FailureKind::Decode, err.to_string())
        })?;

        engine_info!("{table}: sending {} events to log ingestion", events.len());
        let response = self
            .client
            .post(&self.config.url)
            .header(
                AUTHORIZATION,
                format!("{} {}", self.config.scheme, self.config.token),
            )
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, Stage::SendingIngestion))?;

        let status = response.status();
        if status != StatusCode::OK {
            let detail = response.text().await.unwrap_or_default();
            return Err(HarvestError::new(
                Stage::SendingIngestion,
                FailureKind::SinkDelivery {
                    status: Some(status.as_u16()),
                },
                format!("{table}: collector answered {status}: {}", detail.trim()),
            ));
        }

        Ok(DeliveryReceipt {
            sink: SinkKind::Ingestion,
            calls: 1,
            records: events.len(),
            path: None,
        })
    }
}
