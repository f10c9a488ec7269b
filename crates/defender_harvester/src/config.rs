use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use harvester_core::{plan, rfc1123, sign, RunPlan, RunWindow, Selection, TableName};
use harvester_engine::{AnalyticsConfig, FetchSettings, FileSinkConfig, IngestionConfig, SinkConfig};

use crate::cli::Cli;

/// How the bearer token for the portal is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    AccessToken(String),
    ClientCredentials {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
}

/// Everything a run needs, resolved from the command line and environment
/// once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub window: RunWindow,
    pub plan: RunPlan,
    pub sinks: SinkConfig,
    pub fetch: FetchSettings,
    pub location: String,
    pub credential: Credential,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli, now: DateTime<Utc>) -> Result<Self> {
        let window = RunWindow::lookback(now, cli.lookback);
        let plan = plan(&selection(cli), &window)?;
        let fetch = FetchSettings {
            connect_timeout: Duration::from_secs(cli.timeout_secs),
            request_timeout: Duration::from_secs(cli.timeout_secs),
            max_pages: usize::try_from(cli.max_pages).context("--max-pages is too large")?,
            ..FetchSettings::default()
        };
        let mut sinks = if plan.mode.file_only() {
            SinkConfig::default()
        } else {
            sink_config(cli)?
        };
        if plan.mode.always_writes_file() {
            sinks.file = Some(file_sink(cli));
        }

        Ok(Self {
            window,
            plan,
            sinks,
            fetch,
            location: cli.location.trim().to_string(),
            credential: credential(cli)?,
        })
    }
}

fn selection(cli: &Cli) -> Selection {
    let mut tables = BTreeSet::new();
    let flags = [
        (cli.machine_actions, TableName::MachineActions),
        (cli.machine_actions, TableName::MachineActionsApi),
        (cli.custom_detections, TableName::CustomDetectionState),
        (cli.feature_settings, TableName::AdvancedFeatureSettings),
        (cli.machine_groups, TableName::MachineGroups),
        (cli.connected_apps, TableName::ConnectedAppStats),
        (cli.executed_queries, TableName::ExecutedQueries),
        (cli.alert_service_settings, TableName::AlertServiceSettings),
        (cli.data_export_settings, TableName::DataExportSettings),
    ];
    for (enabled, table) in flags {
        if enabled {
            tables.insert(table);
        }
    }

    Selection {
        schema: cli.schema,
        timeline: cli.timeline,
        machine_id: cli.machine_id.clone(),
        tables,
    }
}

fn file_sink(cli: &Cli) -> FileSinkConfig {
    FileSinkConfig {
        directory: cli.output_dir.clone(),
    }
}

fn sink_config(cli: &Cli) -> Result<SinkConfig> {
    let mut sinks = SinkConfig::default();

    if cli.files {
        sinks.file = Some(file_sink(cli));
    }

    if cli.splunk {
        let url = required(&cli.splunk_uri, "SplunkUri", "--splunk")?;
        let token = required(&cli.splunk_token, "SplunkToken", "--splunk")?;
        let mut config = IngestionConfig::new(url, token);
        config.accept_invalid_certs = cli.splunk_insecure;
        sinks.ingestion = Some(config);
    }

    if cli.sentinel {
        let workspace_id = required(&cli.sentinel_workspace_id, "SentinelWorkspaceID", "--sentinel")?;
        let shared_key = required(&cli.sentinel_shared_key, "SentinelSharedKey", "--sentinel")?;
        sign(0, &rfc1123(Utc::now()), &shared_key)
            .context("SentinelSharedKey is not a usable base64 key")?;
        sinks.analytics = Some(AnalyticsConfig::new(workspace_id, shared_key));
    }

    Ok(sinks)
}

fn credential(cli: &Cli) -> Result<Credential> {
    if let Some(token) = cli.access_token.as_deref().map(str::trim) {
        if token.is_empty() {
            bail!("--accesstoken is empty");
        }
        return Ok(Credential::AccessToken(token.to_string()));
    }

    let missing = "pass --accesstoken or set AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET";
    Ok(Credential::ClientCredentials {
        tenant_id: present(&cli.tenant_id).context(missing)?,
        client_id: present(&cli.client_id).context(missing)?,
        client_secret: present(&cli.client_secret).context(missing)?,
    })
}

fn required(value: &Option<String>, variable: &str, flag: &str) -> Result<String> {
    present(value).with_context(|| format!("{flag} needs {variable} to be set"))
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
