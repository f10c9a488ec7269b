use std::path::PathBuf;

use clap::Parser;

/// Collects Defender for Endpoint portal telemetry and ships it to files,
/// a log-ingestion collector or a log-analytics workspace.
#[derive(Parser, Debug, Clone)]
#[command(name = "defender_harvester")]
#[command(author, version)]
pub struct Cli {
    /// Hours of history to collect
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub lookback: u32,

    /// Portal location code, e.g. wdatpprd-weu or wdatpprd-eus3
    #[arg(long, default_value = "wdatpprd-weu")]
    pub location: String,

    /// Send records to the log-analytics workspace
    #[arg(long)]
    pub sentinel: bool,

    /// Send records to the log-ingestion collector
    #[arg(long)]
    pub splunk: bool,

    /// Write each target's response to a JSON file
    #[arg(long)]
    pub files: bool,

    /// Download the hunting schema reference (always to file)
    #[arg(long)]
    pub schema: bool,

    /// Collect the device timeline of --machineid
    #[arg(long)]
    pub timeline: bool,

    /// Device id for --timeline
    #[arg(long = "machineid")]
    pub machine_id: Option<String>,

    /// Collect machine actions (portal and public API)
    #[arg(long = "machineactions")]
    pub machine_actions: bool,

    /// Collect custom detection rule state
    #[arg(long = "customdetections")]
    pub custom_detections: bool,

    /// Collect advanced feature settings
    #[arg(long = "featuresettings")]
    pub feature_settings: bool,

    /// Collect device groups
    #[arg(long = "machinegroups")]
    pub machine_groups: bool,

    /// Collect connected application statistics
    #[arg(long = "connectedapps")]
    pub connected_apps: bool,

    /// Collect executed hunting queries
    #[arg(long = "executedqueries")]
    pub executed_queries: bool,

    /// Collect disabled alert service workloads
    #[arg(long = "alertservicesettings")]
    pub alert_service_settings: bool,

    /// Collect data export settings
    #[arg(long = "dataexportsettings")]
    pub data_export_settings: bool,

    /// Bearer token for the portal; skips the client-credentials grant
    #[arg(long = "accesstoken")]
    pub access_token: Option<String>,

    /// Log at debug level, including every raw response
    #[arg(long)]
    pub debug: bool,

    /// Directory for --files output
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Connect and request timeout in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Maximum pages followed for one paginated target
    #[arg(long, default_value_t = 10_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_pages: u64,

    /// Skip TLS certificate checks for the log-ingestion collector
    #[arg(long)]
    pub splunk_insecure: bool,

    #[arg(long, env = "SentinelWorkspaceID", hide = true)]
    pub sentinel_workspace_id: Option<String>,

    #[arg(long, env = "SentinelSharedKey", hide = true, hide_env_values = true)]
    pub sentinel_shared_key: Option<String>,

    #[arg(long, env = "SplunkUri", hide = true)]
    pub splunk_uri: Option<String>,

    #[arg(long, env = "SplunkToken", hide = true, hide_env_values = true)]
    pub splunk_token: Option<String>,

    #[arg(long, env = "AZURE_TENANT_ID", hide = true)]
    pub tenant_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_ID", hide = true)]
    pub client_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_SECRET", hide = true, hide_env_values = true)]
    pub client_secret: Option<String>,
}
