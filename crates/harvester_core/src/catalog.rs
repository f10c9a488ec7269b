use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use url::form_urlencoded::byte_serialize;

use crate::PlanError;

/// Relative root the timeline cursor is appended to.
pub const TIMELINE_CURSOR_ROOT: &str = "/api/detection/experience/timeline";

/// Stable identifier of one harvestable resource. Drives file naming, sink
/// routing (`Log-Type`, `sourcetype`) and envelope selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableName {
    SchemaReference,
    Timeline,
    MachineActions,
    MachineActionsApi,
    CustomDetectionState,
    AdvancedFeatureSettings,
    MachineGroups,
    ConnectedAppStats,
    ExecutedQueries,
    AlertServiceSettings,
    DataExportSettings,
}

impl TableName {
    /// Catalog order; a multi-target run visits tables in this order.
    pub const ALL: [TableName; 11] = [
        TableName::SchemaReference,
        TableName::Timeline,
        TableName::MachineActions,
        TableName::MachineActionsApi,
        TableName::CustomDetectionState,
        TableName::AdvancedFeatureSettings,
        TableName::MachineGroups,
        TableName::ConnectedAppStats,
        TableName::ExecutedQueries,
        TableName::AlertServiceSettings,
        TableName::DataExportSettings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TableName::SchemaReference => "MdeSchemaReference",
            TableName::Timeline => "MdeTimeline",
            TableName::MachineActions => "MdeMachineActions",
            TableName::MachineActionsApi => "MdeMachineActionsApi",
            TableName::CustomDetectionState => "MdeCustomDetectionState",
            TableName::AdvancedFeatureSettings => "MdeAdvancedFeatureSettings",
            TableName::MachineGroups => "MdeMachineGroups",
            TableName::ConnectedAppStats => "MdeConnectedAppStats",
            TableName::ExecutedQueries => "MdeExecutedQueries",
            TableName::AlertServiceSettings => "M365AlertServiceSettings",
            TableName::DataExportSettings => "M365DataExportSettings",
        }
    }

    /// The response envelope this table's API wraps its records in.
    pub fn envelope(self) -> Envelope {
        match self {
            TableName::MachineActions
            | TableName::MachineActionsApi
            | TableName::AlertServiceSettings
            | TableName::DataExportSettings => Envelope::ResultsOrValue,
            TableName::MachineGroups => Envelope::Items,
            TableName::SchemaReference
            | TableName::Timeline
            | TableName::CustomDetectionState
            | TableName::AdvancedFeatureSettings
            | TableName::ConnectedAppStats
            | TableName::ExecutedQueries => Envelope::Bare,
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope shapes, keyed by table rather than sniffed from the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// `Results` (portal endpoints) or `value` (OData API endpoints).
    ResultsOrValue,
    /// `items`.
    Items,
    /// The body is the payload: an array of records or a single object.
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One logical resource to collect. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestTarget {
    pub table: TableName,
    pub path: String,
    pub query: String,
    pub method: HttpMethod,
    pub body: Option<String>,
    /// Root the returned cursor is appended to; `Some` for paginated targets.
    pub cursor_root: Option<&'static str>,
}

impl HarvestTarget {
    pub fn paginated(&self) -> bool {
        self.cursor_root.is_some()
    }

    pub fn path_and_query(&self) -> String {
        format!("{}{}", self.path, self.query)
    }

    /// Builds the catalog entry for `table` over `window`.
    ///
    /// The timeline needs a machine id; every other table ignores it.
    pub fn for_table(
        table: TableName,
        window: &RunWindow,
        machine_id: Option<&str>,
    ) -> Result<Self, PlanError> {
        let from = query_escape(&window.from_timestamp());
        let now = query_escape(&window.now_timestamp());

        let target = match table {
            TableName::SchemaReference => get(table, "/api/ine/huntingservice/schema", ""),
            TableName::Timeline => {
                let id = validate_machine_id(machine_id)?;
                HarvestTarget {
                    cursor_root: Some(TIMELINE_CURSOR_ROOT),
                    ..get(
                        table,
                        &format!("/api/detection/experience/timeline/machines/{id}/events/"),
                        &format!(
                            "?machineId={id}&doNotUseCache=false&forceUseCache=false&fromDate={from}&pageSize=1000"
                        ),
                    )
                }
            }
            TableName::MachineActions => get(
                table,
                "/api/autoir/actioncenterui/history-actions",
                &format!(
                    "/?useMtpApi=true&fromDate={from}&toDate={now}&sortByField=eventTime&sortOrder=Descending"
                ),
            ),
            TableName::MachineActionsApi => {
                // OData wants %20 rather than '+' for spaces.
                let filter = query_escape(&format!(" ge {}", window.from_timestamp()))
                    .replace('+', "%20");
                get(
                    table,
                    "/api/machineactions",
                    &format!("?$filter=lastUpdateDateTimeUtc{filter}"),
                )
            }
            TableName::CustomDetectionState => {
                get(table, "/api/ine/huntingservice/rules", "?pageSize=1000")
            }
            TableName::AdvancedFeatureSettings => {
                get(table, "/api/settings/GetAdvancedFeaturesSetting", "")
            }
            TableName::MachineGroups => get(table, "/rbac/machine_groups", ""),
            TableName::ConnectedAppStats => get(table, "/api/cloud/portal/apps/all", ""),
            TableName::ExecutedQueries => {
                let body = serde_json::json!({
                    "startTime": window.from_timestamp(),
                    "endTime": window.now_timestamp(),
                });
                HarvestTarget {
                    method: HttpMethod::Post,
                    body: Some(body.to_string()),
                    ..get(table, "/api/ine/huntingservice/reports", "")
                }
            }
            TableName::AlertServiceSettings => get(
                table,
                "/api/ine/alertsapiservice/workloads/disabled",
                "?includeDetails=true",
            ),
            TableName::DataExportSettings => get(table, "/api/dataexportsettings", ""),
        };
        Ok(target)
    }
}

fn get(table: TableName, path: &str, query: &str) -> HarvestTarget {
    HarvestTarget {
        table,
        path: path.to_string(),
        query: query.to_string(),
        method: HttpMethod::Get,
        body: None,
        cursor_root: None,
    }
}

fn validate_machine_id(machine_id: Option<&str>) -> Result<&str, PlanError> {
    let id = machine_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(PlanError::MissingMachineId)?;
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(PlanError::InvalidMachineId(id.to_string()));
    }
    Ok(id)
}

fn query_escape(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// The lookback window shared by every target of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunWindow {
    pub from: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl RunWindow {
    pub fn lookback(now: DateTime<Utc>, hours: u32) -> Self {
        Self {
            from: now - Duration::hours(i64::from(hours)),
            now,
        }
    }

    /// RFC 3339 with as many fractional digits as needed.
    pub fn from_timestamp(&self) -> String {
        self.from.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Millisecond precision, `Z` suffix.
    pub fn now_timestamp(&self) -> String {
        self.now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}
