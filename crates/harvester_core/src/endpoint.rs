//! Regional hostname resolution.
//!
//! The service is sharded per sub-API across independently named regional
//! deployments, so the tenant's logical location alone does not say which
//! host serves a request. This table is the single place that topology lives.

use crate::HarvestTarget;

pub const DEFAULT_DOMAIN_SUFFIX: &str = "securitycenter.windows.com";

/// Request paths that are served from a host other than the logical location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialPath {
    DataExport,
    MachineActions,
    AlertServiceSettings,
    AdvancedFeatureSettings,
}

impl SpecialPath {
    fn classify(request_path: &str) -> Option<Self> {
        let path = request_path.split('?').next().unwrap_or(request_path);
        match path {
            "/api/dataexportsettings" => Some(SpecialPath::DataExport),
            "/api/ine/alertsapiservice/workloads/disabled" => {
                Some(SpecialPath::AlertServiceSettings)
            }
            "/api/settings/GetAdvancedFeaturesSetting" => {
                Some(SpecialPath::AdvancedFeatureSettings)
            }
            p if p.starts_with("/api/machineactions") => Some(SpecialPath::MachineActions),
            _ => None,
        }
    }
}

struct RegionFamily {
    code: &'static str,
    /// Public API host (data export settings, machine actions).
    api_host: &'static str,
    alerts_host: &'static str,
    settings_host: &'static str,
}

impl RegionFamily {
    fn host_for(&self, special: SpecialPath) -> &'static str {
        match special {
            SpecialPath::DataExport | SpecialPath::MachineActions => self.api_host,
            SpecialPath::AlertServiceSettings => self.alerts_host,
            SpecialPath::AdvancedFeatureSettings => self.settings_host,
        }
    }
}

// Codes are matched exactly, so `wdatpprd-weu` never claims `wdatpprd-weu3`.
const REGION_FAMILIES: &[RegionFamily] = &[
    RegionFamily {
        code: "wdatpprd-weu3",
        api_host: "api-eu",
        alerts_host: "m365duseprd-weu3",
        settings_host: "wdatpprd-eu3",
    },
    RegionFamily {
        code: "wdatpprd-eus3",
        api_host: "api-us",
        alerts_host: "m365duseprd-eus3",
        settings_host: "wdatpprd-us3",
    },
    RegionFamily {
        code: "wdatpprd-weu",
        api_host: "api-eu",
        alerts_host: "m365duseprd-weu",
        settings_host: "wdatpprd-eu",
    },
    RegionFamily {
        code: "wdatpprd-eus",
        api_host: "api-us",
        alerts_host: "m365duseprd-eus",
        settings_host: "wdatpprd-us",
    },
];

/// Maps a logical location and request path to the hostname that serves it.
///
/// Unknown locations and ordinary paths come back verbatim.
pub fn resolve(location: &str, request_path: &str) -> String {
    let family = REGION_FAMILIES
        .iter()
        .find(|family| family.code.eq_ignore_ascii_case(location.trim()));

    match (family, SpecialPath::classify(request_path)) {
        (Some(family), Some(special)) => family.host_for(special).to_string(),
        _ => location.to_string(),
    }
}

/// How a hostname becomes a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRoot {
    /// `https://<hostname>.<domain_suffix>`
    Regional { domain_suffix: String },
    /// Every hostname maps to this base URL (proxies, tests).
    Fixed(String),
}

impl Default for ApiRoot {
    fn default() -> Self {
        ApiRoot::Regional {
            domain_suffix: DEFAULT_DOMAIN_SUFFIX.to_string(),
        }
    }
}

impl ApiRoot {
    pub fn base_url(&self, hostname: &str) -> String {
        match self {
            ApiRoot::Regional { domain_suffix } => format!("https://{hostname}.{domain_suffix}"),
            ApiRoot::Fixed(base) => base.trim_end_matches('/').to_string(),
        }
    }
}

/// A target bound to the concrete host chosen for this fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint<'a> {
    pub target: &'a HarvestTarget,
    pub hostname: String,
    pub url: String,
    /// Base the pagination cursor is appended to, for paginated targets.
    pub cursor_root_url: Option<String>,
}

impl<'a> ResolvedEndpoint<'a> {
    pub fn new(target: &'a HarvestTarget, location: &str, root: &ApiRoot) -> Self {
        let hostname = resolve(location, &target.path_and_query());
        let base = root.base_url(&hostname);
        let url = format!("{base}{}", target.path_and_query());
        let cursor_root_url = target.cursor_root.map(|root| format!("{base}{root}"));
        Self {
            target,
            hostname,
            url,
            cursor_root_url,
        }
    }
}
