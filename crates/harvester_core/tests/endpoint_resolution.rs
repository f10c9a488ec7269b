use harvester_core::{resolve, ApiRoot, HarvestTarget, ResolvedEndpoint, RunWindow, TableName};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

#[test]
fn data_export_settings_go_to_the_cross_region_api_host() {
    assert_eq!(resolve("wdatpprd-weu", "/api/dataexportsettings"), "api-eu");
    assert_eq!(resolve("wdatpprd-weu3", "/api/dataexportsettings"), "api-eu");
    assert_eq!(resolve("wdatpprd-eus", "/api/dataexportsettings"), "api-us");
    assert_eq!(resolve("wdatpprd-eus3", "/api/dataexportsettings"), "api-us");
}

#[test]
fn ordinary_paths_keep_the_logical_location() {
    assert_eq!(resolve("wdatpprd-weu", "/rbac/machine_groups"), "wdatpprd-weu");
    assert_eq!(
        resolve("wdatpprd-eus3", "/api/ine/huntingservice/rules?pageSize=1000"),
        "wdatpprd-eus3"
    );
}

#[test]
fn machine_actions_match_by_prefix() {
    assert_eq!(
        resolve(
            "wdatpprd-eus",
            "/api/machineactions?$filter=lastUpdateDateTimeUtc%20ge%202024"
        ),
        "api-us"
    );
}

#[test]
fn suffixed_families_are_not_claimed_by_their_prefix() {
    let path = "/api/ine/alertsapiservice/workloads/disabled";
    assert_eq!(resolve("wdatpprd-weu3", path), "m365duseprd-weu3");
    assert_eq!(resolve("wdatpprd-weu", path), "m365duseprd-weu");
    assert_eq!(resolve("wdatpprd-eus3", path), "m365duseprd-eus3");
    assert_eq!(resolve("wdatpprd-eus", path), "m365duseprd-eus");

    let settings = "/api/settings/GetAdvancedFeaturesSetting";
    assert_eq!(resolve("wdatpprd-weu3", settings), "wdatpprd-eu3");
    assert_eq!(resolve("wdatpprd-weu", settings), "wdatpprd-eu");
    assert_eq!(resolve("wdatpprd-eus3", settings), "wdatpprd-us3");
    assert_eq!(resolve("wdatpprd-eus", settings), "wdatpprd-us");
}

#[test]
fn unknown_locations_pass_through() {
    assert_eq!(
        resolve("wdatpprd-cus", "/api/dataexportsettings"),
        "wdatpprd-cus"
    );
    assert_eq!(
        resolve("wdatpprd-weu30", "/api/dataexportsettings"),
        "wdatpprd-weu30"
    );
}

#[test]
fn resolved_endpoint_composes_url_and_cursor_root() {
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
    let window = RunWindow::lookback(now, 1);
    let target = HarvestTarget::for_table(TableName::DataExportSettings, &window, None).unwrap();

    let endpoint = ResolvedEndpoint::new(&target, "wdatpprd-weu", &ApiRoot::default());
    assert_eq!(endpoint.hostname, "api-eu");
    assert_eq!(
        endpoint.url,
        "https://api-eu.securitycenter.windows.com/api/dataexportsettings"
    );
    assert_eq!(endpoint.cursor_root_url, None);

    let timeline = HarvestTarget::for_table(TableName::Timeline, &window, Some("abc")).unwrap();
    let endpoint = ResolvedEndpoint::new(
        &timeline,
        "wdatpprd-weu",
        &ApiRoot::Fixed("http://127.0.0.1:9000/".to_string()),
    );
    assert_eq!(endpoint.hostname, "wdatpprd-weu");
    assert!(endpoint
        .url
        .starts_with("http://127.0.0.1:9000/api/detection/experience/timeline/machines/abc/events/?machineId=abc"));
    assert_eq!(
        endpoint.cursor_root_url.as_deref(),
        Some("http://127.0.0.1:9000/api/detection/experience/timeline")
    );
}
