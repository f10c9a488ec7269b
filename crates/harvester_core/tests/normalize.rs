use harvester_core::{decode_page, normalize, DecodeError, TableName};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn machine_actions_unwrap_results() {
    let body = br#"{"Results":[{"a":1},{"b":2}],"Count":2}"#;
    let records = normalize(TableName::MachineActions, body).unwrap();
    assert_eq!(records, vec![json!({"a":1}), json!({"b":2})]);
}

#[test]
fn api_variant_falls_back_to_value() {
    let body = br#"{"@odata.context":"x","value":[{"id":"1"}]}"#;
    let records = normalize(TableName::MachineActionsApi, body).unwrap();
    assert_eq!(records, vec![json!({"id":"1"})]);

    let records = normalize(TableName::DataExportSettings, body).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn machine_groups_unwrap_items() {
    let body = br#"{"items":[{"x":true}]}"#;
    let records = normalize(TableName::MachineGroups, body).unwrap();
    assert_eq!(records, vec![json!({"x":true})]);
}

#[test]
fn bare_tables_pass_arrays_through_and_wrap_objects() {
    let body = br#"[{"rule":1},{"rule":2},3]"#;
    let records = normalize(TableName::CustomDetectionState, body).unwrap();
    assert_eq!(records, vec![json!({"rule":1}), json!({"rule":2}), json!(3)]);

    let body = br#"{"AutoResolveInvestigatedAlerts":true}"#;
    let records = normalize(TableName::AdvancedFeatureSettings, body).unwrap();
    assert_eq!(records, vec![json!({"AutoResolveInvestigatedAlerts":true})]);
}

#[test]
fn malformed_body_is_a_decode_error() {
    let err = normalize(TableName::ConnectedAppStats, b"<html>").unwrap_err();
    assert!(matches!(err, DecodeError::InvalidJson { .. }));
    assert!(err.to_string().starts_with("MdeConnectedAppStats"));
}

#[test]
fn missing_envelope_is_a_decode_error() {
    let err = normalize(TableName::MachineGroups, br#"{"value":[]}"#).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::UnexpectedShape {
            table: TableName::MachineGroups,
            ..
        }
    ));

    let err = normalize(TableName::MachineActions, br#"[1,2]"#).unwrap_err();
    assert!(matches!(err, DecodeError::UnexpectedShape { .. }));

    let err = normalize(TableName::ExecutedQueries, b"42").unwrap_err();
    assert!(matches!(err, DecodeError::UnexpectedShape { .. }));
}

#[test]
fn timeline_page_exposes_items_and_cursor() {
    let body = br#"{"Items":[{"e":1},{"e":2}],"Prev":"/machines/m/events/?cursor=2","Next":null}"#;
    let page = decode_page(TableName::Timeline, body).unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next_cursor(), Some("/machines/m/events/?cursor=2"));
}

#[test]
fn empty_or_null_cursor_marks_the_last_page() {
    let last = decode_page(TableName::Timeline, br#"{"Items":[],"Prev":""}"#).unwrap();
    assert_eq!(last.next_cursor(), None);

    let null = decode_page(TableName::Timeline, br#"{"Items":null,"Prev":null}"#).unwrap();
    assert!(null.items.is_empty());
    assert_eq!(null.next_cursor(), None);
}
