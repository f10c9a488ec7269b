use chrono::{TimeZone, Utc};
use harvester_core::{canonical_string, rfc1123, shared_key_authorization, sign, SigningError};

// base64("0123456789abcdef0123456789abcdef")
const KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
const DATE: &str = "Tue, 01 Jan 2024 00:00:00 GMT";

#[test]
fn canonical_string_is_byte_exact() {
    assert_eq!(
        canonical_string(100, DATE),
        "POST\n100\napplication/json\nx-ms-date:Tue, 01 Jan 2024 00:00:00 GMT\n/api/logs"
    );
}

#[test]
fn signature_matches_known_answer() {
    assert_eq!(
        sign(100, DATE, KEY).unwrap(),
        "2GCSzbWJyoy9KiYaYL1fKiiZaF9pF8jeMT5s90FodBE="
    );
}

#[test]
fn signature_is_deterministic_and_sensitive_to_every_field() {
    let base = sign(100, DATE, KEY).unwrap();
    assert_eq!(base, sign(100, DATE, KEY).unwrap());

    assert_ne!(base, sign(101, DATE, KEY).unwrap());
    assert_ne!(base, sign(100, "Tue, 01 Jan 2024 00:00:01 GMT", KEY).unwrap());
    assert_ne!(
        base,
        sign(100, DATE, "MTIzNDU2Nzg5MGFiY2RlZjEyMzQ1Njc4OTBhYmNkZWY=").unwrap()
    );
}

#[test]
fn malformed_shared_key_is_a_signing_error() {
    assert!(matches!(
        sign(1, DATE, "not base64!"),
        Err(SigningError::InvalidKey(_))
    ));
    assert!(matches!(sign(1, DATE, ""), Err(SigningError::EmptyKey)));
}

#[test]
fn authorization_and_date_formats() {
    assert_eq!(
        shared_key_authorization("ws-id", "c2ln"),
        "SharedKey ws-id:c2ln"
    );
    let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(rfc1123(ts), "Tue, 02 Jan 2024 03:04:05 GMT");
}
