use harvester_engine::{ClientCredentials, FailureKind, FetchSettings, StaticToken, Stage, TokenSource};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials(server: &MockServer) -> ClientCredentials {
    ClientCredentials::new("tenant-1", "client-1", "s3cret/value", &FetchSettings::default())
        .unwrap()
        .with_authority(format!("{}/", server.uri()))
}

#[tokio::test]
async fn client_credentials_grant_returns_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_secret=s3cret%2Fvalue"))
        .and(body_string_contains(
            "scope=https%3A%2F%2Fsecuritycenter.microsoft.com%2Fmtp%2F.default",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "eyJ0eXAi"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = credentials(&server).bearer_token().await.expect("token");
    assert_eq!(token, "eyJ0eXAi");
}

#[tokio::test]
async fn rejected_grant_reports_the_description() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&server)
        .await;

    let err = credentials(&server).bearer_token().await.unwrap_err();
    assert_eq!(err.stage, Stage::Authenticating);
    assert_eq!(err.kind, FailureKind::Authentication);
    assert!(err.message.contains("AADSTS7000215"), "{}", err.message);
}

#[tokio::test]
async fn static_token_is_trimmed_and_redacted() {
    let token = StaticToken::new(" abcdefghijklmnop \n");
    assert_eq!(token.bearer_token().await.unwrap(), "abcdefghijklmnop");
    assert!(!format!("{token:?}").contains("abcdefghijklmnop"));
}
