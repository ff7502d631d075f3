//! Tests for the auth module

use super::authenticator::{sign_assertion, JwtClaims};
use super::*;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_KEY: &str = include_str!("../../tests/fixtures/test_key.pem");

fn service_account(token_uri: String) -> AuthConfig {
    AuthConfig::ServiceAccount {
        client_email: "tap@test-project.iam.gserviceaccount.com".to_string(),
        private_key: TEST_KEY.to_string(),
        token_uri,
        scopes: vec![DATASTORE_SCOPE.to_string()],
        token_lifetime_seconds: 3600,
    }
}

fn read_claims(jwt: &str) -> JwtClaims {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    decode::<JwtClaims>(jwt, &DecodingKey::from_secret(&[]), &validation)
        .unwrap()
        .claims
}

#[tokio::test]
async fn test_no_auth() {
    let auth = Authenticator::new(AuthConfig::None);
    let req = reqwest::Client::new().get("https://example.com/api");

    let built = auth.apply(req).await.unwrap().build().unwrap();
    assert!(built.headers().get("Authorization").is_none());
}

#[tokio::test]
async fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "static-token".to_string(),
    });
    let req = reqwest::Client::new().get("https://example.com/api");

    let built = auth.apply(req).await.unwrap().build().unwrap();
    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "Bearer static-token"
    );
}

#[test]
fn test_sign_assertion_claims() {
    let scopes = vec![DATASTORE_SCOPE.to_string()];
    let jwt = sign_assertion(
        "tap@test-project.iam.gserviceaccount.com",
        TEST_KEY,
        "https://oauth2.example.com/token",
        &scopes,
        600,
    )
    .unwrap();

    let claims = read_claims(&jwt);
    assert_eq!(claims.iss, "tap@test-project.iam.gserviceaccount.com");
    assert_eq!(claims.aud, "https://oauth2.example.com/token");
    assert_eq!(claims.scope, DATASTORE_SCOPE);
    assert_eq!(claims.exp - claims.iat, 600);
}

#[test]
fn test_sign_assertion_invalid_key() {
    let err = sign_assertion("a@b", "not a pem", "https://x", &[], 60).unwrap_err();
    assert!(err.to_string().contains("Invalid private key"));
}

#[tokio::test]
async fn test_service_account_exchange_and_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("jwt-bearer"))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.exchanged",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(service_account(format!("{}/token", mock_server.uri())));
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let req = client.get("https://example.com/api");
        let built = auth.apply(req).await.unwrap().build().unwrap();
        assert_eq!(
            built.headers().get("Authorization").unwrap(),
            "Bearer ya29.exchanged"
        );
    }
}

#[tokio::test]
async fn test_service_account_exchange_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(service_account(format!("{}/token", mock_server.uri())));
    let req = reqwest::Client::new().get("https://example.com/api");

    let err = auth.apply(req).await.unwrap_err();
    assert!(matches!(err, crate::Error::Auth { .. }));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_clear_cache_forces_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh"
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(service_account(format!("{}/token", mock_server.uri())));
    let client = reqwest::Client::new();

    auth.apply(client.get("https://example.com")).await.unwrap();
    auth.clear_cache().await;
    auth.apply(client.get("https://example.com")).await.unwrap();
}
