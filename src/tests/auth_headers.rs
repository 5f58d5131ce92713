use std::sync::Arc;

use http::header::{ACCEPT, AUTHORIZATION};
use httpmock::prelude::*;

use crate::config::services::{AuthScheme, HttpScheme, ServiceSettings};
use crate::config::settings::Environment;
use crate::error::AuthError;
use crate::headers::auth_context::StaticAuthContext;
use crate::headers::strategy::AuthHeaderStrategy;
use crate::sources::token_helper::TokenHelper;
use crate::tests::common::*;

fn strategy(environment: Environment) -> AuthHeaderStrategy {
    AuthHeaderStrategy::new(TokenHelper::default(), environment)
}

fn basic_service(scheme: HttpScheme) -> ServiceSettings {
    ServiceSettings {
        auth_scheme: AuthScheme::Basic,
        scheme,
        host: "basic.example.org".into(),
        basic_auth_user_name: "Aladdin".into(),
        basic_auth_password: "OpenSesame".into(),
        ..Default::default()
    }
}

fn api_key_service(use_global_api_key: bool) -> ServiceSettings {
    ServiceSettings {
        auth_scheme: AuthScheme::ApiKey,
        host: "keys.example.org".into(),
        api_key: Some("localkey".into()),
        use_global_api_key,
        ..Default::default()
    }
}

fn authorization(headers: &http::HeaderMap) -> &str {
    headers.get(AUTHORIZATION).unwrap().to_str().unwrap()
}

#[tokio::test]
async fn basic_over_http_is_rejected_outside_development() {
    let err = strategy(Environment::Production)
        .compute_headers(&basic_service(HttpScheme::Http))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InsecureScheme { .. }));
    assert_eq!(
        err.to_string(),
        "Failed to set Basic Authentication header on service agent for host: 'basic.example.org', the actual scheme is 'http' and should be 'https'!"
    );
}

#[tokio::test]
async fn basic_over_https_is_encoded() {
    let headers = strategy(Environment::Production)
        .compute_headers(&basic_service(HttpScheme::Https))
        .await
        .unwrap();

    assert_eq!(authorization(&headers), "Basic QWxhZGRpbjpPcGVuU2VzYW1l");
    assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
}

#[tokio::test]
async fn basic_over_http_is_allowed_in_development_and_test() {
    for environment in [Environment::Development, Environment::Test] {
        let headers = strategy(environment)
            .compute_headers(&basic_service(HttpScheme::Http))
            .await
            .unwrap();
        assert_eq!(authorization(&headers), "Basic QWxhZGRpbjpPcGVuU2VzYW1l");
    }
}

#[tokio::test]
async fn basic_domain_prefixes_user_name() {
    let mut settings = basic_service(HttpScheme::Https);
    settings.basic_auth_domain = Some("ICA".into());

    let headers = strategy(Environment::Production).compute_headers(&settings).await.unwrap();
    assert_eq!(authorization(&headers), "Basic SUNBXEFsYWRkaW46T3BlblNlc2FtZQ==");
}

#[tokio::test]
async fn bearer_forwards_user_token_from_context() {
    let context = Arc::new(StaticAuthContext::new("user-token"));
    let strategy = strategy(Environment::Production).with_auth_context(context.clone());
    let settings = ServiceSettings {
        auth_scheme: AuthScheme::Bearer,
        ..Default::default()
    };

    let headers = strategy.request_headers(&settings).await.unwrap();
    assert_eq!(authorization(&headers), "Bearer user-token");

    context.set_user_token("rotated");
    let headers = strategy.request_headers(&settings).await.unwrap();
    assert_eq!(authorization(&headers), "Bearer rotated");

    context.clear();
    let err = strategy.request_headers(&settings).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingAuthContext));
}

#[tokio::test]
async fn bearer_without_context_fails() {
    let settings = ServiceSettings {
        auth_scheme: AuthScheme::Bearer,
        ..Default::default()
    };
    let err = strategy(Environment::Production).compute_headers(&settings).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingAuthContext));
}

#[tokio::test]
async fn oauth_uses_cached_access_token() {
    let server = MockServer::start_async().await;
    let mock = mock_token_endpoint(
        &server,
        json!({"access_token": "service-token", "token_type": "Bearer", "expires_in": 3600}),
    )
    .await;
    let strategy = strategy(Environment::Production);
    let settings = oauth_service(&server);

    for _ in 0..3 {
        let headers = strategy.request_headers(&settings).await.unwrap();
        assert_eq!(authorization(&headers), "Bearer service-token");
    }
    assert_eq!(mock.hits_async().await, 1);
}

#[tokio::test]
async fn api_key_prefers_global_key_when_requested() {
    let strategy = strategy(Environment::Production).with_global_api_key(Some("globalkey".into()));

    let global = strategy.compute_headers(&api_key_service(true)).await.unwrap();
    assert_eq!(global.get("ApiKey").unwrap(), "globalkey");

    let local = strategy.compute_headers(&api_key_service(false)).await.unwrap();
    assert_eq!(local.get("ApiKey").unwrap(), "localkey");
}

#[tokio::test]
async fn api_key_uses_configured_header_name() {
    let mut settings = api_key_service(false);
    settings.api_key_header_name = "X-Api-Key".into();

    let headers = strategy(Environment::Production).compute_headers(&settings).await.unwrap();
    assert_eq!(headers.get("x-api-key").unwrap(), "localkey");
    assert!(headers.get("ApiKey").is_none());
}

#[tokio::test]
async fn api_key_missing_is_an_error() {
    let err = strategy(Environment::Production)
        .compute_headers(&api_key_service(true))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::MissingApiKey { ref header } if header == "ApiKey"));
}

#[tokio::test]
async fn no_auth_scheme_adds_nothing() {
    let settings = ServiceSettings::default();
    let strategy = strategy(Environment::Production);

    assert!(strategy.compute_headers(&settings).await.unwrap().is_empty());

    let static_headers = strategy.static_headers(&settings).unwrap();
    assert_eq!(static_headers.len(), 1);
    assert_eq!(static_headers.get(ACCEPT).unwrap(), "application/json");
}

#[tokio::test]
async fn static_and_request_headers_split_by_scheme() {
    let strategy = strategy(Environment::Production).with_global_api_key(Some("globalkey".into()));
    let mut settings = api_key_service(true);
    settings.headers.insert("X-Correlation".into(), "abc".into());

    let static_headers = strategy.static_headers(&settings).unwrap();
    assert_eq!(static_headers.get("ApiKey").unwrap(), "globalkey");
    assert_eq!(static_headers.get("x-correlation").unwrap(), "abc");
    assert!(strategy.request_headers(&settings).await.unwrap().is_empty());

    let bearer = ServiceSettings {
        auth_scheme: AuthScheme::Bearer,
        ..Default::default()
    };
    assert!(static_headers_have_no_auth(&strategy, &bearer));
    assert!(AuthHeaderStrategy::is_per_request(AuthScheme::Bearer));
    assert!(AuthHeaderStrategy::is_per_request(AuthScheme::OAuthClientCredentials));
    assert!(!AuthHeaderStrategy::is_per_request(AuthScheme::Basic));
}

fn static_headers_have_no_auth(strategy: &AuthHeaderStrategy, settings: &ServiceSettings) -> bool {
    strategy
        .static_headers(settings)
        .map(|headers| headers.get(AUTHORIZATION).is_none())
        .unwrap_or(false)
}

#[tokio::test]
async fn invalid_extra_header_is_reported() {
    let mut settings = ServiceSettings::default();
    settings.headers.insert("Bad Header".into(), "x".into());

    let err = strategy(Environment::Production).static_headers(&settings).unwrap_err();
    assert!(matches!(err, AuthError::InvalidHeader { ref name, .. } if name == "Bad Header"));
}
