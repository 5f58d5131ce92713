// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::Arc;

use httpmock::prelude::*;
use httpmock::Mock;

use crate::cache::token_cache::TokenCache;
use crate::config::services::{AuthScheme, HttpScheme, ServiceSettings};
use crate::helpers::time::{Clock, ManualClock};
use crate::sources::oauth2::TokenAcquirer;
use crate::sources::token_helper::TokenHelper;

pub const TOKEN_PATH: &str = "/oauth/token";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// Settings for a plain http service on localhost:`port`.
pub fn local_service(auth_scheme: AuthScheme, port: u16) -> ServiceSettings {
    ServiceSettings {
        auth_scheme,
        scheme: HttpScheme::Http,
        host: "127.0.0.1".into(),
        port: Some(port.to_string()),
        ..Default::default()
    }
}

/// OAuth settings whose token endpoint is `TOKEN_PATH` on `server`.
pub fn oauth_service(server: &MockServer) -> ServiceSettings {
    ServiceSettings {
        oauth_path_addition: TOKEN_PATH.trim_start_matches('/').into(),
        oauth_client_id: "clientId".into(),
        oauth_client_secret: "clientSecret".into(),
        oauth_scope: "scope".into(),
        ..local_service(AuthScheme::OAuthClientCredentials, server.port())
    }
}

/// Token endpoint answering every POST with `body`.
pub async fn mock_token_endpoint<'a>(server: &'a MockServer, body: serde_json::Value) -> Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(body);
        })
        .await
}

/// Token helper with its own cache, driven by a manual clock.
pub fn token_helper_with_clock() -> (TokenHelper, ManualClock) {
    let clock = ManualClock::new();
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let helper = TokenHelper::new(TokenCache::with_clock(shared), TokenAcquirer::default());
    (helper, clock)
}
