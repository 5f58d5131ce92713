use std::sync::Arc;

use http::Method;
use reqwest::{Client, ClientBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::agent::error_body::map_error_response;
use crate::config::services::ServiceSettings;
use crate::error::AgentError;
use crate::headers::strategy::AuthHeaderStrategy;
use crate::observability::metrics::get_metrics;

/// Typed client for one remote service.
///
/// Static headers (`Accept`, Basic / api key auth, extra headers) are baked into the
/// underlying client at construction; Bearer and OAuth headers are computed per request.
#[derive(Debug, Clone)]
pub struct ServiceAgent {
    name: String,
    settings: Arc<ServiceSettings>,
    base_url: Url,
    client: Client,
    strategy: AuthHeaderStrategy,
}

impl ServiceAgent {
    pub fn new(
        name: impl Into<String>,
        settings: ServiceSettings,
        strategy: AuthHeaderStrategy,
        builder: ClientBuilder,
    ) -> Result<Self, AgentError> {
        let name = name.into();
        let raw_url = settings.url();
        let base_url = Url::parse(&raw_url).map_err(|err| AgentError::InvalidUrl {
            url: raw_url.clone(),
            reason: err.to_string(),
        })?;

        let default_headers = strategy.static_headers(&settings)?;
        let client = builder
            .default_headers(default_headers)
            .build()
            .map_err(|source| AgentError::Client {
                service: name.clone(),
                source,
            })?;

        debug!(service = %name, base_url = %base_url, auth_scheme = %settings.auth_scheme, "service agent created");
        Ok(Self {
            name,
            settings: Arc::new(settings),
            base_url,
            client,
            strategy,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn get_json<T: DeserializeOwned>(&self, request_uri: &str) -> Result<T, AgentError> {
        let response = self.send::<()>(Method::GET, request_uri, None).await?;
        parse_result(response).await
    }

    pub async fn get_string(&self, request_uri: &str) -> Result<String, AgentError> {
        let response = self.get_response(request_uri).await?;
        read_body(response).await
    }

    /// Raw response; only successful responses are returned.
    pub async fn get_response(&self, request_uri: &str) -> Result<Response, AgentError> {
        self.send::<()>(Method::GET, request_uri, None).await
    }

    pub async fn post_json<T>(&self, request_uri: &str, item: &T) -> Result<T, AgentError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.post_json_as(request_uri, item).await
    }

    pub async fn post_json_as<Req, Resp>(&self, request_uri: &str, item: &Req) -> Result<Resp, AgentError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self.send(Method::POST, request_uri, Some(item)).await?;
        parse_result(response).await
    }

    pub async fn put_json<T>(&self, request_uri: &str, item: &T) -> Result<T, AgentError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.put_json_as(request_uri, item).await
    }

    pub async fn put_json_as<Req, Resp>(&self, request_uri: &str, item: &Req) -> Result<Resp, AgentError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self.send(Method::PUT, request_uri, Some(item)).await?;
        parse_result(response).await
    }

    /// PUT whose response body is ignored.
    pub async fn put_empty<T>(&self, request_uri: &str, item: &T) -> Result<(), AgentError>
    where
        T: Serialize + ?Sized,
    {
        self.send(Method::PUT, request_uri, Some(item)).await.map(|_| ())
    }

    pub async fn patch_json<T>(&self, request_uri: &str, item: &T) -> Result<T, AgentError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.patch_json_as(request_uri, item).await
    }

    pub async fn patch_json_as<Req, Resp>(&self, request_uri: &str, item: &Req) -> Result<Resp, AgentError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self.send(Method::PATCH, request_uri, Some(item)).await?;
        parse_result(response).await
    }

    pub async fn delete(&self, request_uri: &str) -> Result<(), AgentError> {
        self.send::<()>(Method::DELETE, request_uri, None).await.map(|_| ())
    }

    /// Resolve `request_uri` against the service url; absolute urls are taken as is.
    pub fn resolve(&self, request_uri: &str) -> Result<Url, AgentError> {
        self.base_url
            .join(request_uri.trim_start_matches('/'))
            .map_err(|err| AgentError::InvalidUrl {
                url: request_uri.to_owned(),
                reason: err.to_string(),
            })
    }

    async fn send<B>(&self, method: Method, request_uri: &str, item: Option<&B>) -> Result<Response, AgentError>
    where
        B: Serialize + ?Sized,
    {
        let metrics = get_metrics().await;
        let url = self.resolve(request_uri)?;
        metrics.agent_requests.with_label_values(&[self.name.as_str(), method.as_str()]).inc();

        let headers = self.strategy.request_headers(&self.settings).await.inspect_err(|err| {
            metrics.agent_failures.with_label_values(&[self.name.as_str(), "auth"]).inc();
            warn!(service = %self.name, error = %err, "unable to compute auth headers");
        })?;

        let mut request = self.client.request(method.clone(), url.clone()).headers(headers);
        if let Some(item) = item {
            request = request.json(item);
        }

        debug!(service = %self.name, %method, %url, "sending request");
        let response = request.send().await.map_err(|source| {
            metrics.agent_failures.with_label_values(&[self.name.as_str(), "transport"]).inc();
            AgentError::Transport {
                url: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        metrics.agent_failures.with_label_values(&[self.name.as_str(), status.as_str()]).inc();
        let body = response.text().await.unwrap_or_else(|err| {
            warn!(service = %self.name, %url, status = status.as_u16(), error = %err, "unable to read error body");
            String::new()
        });
        warn!(service = %self.name, %method, %url, status = status.as_u16(), "request failed");
        Err(map_error_response(status, &body))
    }
}

async fn read_body(response: Response) -> Result<String, AgentError> {
    let url = response.url().to_string();
    response
        .text()
        .await
        .map_err(|source| AgentError::Transport { url, source })
}

async fn parse_result<T: DeserializeOwned>(response: Response) -> Result<T, AgentError> {
    let body = read_body(response).await?;
    serde_json::from_str(&body).map_err(|source| AgentError::Deserialize { body, source })
}
