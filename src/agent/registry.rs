//! Explicit registration of service agents.
//!
//! Collaborators shared by every agent (token cache, token helper, header strategy)
//! are created once by [`ServiceAgentsBuilder::build`]. Typed agents are produced by
//! their own [`Agent::from_agent`] factory; nothing is discovered at runtime.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::info;

use crate::agent::service_agent::ServiceAgent;
use crate::cache::token_cache::TokenCache;
use crate::config::services::{ServiceAgentSettings, ServiceSettings};
use crate::config::settings::Environment;
use crate::error::AgentError;
use crate::headers::auth_context::AuthContext;
use crate::headers::strategy::AuthHeaderStrategy;
use crate::helpers::time::{system_clock, Clock};
use crate::sources::oauth2::TokenAcquirer;
use crate::sources::token_helper::TokenHelper;

/// Customizes the http client of one agent before it is built, by service name.
pub type ClientHook = Arc<dyn Fn(&str, ClientBuilder) -> ClientBuilder + Send + Sync>;

/// A typed agent for one configured service.
pub trait Agent: Sized {
    /// Settings key, or a name containing it (`DemoServiceAgent` finds `DemoService`).
    const SERVICE_NAME: &'static str;

    fn from_agent(agent: ServiceAgent) -> Self;
}

pub struct ServiceAgentsBuilder {
    settings: ServiceAgentSettings,
    environment: Option<Environment>,
    auth_context: Option<Arc<dyn AuthContext>>,
    clock: Arc<dyn Clock>,
    token_client: Option<Client>,
    client_hook: Option<ClientHook>,
}

impl ServiceAgentsBuilder {
    pub fn new(settings: ServiceAgentSettings) -> Self {
        Self {
            settings,
            environment: None,
            auth_context: None,
            clock: system_clock(),
            token_client: None,
            client_hook: None,
        }
    }

    /// Overrides `settings.environment` from the configuration.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn auth_context(mut self, auth_context: Arc<dyn AuthContext>) -> Self {
        self.auth_context = Some(auth_context);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Client used for token endpoint calls.
    pub fn token_client(mut self, client: Client) -> Self {
        self.token_client = Some(client);
        self
    }

    pub fn client_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, ClientBuilder) -> ClientBuilder + Send + Sync + 'static,
    {
        self.client_hook = Some(Arc::new(hook));
        self
    }

    /// Register one service configured in code. Replaces settings with the same name.
    pub fn add_single_service_agent<F>(mut self, name: impl Into<String>, setup: F) -> Self
    where
        F: FnOnce(&mut ServiceSettings),
    {
        let mut service_settings = ServiceSettings::default();
        setup(&mut service_settings);
        self.settings.services.insert(name.into(), service_settings);
        self
    }

    pub fn build(self) -> ServiceAgents {
        let environment = self.environment.unwrap_or(self.settings.settings.environment);
        let cache = TokenCache::with_clock(self.clock);
        let acquirer = TokenAcquirer::new(self.token_client.unwrap_or_default());
        let token_helper = TokenHelper::new(cache, acquirer);

        let mut strategy = AuthHeaderStrategy::new(token_helper, environment)
            .with_global_api_key(self.settings.global_api_key.clone());
        if let Some(auth_context) = self.auth_context {
            strategy = strategy.with_auth_context(auth_context);
        }

        info!(services = self.settings.services.len(), ?environment, "service agents registered");
        ServiceAgents {
            settings: Arc::new(self.settings),
            strategy,
            client_hook: self.client_hook,
        }
    }
}

/// Registered services and their shared collaborators. Cheap to clone.
#[derive(Clone)]
pub struct ServiceAgents {
    settings: Arc<ServiceAgentSettings>,
    strategy: AuthHeaderStrategy,
    client_hook: Option<ClientHook>,
}

impl fmt::Debug for ServiceAgents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAgents")
            .field("services", &self.settings.services.keys().collect::<Vec<_>>())
            .field("strategy", &self.strategy)
            .field("client_hook", &self.client_hook.is_some())
            .finish()
    }
}

impl ServiceAgents {
    pub fn builder(settings: ServiceAgentSettings) -> ServiceAgentsBuilder {
        ServiceAgentsBuilder::new(settings)
    }

    pub fn settings(&self) -> &ServiceAgentSettings {
        &self.settings
    }

    pub fn header_strategy(&self) -> &AuthHeaderStrategy {
        &self.strategy
    }

    pub fn token_helper(&self) -> &TokenHelper {
        self.strategy.token_helper()
    }

    /// Untyped agent for the service resolved from `name`.
    pub fn agent(&self, name: &str) -> Result<ServiceAgent, AgentError> {
        let service_settings = self.settings.get_service_settings(name)?.clone();

        let mut builder = Client::builder();
        if let Some(timeout_ms) = self.settings.settings.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(hook) = &self.client_hook {
            builder = hook(name, builder);
        }

        ServiceAgent::new(name, service_settings, self.strategy.clone(), builder)
    }

    pub fn create<A: Agent>(&self) -> Result<A, AgentError> {
        self.agent(A::SERVICE_NAME).map(A::from_agent)
    }
}
