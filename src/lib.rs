//! # Service Agents Library
//!
//! Typed clients ("service agents") for remote HTTP services, configured per service
//! name, with OAuth2 client credentials token caching and auth header injection.
//!
//! Modules:
//! - `config`: settings model, YAML loading and validation
//! - `cache`: token replies and the shared token cache
//! - `sources`: client credentials grant and read-or-retrieve token access
//! - `headers`: auth header strategy per auth scheme
//! - `agent`: service agents, error mapping and registration

pub mod agent;
pub mod cache;
pub mod config;
pub mod error;
pub mod headers;
pub mod helpers;
pub mod observability;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::agent::registry::{Agent, ServiceAgents, ServiceAgentsBuilder};
pub use crate::agent::service_agent::ServiceAgent;
pub use crate::cache::token::{ExpiresIn, TokenReply};
pub use crate::config::services::{AuthScheme, HttpScheme, ServiceAgentSettings, ServiceSettings};
pub use crate::error::{AgentError, AuthError, TokenAcquisitionError};
pub use crate::headers::auth_context::{AuthContext, StaticAuthContext};
pub use crate::headers::strategy::AuthHeaderStrategy;
pub use crate::sources::token_helper::TokenHelper;
