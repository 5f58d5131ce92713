pub mod error_body;
pub mod registry;
pub mod service_agent;
