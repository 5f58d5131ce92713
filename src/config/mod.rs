pub mod loader;
pub mod services;
pub mod settings;
pub mod validator;
