pub mod oauth2;
pub mod token_helper;
