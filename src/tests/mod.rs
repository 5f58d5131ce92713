mod common;

mod auth_headers;
