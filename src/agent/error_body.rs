use std::collections::HashMap;

use http::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::AgentError;

pub const JSON_PARSE_ERROR_TITLE: &str = "Json parse error exception.";

/// Error payload of a failed call, after defaults for the status were applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorBody {
    pub title: String,
    pub code: String,
    pub status: u16,
    pub extra_parameters: HashMap<String, Vec<String>>,
}

/// Error object as sent by the remote service. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireError {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    extra_parameters: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Default)]
struct DecodedError {
    title: Option<String>,
    code: Option<String>,
    extra_parameters: HashMap<String, Vec<String>>,
}

/// Decode the raw body of a non-2xx response.
///
/// `None` for an empty body. A body that is not an error object (unparseable, or
/// without both title and status) becomes a parse-error placeholder carrying the raw json.
fn decode(status: StatusCode, raw: &str) -> Option<DecodedError> {
    if raw.is_empty() {
        return None;
    }

    let parsed = serde_json::from_str::<WireError>(raw)
        .map_err(|err| err.to_string())
        .and_then(|wire| {
            let no_title = wire.title.as_deref().map(str::trim).unwrap_or_default().is_empty();
            let no_status = wire.status.unwrap_or_default() == 0;
            if no_title && no_status {
                Err("neither title nor status present".to_owned())
            } else {
                Ok(wire)
            }
        });

    match parsed {
        Ok(wire) => Some(DecodedError {
            title: wire.title,
            code: wire.code,
            extra_parameters: wire.extra_parameters.unwrap_or_default(),
        }),
        Err(reason) => {
            debug!(status = status.as_u16(), %reason, "error body is not an error object");
            Some(DecodedError {
                title: Some(JSON_PARSE_ERROR_TITLE.to_owned()),
                code: None,
                extra_parameters: HashMap::from([("json".to_owned(), vec![raw.to_owned()])]),
            })
        }
    }
}

/// Map a non-2xx response to the matching [`AgentError`].
pub fn map_error_response(status: StatusCode, raw: &str) -> AgentError {
    let decoded = decode(status, raw);
    let title = decoded.as_ref().and_then(|d| d.title.clone());
    let code = decoded.as_ref().and_then(|d| d.code.clone());
    let extra_parameters = decoded.map(|d| d.extra_parameters).unwrap_or_default();

    let body = |default_title: &str, default_code: &str| ErrorBody {
        title: title.clone().unwrap_or_else(|| default_title.to_owned()),
        code: code.clone().unwrap_or_else(|| default_code.to_owned()),
        status: status.as_u16(),
        extra_parameters: extra_parameters.clone(),
    };
    let fixed = |fixed_title: &str, fixed_code: &str| ErrorBody {
        title: fixed_title.to_owned(),
        code: fixed_code.to_owned(),
        status: status.as_u16(),
        extra_parameters: extra_parameters.clone(),
    };

    match status {
        StatusCode::NOT_FOUND => AgentError::NotFound(body("Not found", "NFOUND001")),
        StatusCode::BAD_REQUEST => AgentError::Validation(body("Bad request", "UNVALI001")),
        StatusCode::UNAUTHORIZED => AgentError::Unauthorized(body("Access denied", "UNAUTH001")),
        StatusCode::FORBIDDEN => AgentError::Forbidden(body("Forbidden", "FORBID001")),
        StatusCode::BAD_GATEWAY => AgentError::BadGateway(fixed("The server could not be located", "GTWAY001")),
        StatusCode::GATEWAY_TIMEOUT => {
            AgentError::GatewayTimeout(fixed("The connection to the server timed out", "GTWAY002"))
        }
        _ => {
            let reason = status.canonical_reason().unwrap_or("Unknown status");
            AgentError::Status {
                status,
                body: body(reason, &format!("Status: {}", status.as_u16())),
            }
        }
    }
}
