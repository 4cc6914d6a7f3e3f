use crate::client::{ApiRequest, Method, Transport};
use crate::errors::ToolError;
use serde_derive::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Identity {
    login: String,
    #[serde(default)]
    name: Option<String>,
}

/// Confirms the token with one `GET /user` call and returns a display name.
pub fn authenticate<T: Transport>(transport: &T, api_url: &str) -> Result<String, ToolError> {
    let request = ApiRequest {
        method: Method::Get,
        url: format!("{api_url}/user"),
        body: None,
    };
    debug!("{} {}", request.method.as_str(), request.url);

    let response = transport.send(&request)?;

    let body = response.body.trim();
    if body.is_empty() {
        return Err(ToolError::AuthenticationFailed(format!(
            "empty response (HTTP {})",
            response.status
        )));
    }
    if !response.is_success() {
        return Err(ToolError::AuthenticationFailed(body.to_string()));
    }

    let identity: Identity = serde_json::from_str(body)
        .ok()
        .filter(|id: &Identity| !id.login.trim().is_empty())
        .ok_or_else(|| ToolError::AuthenticationFailed(body.to_string()))?;

    debug!("Authenticated as {}", identity.login);
    Ok(match identity.name {
        Some(name) if !name.trim().is_empty() => format!("{name} ({})", identity.login),
        _ => identity.login,
    })
}
