//! GitHub billing API client.
//!
//! Requests go through the [`Transport`] trait so the client can be driven by
//! a real HTTP connection or by a canned responder in tests.

use crate::config::Token;
use crate::errors::ToolError;
use crate::models::{
    Action, ApiResult, CostCenterListing, CostCenterRecord, CostCenterRef, ResourceRequest,
    StateFilter, UserBatch,
};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use tracing::debug;

const API_VERSION: &str = "2022-11-28";
const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns the raw response. No retries.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ToolError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ToolError> {
        (**self).send(request)
    }
}

/// Blocking HTTPS transport carrying the GitHub auth and version headers.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(token: &Token) -> Result<Self, ToolError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| ToolError::AuthenticationFailed("token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("cost-center-tool/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ToolError> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().map_err(|e| {
            debug!("Transport error: {}", e);
            ToolError::TransportFailure(request.url.clone())
        })?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(ApiResponse { status, body })
    }
}

/// Cost-center operations for one API host.
pub struct CostCenterClient<T: Transport> {
    transport: T,
    api_url: String,
}

impl<T: Transport> CostCenterClient<T> {
    pub fn new(transport: T, api_url: impl Into<String>) -> Self {
        Self {
            transport,
            api_url: api_url.into(),
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ToolError> {
        debug!("{} {}", request.method.as_str(), request.url);
        if let Some(body) = &request.body {
            debug!("Request body: {}", body);
        }
        let response = self.transport.send(&request)?;
        debug!("Response status: {}", response.status);
        if response.body.trim().is_empty() {
            return Err(ToolError::TransportFailure(request.url));
        }
        Ok(response)
    }

    fn get(&self, url: String) -> Result<ApiResponse, ToolError> {
        self.execute(ApiRequest {
            method: Method::Get,
            url,
            body: None,
        })
    }

    /// Lists the enterprise's cost centers, optionally filtered by state.
    pub fn list(
        &self,
        enterprise: &str,
        state: Option<StateFilter>,
    ) -> Result<CostCenterListing, ToolError> {
        let mut url = format!(
            "{}/enterprises/{}/settings/billing/cost-centers",
            self.api_url, enterprise
        );
        if let Some(state) = state {
            url.push_str("?state=");
            url.push_str(state.as_str());
        }

        let response = self.get(url)?;
        parse_listing(&response)
    }

    pub fn add_users(&self, target: &CostCenterRef, users: &UserBatch) -> Result<ApiResult, ToolError> {
        self.mutate(Action::Add, target, users)
    }

    pub fn remove_users(
        &self,
        target: &CostCenterRef,
        users: &UserBatch,
    ) -> Result<ApiResult, ToolError> {
        self.mutate(Action::Remove, target, users)
    }

    fn mutate(
        &self,
        action: Action,
        target: &CostCenterRef,
        users: &UserBatch,
    ) -> Result<ApiResult, ToolError> {
        let url = format!(
            "{}/enterprises/{}/settings/billing/cost-centers/{}/resource",
            self.api_url, target.enterprise, target.id
        );
        let method = match action {
            Action::Add => Method::Post,
            Action::Remove => Method::Delete,
        };
        let body = serde_json::to_value(ResourceRequest {
            users: users.as_slice(),
        })?;

        let response = self.execute(ApiRequest {
            method,
            url,
            body: Some(body),
        })?;
        Ok(classify_mutation(&response))
    }
}

/// Maps an add/remove response to an [`ApiResult`].
///
/// A non-2xx status is always an error. Otherwise the body decides: a message
/// containing "successfully" wins, then an `errors` field, then any other
/// message as an informational note.
pub fn classify_mutation(response: &ApiResponse) -> ApiResult {
    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let errors = parsed.as_ref().and_then(|v| v.get("errors"));

    if !response.is_success() {
        return ApiResult::Error {
            message: message.unwrap_or_else(|| format!("HTTP {}", response.status)),
            details: errors.map(error_details).unwrap_or_default(),
        };
    }

    if parsed.is_none() {
        return ApiResult::MalformedResponse(response.body.clone());
    }

    match (message, errors) {
        (Some(message), _) if message.contains("successfully") => ApiResult::Success(message),
        (message, Some(errors)) => ApiResult::Error {
            message: message.unwrap_or_else(|| "The API reported errors".to_string()),
            details: error_details(errors),
        },
        (Some(message), None) => ApiResult::SuccessWithNote(message),
        (None, None) => ApiResult::MalformedResponse(response.body.clone()),
    }
}

/// Parses the list endpoint's response.
pub fn parse_listing(response: &ApiResponse) -> Result<CostCenterListing, ToolError> {
    let parsed: Value = match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(_) if !response.is_success() => {
            return Err(ToolError::ApiError {
                message: format!("HTTP {}", response.status),
                details: vec![],
            })
        }
        Err(_) => return Err(ToolError::MalformedResponse(response.body.clone())),
    };

    let message = parsed.get("message").and_then(Value::as_str);
    let collection = parsed.get("costCenters");

    match (collection, message) {
        (Some(raw @ Value::Array(_)), _) if response.is_success() => {
            let records: Vec<CostCenterRecord> = serde_json::from_value(raw.clone())
                .map_err(|_| ToolError::MalformedResponse(response.body.clone()))?;
            Ok(CostCenterListing {
                records,
                raw: raw.clone(),
            })
        }
        (_, Some(message)) => Err(ToolError::ApiError {
            message: message.to_string(),
            details: parsed
                .get("errors")
                .map(error_details)
                .into_iter()
                .flatten()
                .chain(
                    parsed
                        .get("documentation_url")
                        .and_then(Value::as_str)
                        .map(|url| format!("see {url}")),
                )
                .collect(),
        }),
        _ if !response.is_success() => Err(ToolError::ApiError {
            message: format!("HTTP {}", response.status),
            details: vec![],
        }),
        _ => Err(ToolError::MalformedResponse(response.body.clone())),
    }
}

/// Flattens an `errors` field into printable lines.
fn error_details(errors: &Value) -> Vec<String> {
    match errors {
        Value::Array(entries) => entries.iter().map(error_entry).collect(),
        Value::Null => vec![],
        other => vec![error_entry(other)],
    }
}

fn error_entry(entry: &Value) -> String {
    match entry {
        Value::String(text) => text.clone(),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| entry.to_string()),
        other => other.to_string(),
    }
}
