// src/errors.rs
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for the cost-center tool.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("No configuration file found (searched: {})", display_paths(.searched))]
    ConfigNotFound { searched: Vec<PathBuf> },

    #[error("Configuration is missing required keys: {}", .missing.join(", "))]
    ConfigIncomplete { missing: Vec<String> },

    #[error("Users file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Users file is empty: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("No valid usernames found in {}", .0.display())]
    NoValidUsers(PathBuf),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {message}{}", display_details(.details))]
    ApiError { message: String, details: Vec<String> },

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("Invalid output format '{0}' (expected one of: table, detailed, json, csv)")]
    InvalidFormat(String),

    #[error("Invalid state filter '{0}' (expected one of: active, deleted)")]
    InvalidState(String),

    #[error("No response received from {0}")]
    TransportFailure(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_details(details: &[String]) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!(" ({})", details.join("; "))
    }
}
