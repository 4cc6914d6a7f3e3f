use crate::errors::ToolError;
use crate::models::{Action, CostCenterRef};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Searched in order when no explicit settings file is given.
pub const CANDIDATE_PATHS: [&str; 3] = ["../.env", ".env", "config/.env"];

const KEY_ENTERPRISE: &str = "GITHUB_ENTERPRISE";
const KEY_TOKEN: &str = "GITHUB_TOKEN";
const KEY_API_URL: &str = "GITHUB_API_URL";
const KEY_COST_CENTER: &str = "COST_CENTER_ID";
const KEY_USERS_CSV: &str = "USERS_CSV_FILE";
const KEY_REMOVE_USERS_CSV: &str = "REMOVE_USERS_CSV_FILE";

/// What the settings are loaded for; decides which keys are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Mutate(Action),
}

/// Access token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Token(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(****)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationSettings {
    pub cost_center: CostCenterRef,
    pub users_csv: PathBuf,
}

/// Immutable run configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enterprise: String,
    pub token: Token,
    pub api_url: String,
    pub mutation: Option<MutationSettings>,
}

impl Settings {
    /// Builds settings from parsed key/value pairs, reporting every missing key at once.
    pub fn from_map(values: &HashMap<String, String>, operation: Operation) -> Result<Self, ToolError> {
        let get = |key: &str| {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut missing = Vec::new();
        let mut require = |key: &str| {
            let value = get(key);
            if value.is_none() {
                missing.push(key.to_string());
            }
            value
        };

        let enterprise = require(KEY_ENTERPRISE);
        let token = require(KEY_TOKEN);

        let mutation_values = match operation {
            Operation::List => None,
            Operation::Mutate(action) => {
                let cost_center_id = require(KEY_COST_CENTER);
                let users_csv = match action {
                    Action::Add => require(KEY_USERS_CSV),
                    Action::Remove => {
                        let csv = get(KEY_REMOVE_USERS_CSV).or_else(|| get(KEY_USERS_CSV));
                        if csv.is_none() {
                            missing.push(KEY_REMOVE_USERS_CSV.to_string());
                        }
                        csv
                    }
                };
                Some((cost_center_id, users_csv))
            }
        };

        // Every `None` above has pushed its key onto `missing`.
        let (enterprise, token, mutation) = match (enterprise, token, mutation_values) {
            (Some(enterprise), Some(token), None) => (enterprise, token, None),
            (Some(enterprise), Some(token), Some((Some(id), Some(csv)))) => {
                let mutation = MutationSettings {
                    cost_center: CostCenterRef {
                        enterprise: enterprise.clone(),
                        id,
                    },
                    users_csv: PathBuf::from(csv),
                };
                (enterprise, token, Some(mutation))
            }
            _ => return Err(ToolError::ConfigIncomplete { missing }),
        };

        let api_url = get(KEY_API_URL)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Settings {
            enterprise,
            token: Token::new(token),
            api_url,
            mutation,
        })
    }
}

/// Finds the settings file, resolving relative paths against `base`.
pub fn locate_from(base: &Path, explicit: Option<&Path>) -> Result<PathBuf, ToolError> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(path) => vec![base.join(path)],
        None => CANDIDATE_PATHS.iter().map(|c| base.join(c)).collect(),
    };

    for candidate in &candidates {
        debug!("Looking for settings file at {}", candidate.display());
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
    }

    Err(ToolError::ConfigNotFound {
        searched: candidates,
    })
}

/// Parses shell-style `KEY=VALUE` lines.
pub fn parse_env_file(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line
            .strip_prefix("export ")
            .map(str::trim_start)
            .unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            debug!("Ignoring settings line {} without '='", index + 1);
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        values.insert(key.to_string(), unquote_value(value.trim()));
    }

    values
}

fn unquote_value(value: &str) -> String {
    if let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let rest = &value[1..];
        if let Some(end) = rest.find(quote) {
            return rest[..end].to_string();
        }
    }
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end().to_string(),
        None => value.to_string(),
    }
}

/// Locates, reads and validates the settings file for `operation`.
pub fn load(explicit: Option<&Path>, operation: Operation) -> Result<Settings, ToolError> {
    let base = std::env::current_dir()?;
    let path = locate_from(&base, explicit)?;
    debug!("Loading settings from {}", path.display());
    let content = fs::read_to_string(&path)?;
    Settings::from_map(&parse_env_file(&content), operation)
}
