use crate::errors::ToolError;
use regex::Regex;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();

fn username_regex() -> &'static Regex {
    USERNAME_RE.get_or_init(|| {
        // Alphanumeric segments joined by hyphens, no leading or trailing hyphen.
        Regex::new("^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$")
            .unwrap_or_else(|error| panic!("username regex failed to compile: {error}"))
    })
}

/// A GitHub login that passed syntactic validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserIdentifier(String);

impl UserIdentifier {
    /// Returns `None` when `value` is not a syntactically valid login.
    pub fn parse(value: &str) -> Option<Self> {
        username_regex()
            .is_match(value)
            .then(|| UserIdentifier(value.to_string()))
    }
}

impl fmt::Display for UserIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, non-empty list of users submitted in a single call.
/// Duplicates are kept as they appear in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBatch(Vec<UserIdentifier>);

impl UserBatch {
    /// Returns `None` for an empty list.
    pub fn new(users: Vec<UserIdentifier>) -> Option<Self> {
        if users.is_empty() {
            None
        } else {
            Some(UserBatch(users))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserIdentifier> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[UserIdentifier] {
        &self.0
    }
}

/// JSON body of the add/remove resource endpoint.
#[derive(Debug, Serialize)]
pub struct ResourceRequest<'a> {
    pub users: &'a [UserIdentifier],
}

/// Enterprise and cost-center id a mutation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostCenterRef {
    pub enterprise: String,
    pub id: String,
}

/// The two membership mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
}

impl Action {
    pub fn verb(self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Remove => "remove",
        }
    }

    /// Preposition used in confirmation text ("add to" / "remove from").
    pub fn preposition(self) -> &'static str {
        match self {
            Action::Add => "to",
            Action::Remove => "from",
        }
    }
}

/// Outcome of an add/remove call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResult {
    Success(String),
    /// The API answered with a message that does not confirm success.
    SuccessWithNote(String),
    Error {
        message: String,
        details: Vec<String>,
    },
    MalformedResponse(String),
}

impl ApiResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_) | ApiResult::SuccessWithNote(_))
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum CostCenterState {
    Active,
    Deleted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl CostCenterState {
    pub fn as_str(self) -> &'static str {
        match self {
            CostCenterState::Active => "active",
            CostCenterState::Deleted => "deleted",
            CostCenterState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CostCenterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CostCenterRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: CostCenterState,
    #[serde(
        default,
        rename = "azureSubscription",
        alias = "azure_subscription"
    )]
    pub azure_subscription: Option<serde_json::Value>,
    #[serde(default)]
    pub resources: Vec<ResourceRef>,
}

impl CostCenterRecord {
    /// Subscription reference as display text, `None` when absent or null.
    pub fn azure_subscription_text(&self) -> Option<String> {
        match &self.azure_subscription {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) if s.is_empty() => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Distinct resource types in first-seen order.
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for resource in &self.resources {
            if !types.contains(&resource.resource_type.as_str()) {
                types.push(&resource.resource_type);
            }
        }
        types
    }
}

/// Cost centers returned by the list endpoint, plus the raw array for JSON output.
#[derive(Debug, Clone)]
pub struct CostCenterListing {
    pub records: Vec<CostCenterRecord>,
    pub raw: serde_json::Value,
}

/// Value of the `state` query parameter on the list endpoint.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StateFilter {
    Active,
    Deleted,
}

impl StateFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StateFilter::Active => "active",
            StateFilter::Deleted => "deleted",
        }
    }
}

impl FromStr for StateFilter {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(StateFilter::Active),
            "deleted" => Ok(StateFilter::Deleted),
            _ => Err(ToolError::InvalidState(s.to_string())),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Detailed,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "detailed" => Ok(OutputFormat::Detailed),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(ToolError::InvalidFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("alice", true)]
    #[case("alice-smith", true)]
    #[case("a", true)]
    #[case("A1-b2-C3", true)]
    #[case("bob_jones", false)]
    #[case("-alice", false)]
    #[case("alice-", false)]
    #[case("", false)]
    #[case("alice smith", false)]
    #[case("alice@example.com", false)]
    fn test_username_validation(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(UserIdentifier::parse(input).is_some(), valid);
    }

    #[test]
    fn test_user_batch_rejects_empty() {
        assert!(UserBatch::new(vec![]).is_none());
        let batch = UserBatch::new(vec![UserIdentifier::parse("a").unwrap()]).unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_resource_request_body_shape() {
        let users = vec![
            UserIdentifier::parse("a").unwrap(),
            UserIdentifier::parse("b").unwrap(),
        ];
        let body = serde_json::to_string(&ResourceRequest { users: &users }).unwrap();
        assert_eq!(body, r#"{"users":["a","b"]}"#);
    }

    #[test]
    fn test_record_deserialization_with_unknown_state() {
        let json = r#"{
            "id": "cc-1",
            "name": "Platform",
            "state": "archived",
            "azure_subscription": "sub-123",
            "resources": [
                {"type": "User", "name": "alice"},
                {"type": "Org", "name": "acme"},
                {"type": "User", "name": "bob"}
            ]
        }"#;
        let record: CostCenterRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.state, CostCenterState::Unknown);
        assert_eq!(record.azure_subscription_text().as_deref(), Some("sub-123"));
        assert_eq!(record.resource_types(), vec!["User", "Org"]);
    }

    #[test]
    fn test_record_deserialization_defaults() {
        let record: CostCenterRecord =
            serde_json::from_str(r#"{"id": "cc-2", "name": "Empty", "azureSubscription": null}"#)
                .unwrap();
        assert_eq!(record.state, CostCenterState::Unknown);
        assert!(record.azure_subscription_text().is_none());
        assert!(record.resources.is_empty());
        assert!(record.resource_types().is_empty());
    }

    #[rstest]
    #[case("table", OutputFormat::Table)]
    #[case("detailed", OutputFormat::Detailed)]
    #[case("JSON", OutputFormat::Json)]
    #[case("csv", OutputFormat::Csv)]
    fn test_output_format_parsing(#[case] input: &str, #[case] expected: OutputFormat) {
        assert_eq!(input.parse::<OutputFormat>().unwrap(), expected);
    }

    #[test]
    fn test_invalid_format_and_state() {
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(ToolError::InvalidFormat(f)) if f == "xml"
        ));
        assert!(matches!(
            "archived".parse::<StateFilter>(),
            Err(ToolError::InvalidState(s)) if s == "archived"
        ));
    }
}
