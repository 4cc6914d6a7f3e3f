use crate::errors::ToolError;
use crate::models::{CostCenterRecord, UserBatch, UserIdentifier};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix that marks the first row as a header unless disabled.
pub const DEFAULT_HEADER_PREFIX: &str = "user";

/// Knobs for user extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Case-insensitive prefix that turns the first row into a header.
    /// Best effort: a real login starting with this prefix on the first row is dropped too.
    pub header_prefix: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            header_prefix: Some(DEFAULT_HEADER_PREFIX.to_string()),
        }
    }
}

/// A row whose first field was not a valid login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub line: u64,
    pub value: String,
}

/// Validated users plus the rows that were dropped.
#[derive(Debug)]
pub struct Extraction {
    pub users: UserBatch,
    pub skipped: Vec<SkippedEntry>,
}

/// Resolves `path` against the current directory, then against `fallback_base`.
pub fn resolve_input_path(path: &Path, fallback_base: Option<&Path>) -> Result<PathBuf, ToolError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.is_relative() {
        if let Some(base) = fallback_base {
            let candidate = base.join(path);
            debug!("Trying fallback users file location {}", candidate.display());
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(ToolError::FileNotFound(path.to_path_buf()))
}

/// Directory holding the running executable.
pub fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Reads a users CSV file into a non-empty batch.
pub fn extract_users<P: AsRef<Path>>(
    file_path: P,
    options: &ExtractOptions,
) -> Result<Extraction, ToolError> {
    let path = resolve_input_path(file_path.as_ref(), executable_dir().as_deref())?;
    if fs::metadata(&path)?.len() == 0 {
        return Err(ToolError::EmptyInput(path));
    }

    let file = File::open(&path)?;
    let (users, skipped) = read_users(file, options)?;

    let users = UserBatch::new(users).ok_or_else(|| ToolError::NoValidUsers(path.clone()))?;
    debug!(
        "Extracted {} user(s) from {} ({} skipped)",
        users.len(),
        path.display(),
        skipped.len()
    );
    Ok(Extraction { users, skipped })
}

/// Validates the first field of every row, preserving input order.
pub fn read_users<R: Read>(
    reader: R,
    options: &ExtractOptions,
) -> Result<(Vec<UserIdentifier>, Vec<SkippedEntry>), ToolError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header_prefix = options
        .header_prefix
        .as_deref()
        .map(str::to_ascii_lowercase);

    let mut users = Vec::new();
    let mut skipped = Vec::new();
    let mut first_row = true;

    for result in rdr.byte_records() {
        let record = result?;
        if record
            .iter()
            .all(|field| field.iter().all(u8::is_ascii_whitespace))
        {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let is_first_row = std::mem::take(&mut first_row);
        let raw = record.get(0).unwrap_or_default();

        let Ok(field) = std::str::from_utf8(raw) else {
            let value = String::from_utf8_lossy(raw).into_owned();
            warn!("Skipping non UTF-8 username {:?} on line {}", value, line);
            skipped.push(SkippedEntry { line, value });
            continue;
        };
        let candidate = clean_field(field);

        if is_first_row {
            if let Some(prefix) = &header_prefix {
                if candidate.to_ascii_lowercase().starts_with(prefix.as_str()) {
                    debug!("Skipping header row on line {}", line);
                    continue;
                }
            }
        }

        match UserIdentifier::parse(candidate) {
            Some(user) => users.push(user),
            None => {
                warn!("Skipping invalid username {:?} on line {}", candidate, line);
                skipped.push(SkippedEntry {
                    line,
                    value: candidate.to_string(),
                });
            }
        }
    }

    Ok((users, skipped))
}

/// Trims whitespace and one pair of enclosing quotes.
fn clean_field(field: &str) -> &str {
    let trimmed = field.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    trimmed
}

/// Writes cost centers as CSV, one row per record.
pub fn write_cost_centers<W: Write>(records: &[CostCenterRecord], writer: W) -> Result<(), ToolError> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record([
        "ID",
        "Name",
        "State",
        "Azure Subscription",
        "Resource Count",
        "Resource Types",
    ])?;

    for record in records {
        wtr.write_record(&[
            record.id.clone(),
            record.name.clone(),
            record.state.to_string(),
            record.azure_subscription_text().unwrap_or_default(),
            record.resources.len().to_string(),
            record.resource_types().join(";"),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CostCenterState, ResourceRef};
    use rstest::rstest;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn run_read(input: &str) -> (Vec<String>, Vec<SkippedEntry>) {
        let (users, skipped) = read_users(input.as_bytes(), &ExtractOptions::default()).unwrap();
        (users.iter().map(|u| u.to_string()).collect(), skipped)
    }

    #[rstest]
    #[case(
        // Mixed valid and invalid rows keep order
        "alice-smith\nbob_jones\ncharlie",
        vec!["alice-smith", "charlie"],
        vec![2]
    )]
    #[case(
        // Header row and extra columns
        "username,email\nalice,a@example.com\nbob,b@example.com",
        vec!["alice", "bob"],
        vec![]
    )]
    #[case(
        // Header detection is case-insensitive
        "User_Login\nalice",
        vec!["alice"],
        vec![]
    )]
    #[case(
        // Blank lines are ignored and line numbers stay accurate
        "alice\n\n   \nbad name\ncarol",
        vec!["alice", "carol"],
        vec![4]
    )]
    #[case(
        // Quotes and whitespace are stripped
        "  \"alice\"  \n'bob'\n \" carol \" ",
        vec!["alice", "bob", "carol"],
        vec![]
    )]
    #[case(
        // Duplicates are not removed
        "alice\nalice\n-bad\nbad-\nalice",
        vec!["alice", "alice", "alice"],
        vec![3, 4]
    )]
    #[case(
        // An unbalanced quote only affects its own line
        "alice\n\"bob\ncarol\ndave\n",
        vec!["alice", "carol", "dave"],
        vec![2]
    )]
    #[case(
        // Quoted fields are not joined across lines
        "\"alice\"\n\"bob\n\"carol\"",
        vec!["alice", "carol"],
        vec![2]
    )]
    #[case(
        // Only the first row can be a header
        "alice\nusers",
        vec!["alice", "users"],
        vec![]
    )]
    fn test_read_users_cases(
        #[case] input: &str,
        #[case] expected_users: Vec<&str>,
        #[case] expected_skipped_lines: Vec<u64>,
    ) {
        let (users, skipped) = run_read(input);
        assert_eq!(users, expected_users);
        assert_eq!(
            skipped.iter().map(|s| s.line).collect::<Vec<_>>(),
            expected_skipped_lines
        );
    }

    #[test]
    fn test_counts_match_valid_and_invalid_rows() {
        let input = "a1\nb_2\nc-3\nd.4\ne5\n-f6\ng7";
        let (users, skipped) = run_read(input);
        assert_eq!(users.len(), 4);
        assert_eq!(skipped.len(), 3);
        assert_eq!(skipped[0].value, "b_2");
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped_not_fatal() {
        let input: &[u8] = b"alice\nb\xe9b\ncarol\n";
        let (users, skipped) = read_users(input, &ExtractOptions::default()).unwrap();
        assert_eq!(
            users.iter().map(|u| u.to_string()).collect::<Vec<_>>(),
            vec!["alice", "carol"]
        );
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].line, 2);
        assert_eq!(skipped[0].value, "b\u{fffd}b");
    }

    #[test]
    fn test_header_detection_can_be_disabled() {
        let options = ExtractOptions { header_prefix: None };
        let (users, _) = read_users("userabc\nalice".as_bytes(), &options).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].to_string(), "userabc");
    }

    #[test]
    fn test_extract_users_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "alice-smith\nbob_jones\ncharlie\n").unwrap();

        let extraction = extract_users(file.path(), &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.users.len(), 2);
        assert_eq!(
            extraction.skipped,
            vec![SkippedEntry {
                line: 2,
                value: "bob_jones".to_string()
            }]
        );
    }

    #[test]
    fn test_extract_users_header_only_has_no_valid_users() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "username").unwrap();

        let err = extract_users(file.path(), &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ToolError::NoValidUsers(_)));
    }

    #[test]
    fn test_extract_users_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let err = extract_users(file.path(), &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ToolError::EmptyInput(_)));
    }

    #[test]
    fn test_extract_users_missing_file() {
        let err = extract_users("no_such_users_file_12345.csv", &ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ToolError::FileNotFound(p) if p == Path::new("no_such_users_file_12345.csv")));
    }

    #[test]
    fn test_resolve_input_path_uses_fallback_base() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("fallback_users_67890.csv"), "alice").unwrap();

        let resolved =
            resolve_input_path(Path::new("fallback_users_67890.csv"), Some(dir.path())).unwrap();
        assert_eq!(resolved, dir.path().join("fallback_users_67890.csv"));
    }

    #[test]
    fn test_write_cost_centers() {
        let records = vec![
            CostCenterRecord {
                id: "cc-1".into(),
                name: "Platform, Core".into(),
                state: CostCenterState::Active,
                azure_subscription: Some(serde_json::json!("sub-1")),
                resources: vec![
                    ResourceRef {
                        resource_type: "User".into(),
                        name: "alice".into(),
                    },
                    ResourceRef {
                        resource_type: "Repo".into(),
                        name: "acme/api".into(),
                    },
                    ResourceRef {
                        resource_type: "User".into(),
                        name: "bob".into(),
                    },
                ],
            },
            CostCenterRecord {
                id: "cc-2".into(),
                name: "Empty".into(),
                state: CostCenterState::Deleted,
                azure_subscription: None,
                resources: vec![],
            },
        ];

        let mut output_buf = Vec::new();
        write_cost_centers(&records, Cursor::new(&mut output_buf)).unwrap();
        let output = String::from_utf8(output_buf).unwrap();

        assert_eq!(
            output.trim(),
            "ID,Name,State,Azure Subscription,Resource Count,Resource Types\n\
             cc-1,\"Platform, Core\",active,sub-1,3,User;Repo\n\
             cc-2,Empty,deleted,,0,"
        );
    }
}
