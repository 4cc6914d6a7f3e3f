use crate::auth::authenticate;
use crate::client::{CostCenterClient, Transport};
use crate::config::Settings;
use crate::confirm::Confirm;
use crate::csv_handler::{extract_users, ExtractOptions};
use crate::errors::ToolError;
use crate::models::{Action, OutputFormat, StateFilter};
use crate::output::{batch_summary, write_listing, write_mutation_result};
use std::io::Write;
use tracing::{info, warn};

/// How a run ended when no error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The operator declined the confirmation prompt.
    Cancelled,
    /// The API answered, but not with a success.
    Failed,
}

/// Authenticates, fetches the cost centers and renders them.
pub fn list<T: Transport, W: Write>(
    settings: &Settings,
    transport: T,
    state: Option<StateFilter>,
    format: OutputFormat,
    color: bool,
    out: W,
) -> Result<Outcome, ToolError> {
    let principal = authenticate(&transport, &settings.api_url)?;
    info!("Authenticated as {}", principal);

    let client = CostCenterClient::new(transport, settings.api_url.as_str());
    match state {
        Some(state) => info!(
            "Fetching {} cost centers for enterprise {}",
            state.as_str(),
            settings.enterprise
        ),
        None => info!("Fetching cost centers for enterprise {}", settings.enterprise),
    }
    let listing = client.list(&settings.enterprise, state)?;
    info!("Fetched {} cost center(s)", listing.records.len());

    write_listing(&listing, format, color, out)?;
    Ok(Outcome::Completed)
}

/// Authenticates, reads the users file, confirms and submits one add/remove call.
pub fn mutate<T: Transport, C: Confirm, O: Write, E: Write>(
    settings: &Settings,
    action: Action,
    transport: T,
    options: &ExtractOptions,
    confirmer: &mut C,
    mut out: O,
    err: E,
) -> Result<Outcome, ToolError> {
    let mutation = settings
        .mutation
        .as_ref()
        .ok_or_else(|| ToolError::ConfigIncomplete {
            missing: vec!["COST_CENTER_ID".to_string()],
        })?;

    let principal = authenticate(&transport, &settings.api_url)?;
    info!("Authenticated as {}", principal);

    let extraction = extract_users(&mutation.users_csv, options)?;
    if !extraction.skipped.is_empty() {
        let listed: Vec<String> = extraction
            .skipped
            .iter()
            .map(|entry| format!("{:?} (line {})", entry.value, entry.line))
            .collect();
        warn!(
            "Skipped {} invalid row(s) in {}: {}",
            listed.len(),
            mutation.users_csv.display(),
            listed.join(", ")
        );
    }
    info!("Loaded {} user(s)", extraction.users.len());

    write!(
        out,
        "{}",
        batch_summary(action, &mutation.cost_center, &extraction.users)
    )?;
    out.flush()?;

    let prompt = format!("Proceed to {} these users?", action.verb());
    if !confirmer.confirm(&prompt)? {
        writeln!(out, "Operation cancelled.")?;
        return Ok(Outcome::Cancelled);
    }

    let client = CostCenterClient::new(transport, settings.api_url.as_str());
    let result = match action {
        Action::Add => client.add_users(&mutation.cost_center, &extraction.users)?,
        Action::Remove => client.remove_users(&mutation.cost_center, &extraction.users)?,
    };

    if write_mutation_result(&result, &mut out, err)? {
        Ok(Outcome::Completed)
    } else {
        Ok(Outcome::Failed)
    }
}
