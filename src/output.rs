use crate::csv_handler::write_cost_centers;
use crate::errors::ToolError;
use crate::models::{
    Action, ApiResult, CostCenterListing, CostCenterRecord, CostCenterRef, CostCenterState,
    OutputFormat, UserBatch,
};
use std::io::Write;

const ID_WIDTH: usize = 38;
const NAME_WIDTH: usize = 32;
const STATE_WIDTH: usize = 10;
const PREVIEW_USERS: usize = 10;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Writes the cost-center collection in the requested format.
pub fn write_listing<W: Write>(
    listing: &CostCenterListing,
    format: OutputFormat,
    color: bool,
    mut out: W,
) -> Result<(), ToolError> {
    match format {
        OutputFormat::Table => write_table(&listing.records, color, &mut out),
        OutputFormat::Detailed => write_detailed(&listing.records, &mut out),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &listing.raw)?;
            writeln!(out)?;
            Ok(())
        }
        OutputFormat::Csv => write_cost_centers(&listing.records, out),
    }
}

fn write_table<W: Write>(records: &[CostCenterRecord], color: bool, out: &mut W) -> Result<(), ToolError> {
    if records.is_empty() {
        writeln!(out, "No cost centers found.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<ID_WIDTH$} {:<NAME_WIDTH$} {:<STATE_WIDTH$} {}",
        "ID", "NAME", "STATE", "RESOURCES"
    )?;
    writeln!(out, "{}", "-".repeat(ID_WIDTH + NAME_WIDTH + STATE_WIDTH + 12))?;

    for record in records {
        let state = format!("{:<STATE_WIDTH$}", record.state.as_str());
        writeln!(
            out,
            "{:<ID_WIDTH$} {:<NAME_WIDTH$} {} {}",
            truncate(&record.id, ID_WIDTH),
            truncate(&record.name, NAME_WIDTH),
            paint_state(record.state, &state, color),
            record.resources.len()
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Total: {} cost center(s)", records.len())?;
    Ok(())
}

fn write_detailed<W: Write>(records: &[CostCenterRecord], out: &mut W) -> Result<(), ToolError> {
    if records.is_empty() {
        writeln!(out, "No cost centers found.")?;
        return Ok(());
    }

    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        writeln!(out, "Cost Center: {}", record.name)?;
        writeln!(out, "  ID: {}", record.id)?;
        writeln!(out, "  State: {}", record.state)?;
        writeln!(
            out,
            "  Azure Subscription: {}",
            record
                .azure_subscription_text()
                .unwrap_or_else(|| "None".to_string())
        )?;
        if record.resources.is_empty() {
            writeln!(out, "  No resources assigned")?;
        } else {
            writeln!(out, "  Resources ({}):", record.resources.len())?;
            for resource in &record.resources {
                writeln!(out, "    - {}: {}", resource.resource_type, resource.name)?;
            }
        }
    }
    Ok(())
}

fn paint_state(state: CostCenterState, text: &str, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    let code = match state {
        CostCenterState::Active => GREEN,
        CostCenterState::Deleted => RED,
        CostCenterState::Unknown => YELLOW,
    };
    format!("{code}{text}{RESET}")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Text shown before asking to confirm a mutation.
pub fn batch_summary(action: Action, target: &CostCenterRef, users: &UserBatch) -> String {
    let mut summary = format!(
        "About to {} {} user(s) {} cost center {} in enterprise {}:\n",
        action.verb(),
        users.len(),
        action.preposition(),
        target.id,
        target.enterprise
    );
    for user in users.iter().take(PREVIEW_USERS) {
        summary.push_str(&format!("  - {user}\n"));
    }
    if users.len() > PREVIEW_USERS {
        summary.push_str(&format!("  ... and {} more\n", users.len() - PREVIEW_USERS));
    }
    summary
}

/// Prints the outcome of a mutation. Returns `true` when it succeeded.
pub fn write_mutation_result<O: Write, E: Write>(
    result: &ApiResult,
    mut out: O,
    mut err: E,
) -> Result<bool, ToolError> {
    match result {
        ApiResult::Success(message) => writeln!(out, "✅ {message}")?,
        ApiResult::SuccessWithNote(message) => writeln!(out, "ℹ️  {message}")?,
        ApiResult::Error { message, details } => {
            writeln!(err, "❌ {message}")?;
            for detail in details {
                writeln!(err, "  - {detail}")?;
            }
        }
        ApiResult::MalformedResponse(raw) => {
            writeln!(err, "❌ Unexpected response from API:")?;
            writeln!(err, "{raw}")?;
        }
    }
    Ok(result.is_success())
}
