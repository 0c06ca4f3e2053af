//! Shared helpers for command handlers.

use waymark_core::Coordinates;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, the operation is refused instead.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Validate a latitude/longitude pair from flags.
pub fn coordinates(lat: f64, lng: f64) -> Result<Coordinates, CliError> {
    Coordinates::new(lat, lng).map_err(|e| CliError::Validation {
        field: "coordinates".into(),
        reason: e.to_string(),
    })
}
