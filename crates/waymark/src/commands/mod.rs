//! Command dispatch: bridges CLI args -> core repositories -> output formatting.

pub mod config_cmd;
pub mod identity;
pub mod locations;
pub mod markers;
pub mod session;
pub mod util;

use crate::cli::Command;
use crate::config::Context;
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Markers(args) => markers::handle(args, ctx).await,
        Command::Locations(args) => locations::handle(args, ctx).await,
        Command::Identity => identity::handle(ctx),
        Command::Session(args) => session::handle(args, ctx).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need a marker service".into(),
        )),
    }
}
