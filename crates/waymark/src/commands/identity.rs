//! `waymark identity`: which id this installation reports under.

use serde::Serialize;

use crate::config::Context;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct IdentityView {
    device_id: String,
    storage: String,
    persistent: bool,
}

pub fn handle(ctx: &Context) -> Result<(), CliError> {
    let identity = ctx.identity();
    let view = IdentityView {
        device_id: identity.get_or_create().to_string(),
        storage: identity.storage_location(),
        persistent: identity.is_persistent(),
    };

    let out = output::render_single(
        ctx.output,
        &view,
        |v| {
            let suffix = if v.persistent { "" } else { " (not persisted)" };
            format!("Device ID: {}\nStored in: {}{suffix}", v.device_id, v.storage)
        },
        |v| v.device_id.clone(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
