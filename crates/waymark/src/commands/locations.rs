//! `waymark locations ...`: one-shot reports and report queries.

use tabled::Tabled;

use waymark_core::{DeviceId, DeviceLocation, HttpRepository, LocationReport, LocationRepository};

use crate::cli::{LocationsArgs, LocationsCommand};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Lat")]
    lat: String,
    #[tabled(rename = "Lng")]
    lng: String,
    #[tabled(rename = "Reported")]
    reported: String,
}

fn row(l: &DeviceLocation) -> LocationRow {
    LocationRow {
        device: l.device_id.to_string(),
        lat: format!("{:.4}", l.position.latitude()),
        lng: format!("{:.4}", l.position.longitude()),
        reported: output::time_cell(l.reported_at.as_ref()),
    }
}

fn print_locations(locations: &[DeviceLocation], ctx: &Context) -> Result<(), CliError> {
    let out = output::render_list(ctx.output, locations, row, |l| {
        format!("{} {}", l.device_id, l.position)
    })?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

pub async fn handle(args: LocationsArgs, ctx: &Context) -> Result<(), CliError> {
    let repo = HttpRepository::new(&ctx.sync)?;

    match args.command {
        LocationsCommand::Publish { lat, lng } => {
            let report = LocationReport {
                device_id: ctx.identity().get_or_create(),
                position: util::coordinates(lat, lng)?,
            };
            repo.publish(&report).await?;
            if !ctx.quiet {
                eprintln!("Published {} for {}", report.position, report.device_id);
            }
            Ok(())
        }

        LocationsCommand::History { device_id } => {
            let device_id = device_id.map_or_else(|| ctx.identity().get_or_create(), DeviceId::from);
            let history = repo.history(&device_id).await?;
            print_locations(&history, ctx)
        }

        LocationsCommand::Latest => {
            let latest = repo.latest().await?;
            print_locations(&latest, ctx)
        }
    }
}
