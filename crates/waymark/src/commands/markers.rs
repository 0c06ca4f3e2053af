//! `waymark markers ...`: direct CRUD against the marker store.

use tabled::Tabled;
use tracing::debug;

use waymark_core::{
    HttpRepository, Marker, MarkerDraft, MarkerId, MarkerPatch, MarkerRepository, MarkerType,
};

use crate::cli::{MarkerAddArgs, MarkerUpdateArgs, MarkersArgs, MarkersCommand};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct MarkerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Lat")]
    lat: String,
    #[tabled(rename = "Lng")]
    lng: String,
    #[tabled(rename = "Type")]
    marker_type: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Created")]
    created: String,
}

fn row(m: &Marker) -> MarkerRow {
    MarkerRow {
        id: m.id.to_string(),
        title: m.title.clone(),
        lat: format!("{:.4}", m.position.latitude()),
        lng: format!("{:.4}", m.position.longitude()),
        marker_type: m.marker_type.to_string(),
        description: output::opt_cell(m.description.as_ref()),
        created: output::time_cell(m.created_at.as_ref()),
    }
}

fn detail(m: &Marker) -> String {
    let mut lines = vec![
        format!("ID:          {}", m.id),
        format!("Title:       {}", m.title),
        format!("Position:    {}", m.position),
        format!("Type:        {}", m.marker_type),
    ];
    if let Some(ref d) = m.description {
        lines.push(format!("Description: {d}"));
    }
    if m.created_at.is_some() {
        lines.push(format!("Created:     {}", output::time_cell(m.created_at.as_ref())));
    }
    if m.updated_at.is_some() {
        lines.push(format!("Updated:     {}", output::time_cell(m.updated_at.as_ref())));
    }
    lines.join("\n")
}

fn print_marker(m: &Marker, ctx: &Context) -> Result<(), CliError> {
    let out = output::render_single(ctx.output, m, detail, |m| m.id.to_string())?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

fn draft_from(args: MarkerAddArgs, ctx: &Context) -> Result<MarkerDraft, CliError> {
    let marker_type = args
        .marker_type
        .map_or_else(|| ctx.sync.click_marker_type.clone(), MarkerType::from);
    let mut draft = MarkerDraft::at(util::coordinates(args.lat, args.lng)?).with_type(marker_type);
    if let Some(title) = args.title {
        draft = draft.with_title(title);
    }
    if let Some(description) = args.description {
        draft = draft.with_description(description);
    }
    Ok(draft)
}

fn patch_from(args: &MarkerUpdateArgs) -> Result<MarkerPatch, CliError> {
    let position = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Some(util::coordinates(lat, lng)?),
        _ => None,
    };
    Ok(MarkerPatch {
        title: args.title.clone(),
        description: args.description.clone(),
        position,
        marker_type: args.marker_type.as_deref().map(MarkerType::from),
    })
}

pub async fn handle(args: MarkersArgs, ctx: &Context) -> Result<(), CliError> {
    let repo = HttpRepository::new(&ctx.sync)?;

    match args.command {
        MarkersCommand::List => {
            let markers = repo.list().await?;
            debug!(count = markers.len(), "listed markers");
            let out = output::render_list(ctx.output, &markers, row, |m| m.id.to_string())?;
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        MarkersCommand::Add(add) => {
            let draft = draft_from(add, ctx)?;
            let marker = repo.create(&draft).await?;
            print_marker(&marker, ctx)
        }

        MarkersCommand::Update(update) => {
            let patch = patch_from(&update)?;
            let marker = repo.update(&MarkerId::new(update.id), &patch).await?;
            print_marker(&marker, ctx)
        }

        MarkersCommand::Remove { id } => {
            if !util::confirm(&format!("Delete marker {id}?"), "markers remove", ctx.yes)? {
                return Ok(());
            }
            repo.remove(&MarkerId::new(id.clone())).await?;
            if !ctx.quiet {
                eprintln!("Deleted marker {id}");
            }
            Ok(())
        }
    }
}
