//! `waymark session`: drive a live map session from a line script.
//!
//! Each line is one gesture or sensor sample:
//!
//! ```text
//! click 48.8584 2.2945      # create a marker where the map was clicked
//! delete <marker-id>        # press "delete" in that marker's popup
//! refresh                   # reload the marker layer
//! fix 48.85 2.35 12         # position sample, optional accuracy in meters
//! lost no satellites        # the sensor reported a failure
//! show                      # print the current map state
//! ```
//!
//! Gesture failures are reported and the session keeps going, the way a
//! map UI would. The final map state is printed on exit; with `-v` every
//! view change is logged as it happens.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use waymark_core::{
    ChannelPositionSource, Coordinates, HttpRepository, MapSession, MapViewState, MarkerId,
    PositionFix, PositionSender, RenderedMarker, ReporterState, SelfMarker, SensorError,
    Viewport,
};

use crate::cli::{OutputFormat, SessionArgs};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

type HttpSession = MapSession<HttpRepository, HttpRepository>;

/// Extra wait on top of the request timeout for a sample to be handled.
const SAMPLE_GRACE: Duration = Duration::from_secs(2);

// ── Script ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Click { lat: f64, lng: f64 },
    Delete(MarkerId),
    Refresh,
    Fix {
        lat: f64,
        lng: f64,
        accuracy: Option<f64>,
    },
    Lost(String),
    Show,
}

fn number(token: Option<&str>, name: &str) -> Result<f64, String> {
    let token = token.ok_or_else(|| format!("missing {name}"))?;
    token
        .parse::<f64>()
        .map_err(|_| format!("{name} is not a number: '{token}'"))
}

/// Parse one script line. Blank lines and `#` comments yield `None`.
fn parse_line(line: &str) -> Result<Option<Step>, String> {
    let line = line.split_once('#').map_or(line, |(code, _)| code).trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    let step = match keyword.to_ascii_lowercase().as_str() {
        "click" => Step::Click {
            lat: number(args.next(), "latitude")?,
            lng: number(args.next(), "longitude")?,
        },
        "delete" => {
            let id = args.next().ok_or("missing marker id")?;
            Step::Delete(MarkerId::new(id))
        }
        "refresh" => Step::Refresh,
        "fix" => Step::Fix {
            lat: number(args.next(), "latitude")?,
            lng: number(args.next(), "longitude")?,
            accuracy: args
                .next()
                .map(|a| number(Some(a), "accuracy"))
                .transpose()?,
        },
        "lost" => {
            let reason = if rest.is_empty() { "position lost" } else { rest };
            return Ok(Some(Step::Lost(reason.to_owned())));
        }
        "show" => Step::Show,
        other => return Err(format!("unknown command '{other}'")),
    };

    if let Some(extra) = args.next() {
        return Err(format!("unexpected argument '{extra}'"));
    }
    Ok(Some(step))
}

// ── Rendered state ───────────────────────────────────────────────────

#[derive(Serialize)]
struct MapView {
    viewport: Viewport,
    version: u64,
    reporter: String,
    markers: Vec<Arc<RenderedMarker>>,
    #[serde(rename = "self")]
    self_marker: Option<Arc<SelfMarker>>,
}

#[derive(Tabled)]
struct MarkerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Type")]
    marker_type: String,
}

fn describe_reporter(state: &ReporterState) -> String {
    match state {
        ReporterState::Idle => "idle".into(),
        ReporterState::Watching => "watching".into(),
        ReporterState::Reporting { published } => format!("reporting ({published} published)"),
        ReporterState::Unavailable { reason } => format!("unavailable: {reason}"),
        ReporterState::Stopped => "stopped".into(),
    }
}

fn snapshot(session: &HttpSession) -> MapView {
    let view = session.view();
    let markers = view.markers();
    MapView {
        viewport: view.viewport(),
        version: markers.version(),
        reporter: describe_reporter(&session.reporter().state().borrow()),
        markers: markers.iter().cloned().collect(),
        self_marker: view.self_marker(),
    }
}

fn detail(view: &MapView) -> String {
    let rows: Vec<MarkerRow> = view
        .markers
        .iter()
        .map(|m| MarkerRow {
            id: m.id().to_string(),
            title: m.popup.heading.clone(),
            position: m.marker.position.to_string(),
            marker_type: m.marker.marker_type.to_string(),
        })
        .collect();

    let mut out = vec![
        format!(
            "View:     {} @ zoom {}",
            view.viewport.center, view.viewport.zoom
        ),
        format!("Reporter: {}", view.reporter),
    ];
    if let Some(ref me) = view.self_marker {
        let accuracy = me
            .accuracy_m
            .map(|a| format!(" (±{a:.0} m)"))
            .unwrap_or_default();
        out.push(format!("{}:    {}{accuracy}", me.popup.heading, me.position));
    }
    out.push(format!("Markers:  {} (layer v{})", rows.len(), view.version));
    if !rows.is_empty() {
        out.push(
            tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string(),
        );
    }
    out.join("\n")
}

fn print_view(session: &HttpSession, format: OutputFormat, quiet: bool) -> Result<(), CliError> {
    let view = snapshot(session);
    let out = output::render_single(format, &view, detail, |v| {
        v.markers
            .iter()
            .map(|m| m.id().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    output::print_output(&out, quiet);
    Ok(())
}

// ── Live view log ────────────────────────────────────────────────────

/// Log marker layer, self marker, and viewport changes until `stop` fires.
///
/// Changes published before `stop` are always logged first.
async fn watch_view(view: Arc<MapViewState>, mut stop: oneshot::Receiver<()>) {
    let mut layer = view.subscribe_markers();
    let mut me = view.subscribe_self_marker();
    let mut viewport = view.subscribe_viewport();
    debug!(
        markers = layer.current().len(),
        center = %viewport.current().center,
        "watching map view"
    );

    loop {
        tokio::select! {
            biased;
            Some(snapshot) = layer.changed() => {
                info!(version = snapshot.version(), markers = snapshot.len(), "marker layer updated");
            }
            Some(Some(marker)) = me.changed() => {
                info!(
                    position = %marker.position,
                    accuracy_m = ?marker.accuracy_m,
                    "self marker moved"
                );
            }
            Some(v) = viewport.changed() => {
                debug!(center = %v.center, zoom = v.zoom, "viewport moved");
            }
            _ = &mut stop => break,
        }
    }
}

fn spawn_view_log(session: &HttpSession) -> (oneshot::Sender<()>, JoinHandle<()>) {
    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(watch_view(Arc::clone(session.view()), rx));
    (tx, handle)
}

// ── Runner ───────────────────────────────────────────────────────────

struct Runner<'a> {
    session: &'a HttpSession,
    sensor: Option<PositionSender>,
    sample_timeout: Duration,
    ctx: &'a Context,
}

impl Runner<'_> {
    /// Run one step. `Err` is a gesture failure, reported by the caller.
    async fn step(&self, step: Step) -> Result<(), CliError> {
        match step {
            Step::Click { lat, lng } => {
                let marker = self.session.sync().click(lat, lng).await?;
                self.note(&format!("created {} at {}", marker.id, marker.position));
            }
            Step::Delete(id) => {
                let request = self
                    .session
                    .view()
                    .markers()
                    .get(&id)
                    .and_then(|m| m.delete_request().cloned())
                    .ok_or_else(|| CliError::NotFound {
                        resource_type: "marker".into(),
                        identifier: id.to_string(),
                        list_command: "markers list".into(),
                    })?;
                let deleted = self.session.sync().delete(request).await?;
                self.note(&format!("deleted {deleted}"));
            }
            Step::Refresh => {
                let r = self.session.sync().refresh().await?;
                self.note(&format!(
                    "refreshed: {} markers (+{} -{} ~{})",
                    r.diff.total, r.diff.added, r.diff.removed, r.diff.changed
                ));
            }
            Step::Fix { lat, lng, accuracy } => {
                let position = Coordinates::new(lat, lng)?;
                let mut fix = PositionFix::new(position);
                if let Some(meters) = accuracy {
                    fix = fix.with_accuracy(meters);
                }
                self.sample(|tx| async move { tx.send_fix(fix).await }).await?;
            }
            Step::Lost(reason) => {
                self.sample(|tx| async move { tx.send_error(SensorError::Unavailable(reason)).await })
                    .await?;
            }
            Step::Show => print_view(self.session, self.ctx.output, self.ctx.quiet)?,
        }
        Ok(())
    }

    /// Feed one sample to the reporter and wait until it has been handled.
    async fn sample<F, Fut>(&self, send: F) -> Result<(), CliError>
    where
        F: FnOnce(PositionSender) -> Fut,
        Fut: Future<Output = bool>,
    {
        let Some(ref tx) = self.sensor else {
            debug!("tracking disabled; ignoring position sample");
            return Ok(());
        };
        let mut processed = self.session.reporter().processed();
        let before = *processed.borrow_and_update();

        if !send(tx.clone()).await {
            return Err(CliError::SensorUnavailable {
                reason: "location reporter is not listening".into(),
            });
        }
        tokio::time::timeout(self.sample_timeout, processed.wait_for(|n| *n > before))
            .await
            .map_err(|_| CliError::Timeout)?
            .map_err(|_| CliError::Internal("location reporter stopped".into()))?;
        Ok(())
    }

    fn note(&self, message: &str) {
        if !self.ctx.quiet {
            eprintln!("{message}");
        }
    }
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, CliError> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    })
}

async fn run_script(
    runner: &Runner<'_>,
    input: Box<dyn AsyncBufRead + Unpin + Send>,
) -> Result<(), CliError> {
    let mut lines = input.lines();
    let mut number = 0;
    while let Some(line) = lines.next_line().await? {
        number += 1;
        let step = parse_line(&line).map_err(|reason| CliError::Script {
            line: number,
            reason,
        })?;
        let Some(step) = step else { continue };

        debug!(line = number, ?step, "running step");
        if let Err(e) = runner.step(step).await {
            if runner.ctx.quiet {
                continue;
            }
            eprintln!("line {number}: {e}");
        }
    }
    Ok(())
}

pub async fn handle(args: SessionArgs, ctx: &Context) -> Result<(), CliError> {
    let input = open_input(args.input.as_deref()).await?;
    let device_id = ctx.identity().get_or_create();
    let session = MapSession::connect(&ctx.sync, device_id)?;
    let (stop_log, view_log) = spawn_view_log(&session);

    let opened = match session.open().await {
        Ok(r) => r,
        Err(e) => {
            session.close().await;
            let _ = stop_log.send(());
            let _ = view_log.await;
            return Err(e.into());
        }
    };
    info!(markers = opened.diff.total, "session ready");

    let sensor = if args.no_track {
        None
    } else {
        let (tx, source) = ChannelPositionSource::new();
        session.track(source).await?;
        Some(tx)
    };

    let runner = Runner {
        session: &session,
        sensor,
        sample_timeout: ctx.sync.timeout + SAMPLE_GRACE,
        ctx,
    };
    let result = run_script(&runner, input).await;

    session.close().await;
    let _ = stop_log.send(());
    let _ = view_log.await;
    print_view(&session, ctx.output, ctx.quiet)?;
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!(
            parse_line("click 48.8584 2.2945").unwrap(),
            Some(Step::Click {
                lat: 48.8584,
                lng: 2.2945
            })
        );
        assert_eq!(
            parse_line("delete abc123").unwrap(),
            Some(Step::Delete(MarkerId::new("abc123")))
        );
        assert_eq!(parse_line("REFRESH").unwrap(), Some(Step::Refresh));
        assert_eq!(
            parse_line("fix -33.8688 151.2093 15").unwrap(),
            Some(Step::Fix {
                lat: -33.8688,
                lng: 151.2093,
                accuracy: Some(15.0)
            })
        );
        assert_eq!(
            parse_line("lost no satellites in view").unwrap(),
            Some(Step::Lost("no satellites in view".into()))
        );
        assert_eq!(parse_line("show").unwrap(), Some(Step::Show));
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   # just a note").unwrap(), None);
        assert_eq!(parse_line("refresh  # reload").unwrap(), Some(Step::Refresh));
    }

    #[test]
    fn lost_without_reason_gets_a_default() {
        assert_eq!(
            parse_line("lost").unwrap(),
            Some(Step::Lost("position lost".into()))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("click 1.0").unwrap_err().contains("longitude"));
        assert!(parse_line("click north 1.0").unwrap_err().contains("not a number"));
        assert!(parse_line("delete").unwrap_err().contains("marker id"));
        assert!(parse_line("refresh now").unwrap_err().contains("unexpected"));
        assert!(parse_line("teleport 1 2").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn reporter_states_read_naturally() {
        assert_eq!(
            describe_reporter(&ReporterState::Reporting { published: 3 }),
            "reporting (3 published)"
        );
        assert_eq!(
            describe_reporter(&ReporterState::Unavailable {
                reason: "denied".into()
            }),
            "unavailable: denied"
        );
    }
}
