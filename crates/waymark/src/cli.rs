//! Clap derive structures for the `waymark` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// waymark -- shared map markers and live location from the command line
#[derive(Debug, Parser)]
#[command(
    name = "waymark",
    version,
    about = "Manage shared map markers and device locations",
    long_about = "Command-line client for a waymark marker service.\n\n\
        Lists, creates, and removes shared markers, publishes this device's\n\
        position, and drives a scripted map session against the server.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Service profile to use
    #[arg(long, short = 'p', env = "WAYMARK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Marker service URL (overrides profile)
    #[arg(long, short = 'u', env = "WAYMARK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "WAYMARK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "WAYMARK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "WAYMARK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage shared map markers
    #[command(alias = "m")]
    Markers(MarkersArgs),

    /// Publish and inspect device locations
    #[command(alias = "loc")]
    Locations(LocationsArgs),

    /// Show this device's identifier
    Identity,

    /// Run a scripted map session (clicks, deletes, position fixes)
    Session(SessionArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Markers ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MarkersArgs {
    #[command(subcommand)]
    pub command: MarkersCommand,
}

#[derive(Debug, Subcommand)]
pub enum MarkersCommand {
    /// List every shared marker
    #[command(alias = "ls")]
    List,

    /// Create a marker
    Add(MarkerAddArgs),

    /// Change fields of an existing marker
    Update(MarkerUpdateArgs),

    /// Delete a marker
    #[command(alias = "rm")]
    Remove {
        /// Marker id
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct MarkerAddArgs {
    /// Latitude in degrees (-90..90)
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees (-180..180)
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,

    /// Marker title [default: "Marker at LAT, LNG"]
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Category tag [default: from config, else "custom"]
    #[arg(long = "type")]
    pub marker_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct MarkerUpdateArgs {
    /// Marker id
    pub id: String,

    /// New latitude (requires --lng)
    #[arg(long, allow_negative_numbers = true, requires = "lng")]
    pub lat: Option<f64>,

    /// New longitude (requires --lat)
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lng: Option<f64>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long = "type")]
    pub marker_type: Option<String>,
}

// ── Locations ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LocationsArgs {
    #[command(subcommand)]
    pub command: LocationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LocationsCommand {
    /// Report a position for this device
    Publish {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },

    /// Every report for one device, oldest first
    History {
        /// Device id [default: this device]
        device_id: Option<String>,
    },

    /// Most recent report per device
    Latest,
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Read the script from a file instead of stdin
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Do not report this device's position (ignore `fix` lines)
    #[arg(long)]
    pub no_track: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
