use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "netintent")]
#[command(version)]
#[command(about = "Reconcile declared network intent with devices managed by Cisco NSO", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub controller: ControllerArgs,

    #[command(subcommand)]
    pub command: Command,
}

// ============================================================================
// Controller connection
// ============================================================================

/// Connection flags; each overrides the config file
#[derive(Args, Debug, Default, Clone)]
pub struct ControllerArgs {
    /// Config file (default: ~/.config/netintent/config.toml)
    #[arg(long, global = true, env = "NETINTENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// NSO host
    #[arg(long, global = true, env = "NSO_HOST")]
    pub host: Option<String>,

    /// NSO RESTCONF port
    #[arg(long, global = true, env = "NSO_PORT")]
    pub port: Option<u16>,

    /// NSO username
    #[arg(long, global = true, env = "NSO_USERNAME")]
    pub username: Option<String>,

    /// NSO password
    #[arg(long, global = true, env = "NSO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Use HTTPS
    #[arg(long, global = true)]
    pub https: bool,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "NSO_TIMEOUT")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile devices with an intent file
    Apply(ApplyArgs),

    /// Show what apply would change
    Diff(DiffArgs),

    /// Validate an intent file without contacting the controller
    Validate(ValidateArgs),

    /// Pull running configuration from devices into NSO
    Sync(SyncArgs),

    /// Apply an NSO rollback file, or list them
    Rollback(RollbackArgs),

    /// Check that the controller answers
    Health,

    /// List devices managed by the controller
    Devices,

    /// Show recorded apply runs and their rollback ids
    History {
        /// Number of runs to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply / Diff
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    /// Intent file (YAML, JSON or TOML)
    #[arg(short, long)]
    pub intent: PathBuf,

    /// Show what would change without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Only reconcile these devices (repeatable)
    #[arg(short, long = "device")]
    pub devices: Vec<String>,

    /// Number of devices reconciled in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Record a rollback id for every commit
    #[arg(long)]
    pub track_rollback: bool,

    /// Don't sync and re-read devices after each change
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Intent file (YAML, JSON or TOML)
    #[arg(short, long)]
    pub intent: PathBuf,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,

    /// Only diff these devices (repeatable)
    #[arg(short, long = "device")]
    pub devices: Vec<String>,

    /// Also show the CLI NSO would send for each create/update
    #[arg(long)]
    pub native: bool,

    /// Number of devices read in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

// ============================================================================
// Validate
// ============================================================================

#[derive(Args)]
pub struct ValidateArgs {
    /// Intent file (YAML, JSON or TOML)
    #[arg(short, long)]
    pub intent: PathBuf,

    /// Treat the file as a service deployment instead of a network intent
    #[arg(long)]
    pub service: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Sync / Rollback
// ============================================================================

#[derive(Args)]
pub struct SyncArgs {
    /// Devices to sync (default: all devices known to NSO)
    #[arg(short, long = "device")]
    pub devices: Vec<String>,
}

#[derive(Args)]
pub struct RollbackArgs {
    /// Rollback id: offset from the newest file (0 = latest commit)
    pub id: Option<u64>,

    /// Treat the id as a fixed-number instead of an offset
    #[arg(long, requires = "id")]
    pub fixed: bool,

    /// List rollback files instead of applying one
    #[arg(short, long, conflicts_with = "id")]
    pub list: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}
