//! Clap derive structures for the `spcctl` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// spcctl -- read and control a Vanderbilt SPC alarm panel through its Web UI
#[derive(Debug, Parser)]
#[command(
    name = "spcctl",
    version,
    about = "Read and control a Vanderbilt SPC alarm panel",
    long_about = "Talks to the panel's built-in Web UI over its legacy TLS endpoint.\n\n\
        Reads the \"All Areas\" arming state and arms (fullset) or disarms (unset)\n\
        it, confirming every command by reading the state back.",
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
    /// Panel profile to use
    #[arg(long, short = 'p', env = "SPC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Panel Web UI URL (overrides profile)
    #[arg(long, short = 'u', env = "SPC_URL", global = true)]
    pub url: Option<String>,

    /// Web UI user name (overrides profile)
    #[arg(long, env = "SPC_USERNAME", global = true, hide_env = true)]
    pub username: Option<String>,

    /// TLS mode (overrides profile)
    #[arg(long, value_enum, global = true)]
    pub tls: Option<TlsArg>,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SPC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SPC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TlsArg {
    /// TLS 1.2 with the panel's legacy RSA cipher, no certificate checks
    Legacy,
    /// Library defaults with full verification (panel behind a proxy)
    System,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Bare value (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the confirmed "All Areas" state
    #[command(alias = "st")]
    Status,

    /// Fullset all areas and wait for confirmation
    Arm,

    /// Unset all areas and wait for confirmation
    Disarm,

    /// Poll the panel and print every state change
    Watch(WatchArgs),

    /// Show panel identification (model, serial number, site)
    Info,

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the loaded configuration (passwords redacted)
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
