//! CLI argument parsing via `clap`.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bladeaudit",
    version,
    about = "Static audit of Blade view templates",
    long_about = "bladeaudit: report size metrics, directive usage, nesting levels and best-practice notes for Blade views.\n\nConfiguration precedence: CLI > bladeaudit.toml > defaults.",
    after_help = "Examples:\n  bladeaudit audit admin.users.index\n  bladeaudit audit mail::welcome --output json\n  bladeaudit audit --all --fail-on-warnings\n  bladeaudit list --root ../shop",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Clone, Debug, Default)]
/// Flags shared by every command that reads the project.
pub struct CommonArgs {
    #[arg(long, help = "Project root (default: closest ancestor with bladeaudit.toml, composer.json or .git)")]
    pub root: Option<String>,
    #[arg(long, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Enable debug logging on stderr")]
    pub verbose: bool,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(
        about = "Show version",
        long_about = "Print the current bladeaudit version."
    )]
    Version,
    /// Audit one view or every view
    #[command(
        about = "Audit views",
        long_about = "Analyze a view by logical name (dots for directories, ns:: for namespaces) or by file path. Version-gated notes follow --host-version, else the configured or composer.lock version.",
        after_help = "Examples:\n  bladeaudit audit welcome\n  bladeaudit audit --all --host-version 5.8.0"
    )]
    Audit {
        #[arg(help = "View name, e.g. admin.users.index", required_unless_present = "all", conflicts_with = "all")]
        view: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Audit every view found under the configured paths")]
        all: bool,
        #[arg(long, help = "Framework version used to gate notes (e.g. 5.8.13)")]
        host_version: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Exit with code 1 when any note is reported")]
        fail_on_warnings: bool,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// List view names
    #[command(
        about = "List views",
        long_about = "Print every logical view name discoverable under the configured paths and namespaces."
    )]
    List {
        #[command(flatten)]
        common: CommonArgs,
    },
}
