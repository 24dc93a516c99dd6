use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::ui::OutputFormat;

/// Add cloud-gaming kiosk shortcuts to Steam
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Use this shortcuts.vdf instead of discovering the Steam profile
    #[arg(long, global = true, value_name = "PATH")]
    pub shortcuts: Option<PathBuf>,

    /// Steam account id (userdata directory name) when several exist
    #[arg(long, global = true, value_name = "ID")]
    pub user: Option<String>,

    /// Browser to use for new shortcuts, overriding the config
    #[arg(long, global = true)]
    pub browser: Option<String>,

    /// Write shortcuts even while Steam is running
    #[arg(long, global = true)]
    pub force: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List existing shortcuts
    List,
    /// Add a single shortcut
    Add {
        /// Name shown in the Steam library
        title: String,
        /// Page opened in kiosk mode
        url: String,
    },
    /// Show what a batch run would add, without changing anything
    Preview {
        /// Batch file (defaults to the configured batch_file)
        file: Option<PathBuf>,
    },
    /// Import every "title: url" line of a batch file
    Batch {
        /// Batch file (defaults to the configured batch_file)
        file: Option<PathBuf>,
        /// Backup ledger (defaults to the configured ledger_file)
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Copy shortcuts from another shortcuts.vdf that are not present yet
    Merge {
        /// Source shortcuts.vdf
        other: PathBuf,
    },
    /// List supported browsers installed through flatpak
    Browsers,
    /// Check that installed browsers can read controller input
    Permissions {
        /// Grant missing access with a user-level flatpak override
        #[arg(long)]
        fix: bool,
    },
    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective settings
    Show,
    /// Print the settings file location
    Path,
    /// Choose the browser for new shortcuts
    SetBrowser { name: String },
    /// Choose the Steam collection tag for new shortcuts
    SetCollection { name: String },
}
