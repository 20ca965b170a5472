//! partio CLI - partio command

use anyhow::Result;
use clap::{Parser, Subcommand};
use partio_cli::hooks::HookName;
use partio_cli::{cmd, config, hooks, logging, util};
use tracing::warn;

/// partio - Keep the why behind AI-assisted commits
#[derive(Parser)]
#[command(name = "partio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enable partio in the current repository
    Enable,
    /// Remove partio hooks from the current repository
    Disable {
        /// Also delete the .partio directory
        #[arg(long)]
        remove_data: bool,
    },
    /// Show partio status
    Status,
    /// Check the installation for problems
    Doctor,
    /// Delete all checkpoints by recreating the checkpoint branch
    Reset {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Report stored checkpoint data
    Clean,
    /// List checkpoints or branch off at one
    Rewind {
        /// List all checkpoints
        #[arg(long, conflicts_with = "to")]
        list: bool,
        /// Checkpoint ID to rewind to
        #[arg(long, value_name = "ID")]
        to: Option<String>,
    },
    /// Show a checkpoint
    Show {
        /// Checkpoint ID
        id: String,
        /// Print one session file (e.g. prompt, diff.patch, full.jsonl)
        #[arg(long)]
        file: Option<String>,
    },
    /// Resume the session behind a checkpoint
    Resume {
        /// Checkpoint ID
        id: String,
        /// Print the context instead of launching Claude Code
        #[arg(long)]
        print: bool,
        /// Check out partio/resume/<id> at the checkpoint commit first
        #[arg(long)]
        branch: bool,
    },
    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Print version information
    Version,
    /// Run a git hook (invoked by the installed hook scripts)
    #[command(name = "_hook", hide = true)]
    Hook {
        #[arg(value_enum)]
        name: HookName,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all resolved values
    List,
    /// Print one value
    Get {
        /// Key, e.g. strategy_options.push_sessions
        key: String,
    },
    /// Show settings file locations
    Path,
}

fn main() -> Result<()> {
    util::block_on(run(Cli::parse()))?
}

async fn run(cli: Cli) -> Result<()> {

    let repo_root = util::discover_root();
    let loaded = config::load(repo_root.as_deref(), cli.log_level.as_deref());
    logging::init(loaded.settings.effective_log_level());
    for warning in &loaded.warnings {
        warn!("{warning}");
    }
    let settings = &loaded.settings;

    match cli.command {
        Commands::Enable => cmd::enable::run(settings).await,
        Commands::Disable { remove_data } => cmd::disable::run(remove_data).await,
        Commands::Status => cmd::status::run(settings).await,
        Commands::Doctor => cmd::doctor::run(settings).await,
        Commands::Reset { yes } => cmd::reset::run(settings, yes).await,
        Commands::Clean => cmd::clean::run(settings).await,
        Commands::Rewind { list, to } => match to {
            Some(id) => cmd::rewind::run_to(settings, &id).await,
            None if list => cmd::rewind::run_list(settings).await,
            None => anyhow::bail!("Specify --list or --to <ID>"),
        },
        Commands::Show { id, file } => cmd::show::run(settings, &id, file.as_deref()).await,
        Commands::Resume { id, print, branch } => {
            cmd::resume::run(settings, &id, print, branch).await
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(&loaded).await,
            ConfigCommands::Get { key } => cmd::config::run_get(&loaded, &key).await,
            ConfigCommands::Path => cmd::config::run_path().await,
        },
        Commands::Version => cmd::version::run().await,
        Commands::Hook { name } => hooks::run(name, settings).await,
    }
}
