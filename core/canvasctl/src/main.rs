//! canvasctl: command-line client for canvasd.
//!
//! Acts as an external tool caller. Canvas commands are queued on the daemon
//! and attributed to the AI unless `--as-user` is given; the engine drains
//! and gates them.
//!
//! ## Subcommands
//!
//! - `health`, `state`, `events`: inspect the daemon
//! - `switch-tab`, `open-tab`, `close-tab`, `open-request`: queue canvas commands
//! - `drift set`, `drift list`: drift review decisions

mod commands;
mod logging;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "canvasctl")]
#[command(about = "Inspect and drive the synced canvas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Who the command is attributed to.
#[derive(Args, Clone, Debug, Default)]
pub struct ActorArgs {
    /// Attribute to the user instead of the AI
    #[arg(long)]
    pub as_user: bool,

    /// AI model name recorded on the envelope
    #[arg(long)]
    pub model: Option<String>,

    /// AI session id recorded on the envelope
    #[arg(long)]
    pub session: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon health
    Health,

    /// Latest synced canvas snapshot
    State,

    /// Recent canvas event records
    Events {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ask the canvas to activate a context
    SwitchTab {
        #[arg(value_name = "CONTEXT_ID")]
        context_id: String,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Ask the canvas to open a blank request tab
    OpenTab {
        #[arg(long)]
        label: Option<String>,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Ask the canvas to close a context
    CloseTab {
        #[arg(value_name = "CONTEXT_ID")]
        context_id: String,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Ask the canvas to open a saved collection request
    OpenRequest {
        #[arg(long)]
        collection: String,
        #[arg(long)]
        request: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "GET")]
        method: String,
        #[arg(long)]
        url: String,
        /// Repeatable `Name: value`
        #[arg(long = "header", value_name = "HEADER")]
        headers: Vec<String>,
        #[arg(long)]
        body: Option<String>,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Drift review decisions
    Drift {
        #[command(subcommand)]
        command: DriftCommands,
    },
}

#[derive(Subcommand)]
enum DriftCommands {
    /// Record a decision for `collection:method:path`
    Set {
        #[arg(value_name = "COLLECTION_ID")]
        collection_id: String,
        #[arg(value_name = "METHOD")]
        method: String,
        #[arg(value_name = "PATH")]
        path: String,
        /// pending, accepted or ignored
        #[arg(value_name = "STATUS")]
        status: String,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// List stored decisions
    List,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Health => commands::health(),
        Commands::State => commands::state(),
        Commands::Events { limit } => commands::events(limit),
        Commands::SwitchTab { context_id, actor } => commands::switch_tab(&context_id, &actor),
        Commands::OpenTab { label, actor } => commands::open_tab(label, &actor),
        Commands::CloseTab { context_id, actor } => commands::close_tab(&context_id, &actor),
        Commands::OpenRequest {
            collection,
            request,
            name,
            method,
            url,
            headers,
            body,
            actor,
        } => commands::open_request(
            commands::OpenRequest {
                collection_id: collection,
                request_id: request,
                name,
                method,
                url,
                headers,
                body,
            },
            &actor,
        ),
        Commands::Drift { command } => match command {
            DriftCommands::Set {
                collection_id,
                method,
                path,
                status,
                actor,
            } => commands::drift_set(&collection_id, &method, &path, &status, &actor),
            DriftCommands::List => commands::drift_list(),
        },
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "canvasctl failed");
        eprintln!("canvasctl: {}", err);
        std::process::exit(1);
    }
}
