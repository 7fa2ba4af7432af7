mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    assessment::AssessmentSubcommand, config::ConfigSubcommand, tickets::TicketsSubcommand,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "impact",
    about = "Regulatory impact assessment for trading workflows",
    version
)]
struct Cli {
    /// Project root (defaults to the nearest directory containing .impact/)
    #[arg(long, global = true, env = "IMPACT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .impact/ with a default config and an empty store
    Init,

    /// Load workflows, systems, components, regulations and repository
    /// indexes from a YAML seed file
    Seed {
        /// Path to the seed file
        file: PathBuf,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// List registered workflows
    Workflows {
        /// Only workflows of this type
        #[arg(long = "type", value_name = "TYPE")]
        workflow_type: Option<String>,
    },

    /// Show a workflow's systems and documentation
    Analyze {
        /// Workflow id
        workflow: String,
    },

    /// Assess the impact of a regulatory change on a workflow
    Assess {
        #[arg(long)]
        workflow: String,
        #[arg(long)]
        regulation: String,
        /// Free-text description of the change
        #[arg(long)]
        change: String,
    },

    /// Inspect and retry stored assessments
    Assessment {
        #[command(subcommand)]
        subcommand: AssessmentSubcommand,
    },

    /// Inspect and drain the ticket outbox
    Tickets {
        #[command(subcommand)]
        subcommand: TicketsSubcommand,
    },

    /// Show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    // The API server logs at INFO; everything else stays quiet unless RUST_LOG says otherwise.
    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Seed { file } => cmd::seed::run(&root, &file, cli.json),
        Commands::Serve { port, bind } => cmd::serve::run(&root, port, bind),
        Commands::Workflows { workflow_type } => {
            cmd::workflow::list(&root, workflow_type.as_deref(), cli.json)
        }
        Commands::Analyze { workflow } => cmd::workflow::analyze(&root, &workflow, cli.json),
        Commands::Assess {
            workflow,
            regulation,
            change,
        } => cmd::assessment::assess(&root, workflow, regulation, change, cli.json),
        Commands::Assessment { subcommand } => cmd::assessment::run(&root, subcommand, cli.json),
        Commands::Tickets { subcommand } => cmd::tickets::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
