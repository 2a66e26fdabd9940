//! MatCache CLI binary.
//!
//! Static analysis for MATLAB-style scripts: function-signature tagging,
//! cross-file call-graph construction, and cacheable-result selection.
//!
//! # Usage
//!
//! ```bash
//! # Extract signatures from every .m file in a directory
//! mc tag src/ --output function_attributes.json
//!
//! # Build the call graph rooted at one script
//! mc graph src/pipeline.m --registry function_attributes.json
//!
//! # Select the sub-function results that are safe to memoize
//! mc cache src/pipeline.m --registry function_attributes.json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use mc_cli::{cache_command, graph_command, tag_command, CacheArgs, GraphArgs, TagArgs};
use tracing::error;

#[derive(Parser)]
#[command(
    name = "mc",
    version = env!("CARGO_PKG_VERSION"),
    about = "MatCache: static cacheability analysis for MATLAB-style scripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level (overrides --verbose/--quiet)
    #[arg(long, global = true, value_enum)]
    log: Option<LogLevel>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract function signatures from a source directory
    Tag(TagArgs),

    /// Build the cross-file call graph from a root script
    Graph(GraphArgs),

    /// Select cacheable sub-function results from a root script
    Cache(CacheArgs),
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet, cli.log);

    let result = match &cli.command {
        Commands::Tag(args) => tag_command(args),
        Commands::Graph(args) => graph_command(args),
        Commands::Cache(args) => cache_command(args),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn setup_logging(verbose: u8, quiet: bool, log_level: Option<LogLevel>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if let Some(level) = log_level {
        EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    } else if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .init();
}
