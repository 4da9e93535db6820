//! # askgraph CLI
//!
//! Ask natural-language questions about a developer knowledge graph of
//! pull requests, issues, chat messages and documents.
//!
//! ## Usage
//!
//! ```bash
//! # One question
//! askgraph ask Who wrote the OAuth integration?
//!
//! # Read questions from stdin
//! askgraph interactive
//!
//! # Embed nodes that have no embedding yet
//! askgraph embed
//! ```

use askgraph::commands;
use askgraph_rag::embeddings::DEFAULT_BATCH_SIZE;
use clap::{Parser, Subcommand};

/// Initialize logger based on verbose flag
fn init_logger(verbose: bool) {
    let mut log_builder = env_logger::Builder::from_default_env();
    if verbose {
        log_builder.filter_level(log::LevelFilter::Debug);
    } else {
        log_builder.filter_level(log::LevelFilter::Info);
    }
    log_builder.init();
}

/// Main CLI structure
#[derive(Parser)]
#[command(name = "askgraph")]
#[command(about = "Ask questions about a developer knowledge graph", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// Natural language question (words are joined with spaces)
        #[arg(value_name = "QUERY", required = true, num_args = 1..)]
        query: Vec<String>,
        /// Number of nodes to retrieve (defaults to the configured value)
        #[arg(long, short = 'k', value_name = "COUNT")]
        top_k: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print selection and retrieval details to stderr
        #[arg(long)]
        debug: bool,
        /// Enable verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Answer questions read from stdin until `exit`
    Interactive {
        /// Number of nodes to retrieve (defaults to the configured value)
        #[arg(long, short = 'k', value_name = "COUNT")]
        top_k: Option<usize>,
        /// Print selection and retrieval details to stderr
        #[arg(long)]
        debug: bool,
        /// Enable verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Embed every node that has no embedding yet
    Embed {
        /// Nodes fetched and embedded per request
        #[arg(long, value_name = "N", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Enable verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Check database connectivity and embedded data
    Status {
        /// Enable verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Config subcommands
#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show {
        /// Show full secrets instead of masked values
        #[arg(long)]
        show_secrets: bool,
    },
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let exit_code = run_command(cli.command).await;
    std::process::exit(exit_code);
}

async fn run_command(command: Commands) -> i32 {
    use askgraph::exit_codes::*;

    match command {
        Commands::Ask {
            query,
            top_k,
            json,
            debug,
            verbose,
        } => {
            init_logger(verbose);
            let args = commands::ask::AskArgs {
                query: query.join(" "),
                top_k,
                json,
                debug,
            };
            match commands::ask::execute(args).await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Ask error: {}", e);
                    EXIT_ERROR
                }
            }
        }
        Commands::Interactive {
            top_k,
            debug,
            verbose,
        } => {
            init_logger(verbose);
            let args = commands::interactive::InteractiveArgs { top_k, debug };
            match commands::interactive::execute(args).await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Interactive error: {}", e);
                    EXIT_ERROR
                }
            }
        }
        Commands::Embed {
            batch_size,
            verbose,
        } => {
            init_logger(verbose);
            let args = commands::embed::EmbedArgs { batch_size };
            match commands::embed::execute(args).await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Embed error: {}", e);
                    EXIT_ERROR
                }
            }
        }
        Commands::Status { verbose } => {
            init_logger(verbose);
            match commands::status::execute().await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Status error: {}", e);
                    EXIT_ERROR
                }
            }
        }
        Commands::Config { command } => {
            init_logger(false);
            run_config_command(command)
        }
    }
}

fn run_config_command(command: ConfigCommands) -> i32 {
    use askgraph::exit_codes::*;

    let result = match command {
        ConfigCommands::Show { show_secrets } => {
            commands::config::execute_show(commands::config::ConfigShowArgs { show_secrets })
        }
        ConfigCommands::Init { force } => {
            commands::config::execute_init(commands::config::ConfigInitArgs { force })
        }
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Config error: {}", e);
            EXIT_CONFIG_ERROR
        }
    }
}
