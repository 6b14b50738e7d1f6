#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(author, version, about = "Install, hoist and link dependencies across a multi-package repository", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install external dependencies, link local packages and run lifecycle scripts
    Bootstrap {
        /// Hoist matching external dependencies to the repository root
        /// (bare flag hoists everything)
        #[arg(long, value_name = "GLOB", num_args = 0..=1, default_missing_value = "**")]
        hoist: Vec<String>,

        /// Exclude matching names from hoisting
        #[arg(long, value_name = "GLOB")]
        nohoist: Vec<String>,

        /// Only operate on packages whose name matches this glob
        #[arg(long, value_name = "GLOB")]
        scope: Vec<String>,

        /// Skip packages whose name matches this glob
        #[arg(long, value_name = "GLOB")]
        ignore: Vec<String>,

        /// Bound on parallel installs, scripts and links
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        /// External package-installation client program
        #[arg(long, value_name = "PROG", default_value = "npm")]
        npm_client: String,

        /// Extra argument passed through to the client (repeatable)
        #[arg(long = "npm-client-arg", value_name = "ARG")]
        npm_client_args: Vec<String>,

        /// The client manages workspaces natively (incompatible with --hoist)
        #[arg(long)]
        use_workspaces: bool,

        /// Mutex token for safe concurrent yarn invocations
        #[arg(long, value_name = "TOKEN")]
        mutex: Option<String>,

        /// Skip all lifecycle scripts
        #[arg(long)]
        ignore_scripts: bool,

        /// Fail on local dependency cycles instead of batching them together
        #[arg(long)]
        reject_cycles: bool,
    },

    /// List workspace packages
    List,

    /// Print the topological install batches
    Batches {
        /// Fail on local dependency cycles instead of batching them together
        #[arg(long)]
        reject_cycles: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    let cwd = match &cli.cwd {
        Some(path) => dunce::canonicalize(path).unwrap_or_else(|_| path.clone()),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    match cli.command {
        Commands::Bootstrap {
            hoist,
            nohoist,
            scope,
            ignore,
            concurrency,
            npm_client,
            npm_client_args,
            use_workspaces,
            mutex,
            ignore_scripts,
            reject_cycles,
        } => {
            commands::bootstrap::run(
                &cwd,
                commands::bootstrap::Flags {
                    hoist,
                    nohoist,
                    scope,
                    ignore,
                    concurrency,
                    npm_client,
                    npm_client_args,
                    use_workspaces,
                    mutex,
                    ignore_scripts,
                    reject_cycles,
                },
                cli.json,
            )
            .await
        }
        Commands::List => commands::list::run(&cwd, cli.json),
        Commands::Batches { reject_cycles } => {
            commands::batches::run(&cwd, reject_cycles, cli.json)
        }
    }
}
