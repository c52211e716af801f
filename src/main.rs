use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod app;

/// Build chess repertoires from PGN and write them back out
#[derive(Parser, Debug)]
#[command(name = "repertoire", version, about)]
pub struct Cli {
    /// TOML file with study settings
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge every game of the given files into one tree and print it as PGN
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Merge the given files and print the main line with game statistics
    Stats {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Number of moves to show
        #[arg(long, default_value_t = 10)]
        depth: usize,
    },
    /// Merge the given files and print the tree as JSON
    Tree {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the JSON schema of the tree output
    Schema,
    /// Read study commands from stdin
    Shell,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    app::run(Cli::parse())
}
