//! This program is free software: you can redistribute it and/or modify
//! it under the terms of the GNU General Public License as published by
//! the Free Software Foundation, either version 3 of the License, or
//! (at your option) any later version.
//!
//! This program is distributed in the hope that it will be useful,
//! but WITHOUT ANY WARRANTY; without even the implied warranty of
//! MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//! GNU General Public License for more details.
//!
//! You should have received a copy of the GNU General Public License
//! along with this program.  If not, see <https://www.gnu.org/licenses/>.

mod config;
mod scan;
mod spool;
mod stability;
mod syncthing;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pipespool")]
#[command(about = "Watch synced input folders and spool a pipeline run per new stable directory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One-shot scan: gate on sync completion, then submit a run per new stable directory
    Scan {
        #[command(flatten)]
        opts: config::Opts,
        /// Only print what would be submitted
        #[arg(long)]
        dry_run: bool,
    },
    /// Watch the input base and scan on change. Long-running form; a service starts this.
    Watch {
        #[command(flatten)]
        opts: config::Opts,
        /// Run one full scan then exit (useful for service startup)
        #[arg(long)]
        once: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Scan { opts, dry_run } => {
            let settings = config::Settings::resolve(opts)?;
            scan::run(&settings, dry_run)
        }
        Commands::Watch { opts, once } => {
            let settings = config::Settings::resolve(opts)?;
            watch::run(&settings, once)
        }
    }
}
