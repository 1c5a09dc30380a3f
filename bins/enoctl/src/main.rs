// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `enoctl` — operator CLI for the Eno scheduling core.
//!
//! Human-facing output only; this is the one crate the workspace's
//! `clippy::print_stdout` deny-lint is narrowly lifted for.

#![allow(clippy::print_stdout)]

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use eno_cluster_port::InMemoryClusterStore;
use eno_config::scheduler_config::SchedulerConfig;
use eno_config_fs::FsConfigStore;
use eno_kernel::Kernel;
use eno_types::{Composition, Synthesizer};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Print the scheduler configuration that would be used (persisted
    /// override if one exists, otherwise the compiled-in default).
    Config,
    /// Run a single dispatch-loop tick against a local fixture cluster and
    /// print what it decided.
    Tick {
        /// JSON file containing a `Vec<Synthesizer>`.
        #[clap(long)]
        synthesizers: PathBuf,
        /// JSON file containing a `Vec<Composition>`.
        #[clap(long)]
        compositions: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.cmd {
        Command::Config => {
            let config = load_config()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Tick { synthesizers, compositions } => {
            let synthesizers: Vec<Synthesizer> = read_json(&synthesizers)?;
            let compositions: Vec<Composition> = read_json(&compositions)?;
            let store = InMemoryClusterStore::seeded(compositions, synthesizers);
            let kernel = Kernel::new(store, load_config()?);
            let outcome = kernel.tick().await?;
            println!("{outcome:#?}");
        }
    }

    Ok(())
}

fn load_config() -> Result<SchedulerConfig> {
    let store = FsConfigStore::new().context("open filesystem config store")?;
    SchedulerConfig::load_or_default(&store).context("load scheduler config")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parse {}", path.display()))
}
