#![cfg_attr(test, allow(unused_crate_dependencies))]

use std::{io::Read, path::Path, time::Instant};

use anyhow::{anyhow, Context};
use args::{Args, Command};
use clap::{crate_version, Parser};
use config::Config;
use quell::{QuellClient, Transport};
use quell_local::NativeTransport;
use tokio::runtime;

mod args;
mod config;
mod telemetry;

const THREAD_NAME: &str = "quell";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    telemetry::init(&args);

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(THREAD_NAME)
        .build()?;

    runtime.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let crate_version = crate_version!();
    tracing::debug!("quell {crate_version}");

    let config = Config::load(&args.config)?;
    let options = config.options()?;
    let store = quell_local::open_store(&options.storage).await?;

    match args.command {
        Command::Query { file, endpoint, repeat } => {
            let query = read_query(&file)?;
            let endpoint = endpoint
                .or_else(|| config.endpoint.clone())
                .ok_or_else(|| anyhow!("no endpoint given, pass --endpoint or set `endpoint` in the configuration"))?;

            let transport = Transport::new(NativeTransport::new()?);
            let client = QuellClient::new(store, transport, config.type_map(), options);

            for run in 1..=repeat.max(1) {
                let started = Instant::now();
                let response = client.resolve(&endpoint, &query).await?;

                tracing::info!(
                    status = %response.status,
                    duration = ?started.elapsed(),
                    "run {run} of {repeat} resolved"
                );
                println!("{}", serde_json::to_string_pretty(&response.body)?);
            }
        }
        Command::Keys => {
            for key in store.keys().await? {
                println!("{key}");
            }
        }
        Command::Clear => {
            store.clear().await?;
            tracing::info!("cache cleared");
        }
    }

    Ok(())
}

fn read_query(file: &Path) -> anyhow::Result<String> {
    if file == Path::new("-") {
        let mut query = String::new();
        std::io::stdin().read_to_string(&mut query)?;
        return Ok(query);
    }

    std::fs::read_to_string(file).with_context(|| format!("could not read {}", file.display()))
}
