mod cli;
mod config;
mod progress;

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use engine_logging::{engine_error, engine_info, engine_warn, redact, LogSettings};
use harvester_engine::{
    ClientCredentials, Dispatcher, Harvester, ReqwestFetcher, RunSummary, StaticToken, TokenSource,
};

use crate::cli::Cli;
use crate::config::{Credential, RunConfig};
use crate::progress::LogProgress;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut log_settings = LogSettings::for_verbosity(cli.debug);
    if let Some(path) = &cli.log_file {
        log_settings = log_settings.with_file(path.clone());
    }
    engine_logging::initialize(&log_settings);

    match run(&cli) {
        Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
        Ok(summary) => {
            for (table, err) in &summary.failed {
                engine_warn!("{table} was not harvested: {err}");
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            engine_error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let config = RunConfig::from_cli(cli, Utc::now())?;
    if config.plan.targets.is_empty() {
        engine_info!("no targets selected, nothing to do");
        return Ok(RunSummary::default());
    }
    engine_info!(
        "harvesting {} targets from {} since {}",
        config.plan.targets.len(),
        config.location,
        config.window.from_timestamp()
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    runtime.block_on(harvest(&config))
}

async fn harvest(config: &RunConfig) -> Result<RunSummary> {
    let tokens = token_source(config)?;
    let fetcher = ReqwestFetcher::new(config.fetch.clone())?;
    let dispatcher = Dispatcher::from_config(&config.sinks, &config.fetch)?;
    if dispatcher.kinds().is_empty() {
        engine_warn!("no sink enabled; records are fetched and discarded");
    }
    let harvester = Harvester::new(
        Box::new(fetcher),
        dispatcher,
        config.location.as_str(),
        &config.fetch,
    );

    let summary = harvester
        .run(&config.plan.targets, tokens.as_ref(), &LogProgress)
        .await?;
    Ok(summary)
}

fn token_source(config: &RunConfig) -> Result<Box<dyn TokenSource>> {
    match &config.credential {
        Credential::AccessToken(token) => {
            engine_info!("using supplied access token {}", redact(token));
            Ok(Box::new(StaticToken::new(token.clone())))
        }
        Credential::ClientCredentials {
            tenant_id,
            client_id,
            client_secret,
        } => {
            engine_info!("requesting access token for client {client_id}");
            let source = ClientCredentials::new(
                tenant_id.as_str(),
                client_id.as_str(),
                client_secret.as_str(),
                &config.fetch,
            )?;
            Ok(Box::new(source))
        }
    }
}
