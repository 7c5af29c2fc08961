//! The `artifact-fetch` command.

use std::{io, process::ExitCode};

use anyhow::Context as _;
use artifact_fetch::{cli::Cli, pipeline, shutdown};
use clap::Parser as _;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(cli.log_level).into())
                .from_env_lossy(),
        )
        .init();

    let setup = cli
        .into_config()
        .and_then(|config| Ok((config.client()?, config)));
    let (client, config) = match setup {
        Ok(setup) => setup,
        Err(err) => {
            report(anyhow::Error::new(err), verbose);
            return ExitCode::from(1);
        }
    };

    let cancel = CancellationToken::new();
    let listener = shutdown::listen(cancel.clone());
    let mut checkpoint = config.starting_checkpoint();

    let result = pipeline::run(&client, &config, &mut checkpoint, &cancel, &mut io::stdout())
        .await
        .with_context(|| format!("failed to retrieve artifacts of {}/{}", config.owner, config.repo));

    listener.abort();
    println!("{checkpoint}");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(err, verbose);
            ExitCode::from(2)
        }
    }
}

fn report(err: anyhow::Error, verbose: bool) {
    if verbose {
        error!("{err:?}");
    } else {
        error!("{err:#}");
    }
}
