mod blockchain;
mod config;
mod console;
mod error;
mod mining;
mod wallet;

use std::io;
use std::process::ExitCode;

use dotenvy::dotenv;
use log::{error, info};

use blockchain::{BlockSink, Blockchain};
use config::{Config, Output};
use console::{JsonSink, LineSource, TextSink};

fn main() -> ExitCode {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env();
    info!(
        "⛓️ building {} blocks with {} miners (window {:?}..{:?})",
        config.chain_length, config.miners, config.limits.lower, config.limits.upper
    );

    let mut source = LineSource::stdin();
    let result = match config.output {
        Output::Text => run(&config, &mut source, TextSink::new(io::stdout())),
        Output::Json => run(&config, &mut source, JsonSink::new(io::stdout())),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("chain build aborted: {err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run<K: BlockSink>(
    config: &Config,
    source: &mut LineSource<io::StdinLock<'static>, io::Stdout>,
    mut sink: K,
) -> Result<(), error::Error> {
    let chain = Blockchain::build(config, source, &mut sink)?;
    if let Err(err) = chain.validate(config.initial_zeros, config.limits) {
        error!("built chain failed validation: {err}");
    }
    Ok(())
}
