use clap::Parser;
use thiserror::Error;

use pague_direto::logger::{self, logger_init};
use pague_direto::server;
use pague_direto::settings::{Command, Opts, Settings, SettingsError};

#[derive(Debug, Error)]
enum Error {
    #[error("Settings Error: {0}")]
    Settings(#[from] SettingsError),
    #[error("Logger Error: {0}")]
    Logger(#[from] logger::Error),
    #[error("Server Error: {0}")]
    Server(#[from] server::Error),
    #[error("Could not print settings: {0}")]
    Print(#[from] serde_json::Error),
}

fn main() -> Result<(), Error> {
    let opts = Opts::parse();
    let settings = Settings::new(&opts)?;
    match opts.cmd {
        Command::Run => {
            logger_init(&settings.logging)?;
            server::run(settings)?;
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}
