//! Tracing subscriber setup.

use crate::settings::{LogFormat, Logging};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "pague_direto=info,warp=info";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Could not init logger: {0}")]
    InitLog(String),
}

/// Install the global subscriber. Filtering follows `RUST_LOG`.
pub fn logger_init(logging: &Logging) -> Result<(), Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };

    result.map_err(|err| Error::InitLog(err.to_string()))
}
