//! Process entry: open the store and serve the API.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime;
use tracing::{info, instrument};
use warp::{http::Method, Filter};

use crate::error::StoreError;
use crate::http;
use crate::settings::Settings;
use crate::store::{Store, StoreConfig};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Could not open store: {0}")]
    Store(#[from] StoreError),

    #[error("Socket Addr Error with host {host} / port {port}: {source}")]
    SockAddr {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[error("Addr Resolution Error {0}")]
    AddrResolution(String),

    #[error("Could not build runtime: {0}")]
    Runtime(std::io::Error),
}

/// Build the runtime and serve until the process is stopped.
pub fn run(settings: Settings) -> Result<(), Error> {
    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(settings.nb_threads.unwrap_or_else(num_cpus::get))
        .enable_all()
        .build()
        .map_err(Error::Runtime)?;

    runtime.block_on(run_server(settings))
}

fn resolve(settings: &Settings) -> Result<SocketAddr, Error> {
    let host = settings.service.host.clone();
    let port = settings.service.port;
    (host.as_str(), port)
        .to_socket_addrs()
        .map_err(|source| Error::SockAddr {
            host: host.clone(),
            port,
            source,
        })?
        .next()
        .ok_or_else(|| Error::AddrResolution(format!("Cannot resolve {}:{}", host, port)))
}

#[instrument(skip(settings))]
pub async fn run_server(settings: Settings) -> Result<(), Error> {
    info!("Opening document at {}", settings.database.path.display());
    let store = Arc::new(Store::open_or_create(StoreConfig::from(&settings))?);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(vec!["content-type"]);

    let api = http::api(store, settings.service.content_length_limit)
        .with(cors)
        .with(warp::trace(|info| {
            tracing::info_span!(
                "request",
                method = %info.method(),
                path = %info.path(),
            )
        }));

    let addr = resolve(&settings)?;

    for spec in &settings.collections {
        info!(
            collection = %spec.name,
            id_field = %spec.id_field,
            "serving /{}",
            spec.name
        );
    }
    info!("Serving on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
