use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;
use warp::{
    http::StatusCode,
    reject::Reject,
    reply::{json, with_status, Json, WithStatus},
};

use crate::error::StoreError;
use crate::http::api::{MessageBody, StatusResponseBody};
use crate::store::Store;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared by the handlers of one collection.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<Store>,
    pub collection: String,
}

impl Context {
    pub fn new(store: Arc<Store>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }
}

/// Store failure surfaced as a 500.
#[derive(Debug)]
pub struct InternalError {
    pub info: String,
}

impl Reject for InternalError {}

impl From<StoreError> for InternalError {
    fn from(err: StoreError) -> Self {
        InternalError {
            info: err.to_string(),
        }
    }
}

type Reply = WithStatus<Json>;

fn ok<T: serde::Serialize>(body: &T) -> Reply {
    with_status(json(body), StatusCode::OK)
}

fn not_found(message: String) -> Reply {
    with_status(json(&MessageBody::new(message)), StatusCode::NOT_FOUND)
}

/// Run a mutating store call off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, warp::Rejection>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| {
            warp::reject::custom(InternalError {
                info: err.to_string(),
            })
        })?
        .map_err(|err| warp::reject::custom(InternalError::from(err)))
}

#[instrument(skip(ctx), fields(collection = %ctx.collection))]
pub async fn list_records(ctx: Context) -> Result<Reply, warp::Rejection> {
    Ok(ok(&ctx.store.list(&ctx.collection)))
}

#[instrument(skip(ctx), fields(collection = %ctx.collection))]
pub async fn get_record(ctx: Context, id: String) -> Result<Reply, warp::Rejection> {
    match ctx.store.find_by_id(&ctx.collection, &id) {
        Some(record) => Ok(ok(&record)),
        None => Ok(not_found(format!("Record {} not found", id))),
    }
}

#[instrument(skip(ctx, fields), fields(collection = %ctx.collection))]
pub async fn create_record(
    ctx: Context,
    fields: Map<String, Value>,
) -> Result<Reply, warp::Rejection> {
    let Context { store, collection } = ctx;
    let record = blocking(move || store.create_record(&collection, fields)).await?;
    Ok(ok(&record))
}

#[instrument(skip(ctx, partial), fields(collection = %ctx.collection))]
pub async fn update_record(
    ctx: Context,
    id: String,
    partial: Map<String, Value>,
) -> Result<Reply, warp::Rejection> {
    let Context { store, collection } = ctx;
    let lookup = id.clone();
    match blocking(move || store.update_by_id(&collection, &lookup, partial)).await? {
        Some(record) => Ok(ok(&record)),
        None => Ok(not_found(format!("Record {} not found", id))),
    }
}

#[instrument(skip(ctx), fields(collection = %ctx.collection))]
pub async fn delete_record(ctx: Context, id: String) -> Result<StatusCode, warp::Rejection> {
    let Context { store, collection } = ctx;
    blocking(move || store.delete_by_id(&collection, &id)).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(ctx), fields(collection = %ctx.collection))]
pub async fn records_in_period(
    ctx: Context,
    start: String,
    end: String,
) -> Result<Reply, warp::Rejection> {
    let records = ctx.store.filter_by_date_range(&ctx.collection, &start, &end);
    if records.is_empty() {
        return Ok(not_found(format!(
            "No record created between {} and {}",
            start, end
        )));
    }
    Ok(ok(&records))
}

#[instrument(skip(store))]
pub async fn status(store: Arc<Store>) -> Result<Reply, warp::Rejection> {
    let stats = store.stats();
    Ok(ok(&StatusResponseBody {
        version: VERSION.to_string(),
        collections: stats.collections,
        record_count: stats.record_count,
        file_size_bytes: stats.file_size_bytes,
    }))
}
