use serde_json::{Map, Value};
use std::convert::Infallible;
use std::sync::Arc;
use warp::{
    filters::{body::BodyDeserializeError, BoxedFilter},
    http::StatusCode,
    path,
    reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType},
    reply::Response,
    Filter, Rejection, Reply,
};

use crate::http::api::MessageBody;
use crate::http::handlers::{self, Context, InternalError};
use crate::store::Store;

type Route = BoxedFilter<(Response,)>;

/// The whole API: `/status` plus the routes of every configured collection,
/// with rejections turned into JSON replies.
pub fn api(
    store: Arc<Store>,
    content_length_limit: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone + Send + Sync + 'static {
    let mut routes = status_route(Arc::clone(&store));
    for spec in store.collections() {
        let ctx = Context::new(Arc::clone(&store), spec.name.clone());
        routes = routes
            .or(collection_routes(ctx, content_length_limit))
            .unify()
            .boxed();
    }
    routes.recover(report_rejection)
}

fn status_route(store: Arc<Store>) -> Route {
    path!("status")
        .and(warp::get())
        .and(warp::any().map(move || Arc::clone(&store)))
        .and_then(handlers::status)
        .map(Reply::into_response)
        .boxed()
}

/// Routes for one collection `c`.
///
/// `GET /c`, `GET /c/:id`, `POST /c`, `PUT /c/:id`, `DELETE /c/:id` and
/// `GET /c/periodo/:start/:end`, plus the verb-named forms `listar`,
/// `registrar`, `atualizar` and `deletar`. Fixed segments are tried before
/// `/c/:id` so they never parse as an identity.
pub fn collection_routes(ctx: Context, content_length_limit: u64) -> Route {
    let name = ctx.collection.clone();
    let with_ctx = warp::any().map(move || ctx.clone());
    let base = warp::path(name);
    let body = move || {
        warp::body::content_length_limit(content_length_limit)
            .and(warp::body::json::<Map<String, Value>>())
    };

    let list = with_ctx
        .clone()
        .and(base.clone())
        .and(path::end())
        .and(warp::get())
        .and_then(handlers::list_records)
        .map(Reply::into_response);

    let list_alias = with_ctx
        .clone()
        .and(base.clone())
        .and(warp::path("listar"))
        .and(path::end())
        .and(warp::get())
        .and_then(handlers::list_records)
        .map(Reply::into_response);

    let get_alias = with_ctx
        .clone()
        .and(base.clone())
        .and(warp::path("listar"))
        .and(path::param::<String>())
        .and(path::end())
        .and(warp::get())
        .and_then(handlers::get_record)
        .map(Reply::into_response);

    let period = with_ctx
        .clone()
        .and(base.clone())
        .and(warp::path("periodo"))
        .and(path::param::<String>())
        .and(path::param::<String>())
        .and(path::end())
        .and(warp::get())
        .and_then(handlers::records_in_period)
        .map(Reply::into_response);

    let create = with_ctx
        .clone()
        .and(base.clone())
        .and(path::end())
        .and(warp::post())
        .and(body())
        .and_then(handlers::create_record)
        .map(Reply::into_response);

    let create_alias = with_ctx
        .clone()
        .and(base.clone())
        .and(warp::path("registrar"))
        .and(path::end())
        .and(warp::post())
        .and(body())
        .and_then(handlers::create_record)
        .map(Reply::into_response);

    let update_alias = with_ctx
        .clone()
        .and(base.clone())
        .and(warp::path("atualizar"))
        .and(path::param::<String>())
        .and(path::end())
        .and(warp::put())
        .and(body())
        .and_then(handlers::update_record)
        .map(Reply::into_response);

    let delete_alias = with_ctx
        .clone()
        .and(base.clone())
        .and(warp::path("deletar"))
        .and(path::param::<String>())
        .and(path::end())
        .and(warp::delete())
        .and_then(handlers::delete_record)
        .map(Reply::into_response);

    let get = with_ctx
        .clone()
        .and(base.clone())
        .and(path::param::<String>())
        .and(path::end())
        .and(warp::get())
        .and_then(handlers::get_record)
        .map(Reply::into_response);

    let update = with_ctx
        .clone()
        .and(base.clone())
        .and(path::param::<String>())
        .and(path::end())
        .and(warp::put())
        .and(body())
        .and_then(handlers::update_record)
        .map(Reply::into_response);

    let delete = with_ctx
        .and(base)
        .and(path::param::<String>())
        .and(path::end())
        .and(warp::delete())
        .and_then(handlers::delete_record)
        .map(Reply::into_response);

    list.or(list_alias)
        .unify()
        .or(get_alias)
        .unify()
        .or(period)
        .unify()
        .or(create)
        .unify()
        .or(create_alias)
        .unify()
        .or(update_alias)
        .unify()
        .or(delete_alias)
        .unify()
        .or(get)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

/// Turn rejections into JSON bodies with the matching status.
pub async fn report_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("no route"))
    } else if let Some(err) = rejection.find::<InternalError>() {
        tracing::error!("Internal error: {}", err.info);
        (StatusCode::INTERNAL_SERVER_ERROR, err.info.clone())
    } else if let Some(err) = rejection.find::<BodyDeserializeError>() {
        tracing::warn!("Invalid body {:?}", err);
        (StatusCode::BAD_REQUEST, err.to_string())
    } else if let Some(err) = rejection.find::<PayloadTooLarge>() {
        tracing::warn!("Payload too large {:?}", err);
        (StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
    } else if let Some(err) = rejection.find::<LengthRequired>() {
        (StatusCode::LENGTH_REQUIRED, err.to_string())
    } else if let Some(err) = rejection.find::<UnsupportedMediaType>() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, err.to_string())
    } else if let Some(err) = rejection.find::<MethodNotAllowed>() {
        (StatusCode::METHOD_NOT_ALLOWED, err.to_string())
    } else {
        tracing::warn!("Unhandled rejection {:?}", rejection);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("INTERNAL_SERVER_ERROR"),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&MessageBody::new(message)),
        status,
    ))
}
