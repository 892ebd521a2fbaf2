//! HTTP handlers for the callback listener

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;

use crate::registry::{ActiveStream, RegistrySnapshot, SnapshotStore, StreamRecord};
use crate::server::callbacks::{CallbackError, CallbackParams, NotificationListener};
use crate::stats::RegistryStats;

type Listener<S> = State<Arc<NotificationListener<S>>>;

/// Read callback fields from the form body, falling back to the query string
fn callback_params(query: CallbackParams, body: &Bytes) -> CallbackParams {
    if body.is_empty() {
        return query;
    }

    match serde_urlencoded::from_bytes::<CallbackParams>(body) {
        Ok(form) if form.credential().is_some() => form,
        Ok(_) => query,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable callback body, using query string");
            query
        }
    }
}

/// `POST /api/stream/start`
pub async fn on_publish<S: SnapshotStore>(
    State(listener): Listener<S>,
    Query(query): Query<CallbackParams>,
    body: Bytes,
) -> Result<&'static str, CallbackError> {
    let params = callback_params(query, &body);
    tracing::debug!(
        name = ?params.credential(),
        app = ?params.app,
        addr = ?params.addr,
        "Publish start callback"
    );

    listener.on_start(params.credential()).await?;
    Ok("OK")
}

/// `POST /api/stream/stop`
pub async fn on_publish_done<S: SnapshotStore>(
    State(listener): Listener<S>,
    Query(query): Query<CallbackParams>,
    body: Bytes,
) -> Result<&'static str, CallbackError> {
    let params = callback_params(query, &body);
    tracing::debug!(
        name = ?params.credential(),
        app = ?params.app,
        addr = ?params.addr,
        "Publish stop callback"
    );

    listener.on_stop(params.credential()).await?;
    Ok("OK")
}

/// `GET /api/streams`
pub async fn list_streams<S: SnapshotStore>(
    State(listener): Listener<S>,
) -> Result<Json<RegistrySnapshot>, CallbackError> {
    Ok(Json(listener.list_all().await?))
}

/// `GET /api/streams/active`
pub async fn list_active<S: SnapshotStore>(
    State(listener): Listener<S>,
) -> Result<Json<Vec<ActiveStream>>, CallbackError> {
    Ok(Json(listener.registry().active().await?))
}

/// `GET /api/streams/by-key/{key}`
pub async fn show_stream<S: SnapshotStore>(
    State(listener): Listener<S>,
    Path(key): Path<String>,
) -> Result<Json<StreamRecord>, CallbackError> {
    Ok(Json(listener.lookup(&key).await?))
}

/// `GET /api/stats`
pub async fn stats<S: SnapshotStore>(
    State(listener): Listener<S>,
) -> Result<Json<RegistryStats>, CallbackError> {
    Ok(Json(listener.registry().stats().await?))
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
