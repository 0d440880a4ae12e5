use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::model::Key;
use crate::services::{network_binding, Engine};

use super::dto::{CreateNetworkBindingRequest, KeyPath, NetworkBindingResponse};
use super::ListParams;

pub async fn create(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateNetworkBindingRequest>,
) -> Result<Json<NetworkBindingResponse>> {
    let cancel = CancellationToken::new();
    let created = network_binding::create(
        &engine,
        Key::new(req.namespace, req.name),
        Key::new(req.network_namespace, req.network_name),
        Key::new(req.address_group_namespace, req.address_group_name),
        OffsetDateTime::now_utc(),
        &cancel,
    )
    .await?;
    Ok(Json(created.into()))
}

pub async fn get(
    State(engine): State<Arc<Engine>>,
    Path(path): Path<KeyPath>,
) -> Result<Json<NetworkBindingResponse>> {
    let found = network_binding::get(&engine, &path.into_key()).await?;
    Ok(Json(found.into()))
}

pub async fn list(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<NetworkBindingResponse>>> {
    let found = network_binding::list(&engine, &params.into_scope()).await?;
    Ok(Json(found.into_iter().map(Into::into).collect()))
}

pub async fn delete(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<()> {
    let cancel = CancellationToken::new();
    network_binding::delete(&engine, &path.into_key(), OffsetDateTime::now_utc(), &cancel).await
}
