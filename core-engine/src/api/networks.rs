use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use time::OffsetDateTime;

use crate::error::Result;
use crate::model::Key;
use crate::services::{network, Engine};
use crate::store::Scope;

use super::dto::{CreateNetworkRequest, KeyPath, NetworkResponse, UpdateNetworkRequest};
use super::ListParams;

pub async fn create(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateNetworkRequest>,
) -> Result<Json<NetworkResponse>> {
    let created = network::create(&engine, Key::new(req.namespace, req.name), req.cidr, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(created.into()))
}

pub async fn get(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<Json<NetworkResponse>> {
    let found = network::get(&engine, &path.into_key()).await?;
    Ok(Json(found.into()))
}

pub async fn list(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<NetworkResponse>>> {
    let scope = params.into_scope();
    let found = network::list(&engine, &scope).await?;
    Ok(Json(found.into_iter().map(Into::into).collect()))
}

pub async fn update(
    State(engine): State<Arc<Engine>>,
    Path(path): Path<KeyPath>,
    Json(req): Json<UpdateNetworkRequest>,
) -> Result<Json<NetworkResponse>> {
    let updated = network::update_cidr(&engine, &path.into_key(), req.cidr, OffsetDateTime::now_utc()).await?;
    Ok(Json(updated.into()))
}

pub async fn delete(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<()> {
    network::delete(&engine, &path.into_key()).await
}
