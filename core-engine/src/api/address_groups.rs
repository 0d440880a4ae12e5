use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use time::OffsetDateTime;

use crate::error::Result;
use crate::model::Key;
use crate::services::{address_group, Engine};

use super::dto::{AddressGroupResponse, CreateAddressGroupRequest, KeyPath};
use super::ListParams;

pub async fn create(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateAddressGroupRequest>,
) -> Result<Json<AddressGroupResponse>> {
    let created = address_group::create(&engine, Key::new(req.namespace, req.name), OffsetDateTime::now_utc()).await?;
    Ok(Json(created.into()))
}

pub async fn get(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<Json<AddressGroupResponse>> {
    let found = address_group::get(&engine, &path.into_key()).await?;
    Ok(Json(found.into()))
}

pub async fn list(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<AddressGroupResponse>>> {
    let found = address_group::list(&engine, &params.into_scope()).await?;
    Ok(Json(found.into_iter().map(Into::into).collect()))
}

pub async fn delete(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<()> {
    address_group::delete(&engine, &path.into_key()).await
}
