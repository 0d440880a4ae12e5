use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::model::Key;
use crate::services::{address_group_binding, Engine};

use super::dto::{AddressGroupBindingResponse, CreateAddressGroupBindingRequest, KeyPath};
use super::ListParams;

pub async fn create(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateAddressGroupBindingRequest>,
) -> Result<Json<AddressGroupBindingResponse>> {
    let cancel = CancellationToken::new();
    let created = address_group_binding::create(
        &engine,
        Key::new(req.namespace, req.name),
        Key::new(req.service_namespace, req.service_name),
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
) -> Result<Json<AddressGroupBindingResponse>> {
    let found = address_group_binding::get(&engine, &path.into_key()).await?;
    Ok(Json(found.into()))
}

pub async fn list(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<AddressGroupBindingResponse>>> {
    let found = address_group_binding::list(&engine, &params.into_scope()).await?;
    Ok(Json(found.into_iter().map(Into::into).collect()))
}

pub async fn delete(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<()> {
    let cancel = CancellationToken::new();
    address_group_binding::delete(&engine, &path.into_key(), OffsetDateTime::now_utc(), &cancel).await
}
