use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use time::OffsetDateTime;

use crate::error::Result;
use crate::model::Key;
use crate::services::{service_alias, Engine};

use super::dto::{CreateServiceAliasRequest, KeyPath, ServiceAliasResponse};
use super::ListParams;

pub async fn create(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateServiceAliasRequest>,
) -> Result<Json<ServiceAliasResponse>> {
    let created = service_alias::create(
        &engine,
        Key::new(req.namespace, req.name),
        Key::new(req.service_namespace, req.service_name),
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(created.into()))
}

pub async fn get(
    State(engine): State<Arc<Engine>>,
    Path(path): Path<KeyPath>,
) -> Result<Json<ServiceAliasResponse>> {
    let found = service_alias::get(&engine, &path.into_key()).await?;
    Ok(Json(found.into()))
}

pub async fn list(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ServiceAliasResponse>>> {
    let found = service_alias::list(&engine, &params.into_scope()).await?;
    Ok(Json(found.into_iter().map(Into::into).collect()))
}

pub async fn delete(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<()> {
    service_alias::delete(&engine, &path.into_key()).await
}
