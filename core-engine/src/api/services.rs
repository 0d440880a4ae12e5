use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::model::Key;
use crate::services::{service, Engine};

use super::dto::{CreateServiceRequest, KeyPath, ServiceResponse, UpdateServiceRequest};
use super::ListParams;

fn into_ports(ports: Vec<super::dto::PortDto>) -> Result<Vec<crate::model::IngressPort>> {
    ports
        .into_iter()
        .map(|p| p.into_ingress_port().map_err(Error::validation))
        .collect()
}

pub async fn create(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateServiceRequest>,
) -> Result<Json<ServiceResponse>> {
    let ports = into_ports(req.ingress_ports)?;
    let created = service::create(
        &engine,
        Key::new(req.namespace, req.name),
        req.description,
        ports,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(created.into()))
}

pub async fn get(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<Json<ServiceResponse>> {
    let found = service::get(&engine, &path.into_key()).await?;
    Ok(Json(found.into()))
}

pub async fn list(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ServiceResponse>>> {
    let found = service::list(&engine, &params.into_scope()).await?;
    Ok(Json(found.into_iter().map(Into::into).collect()))
}

pub async fn update(
    State(engine): State<Arc<Engine>>,
    Path(path): Path<KeyPath>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<Json<ServiceResponse>> {
    let ports = into_ports(req.ingress_ports)?;
    let cancel = CancellationToken::new();
    let updated =
        service::update(&engine, &path.into_key(), req.description, ports, OffsetDateTime::now_utc(), &cancel)
            .await?;
    Ok(Json(updated.into()))
}

pub async fn delete(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<()> {
    service::delete(&engine, &path.into_key()).await
}
