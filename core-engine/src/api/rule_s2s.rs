use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::model::Key;
use crate::services::{rule_s2s, Engine};

use super::dto::{parse_traffic, CreateRuleS2SRequest, KeyPath, RuleS2SResponse};
use super::ListParams;

pub async fn create(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<CreateRuleS2SRequest>,
) -> Result<Json<RuleS2SResponse>> {
    let traffic = parse_traffic(&req.traffic).map_err(Error::validation)?;
    let cancel = CancellationToken::new();
    let created = rule_s2s::create(
        &engine,
        Key::new(req.namespace, req.name),
        traffic,
        Key::new(req.service_local_namespace, req.service_local_name),
        Key::new(req.service_namespace, req.service_name),
        req.trace,
        OffsetDateTime::now_utc(),
        &cancel,
    )
    .await?;
    Ok(Json(created.into()))
}

pub async fn get(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<Json<RuleS2SResponse>> {
    let found = rule_s2s::get(&engine, &path.into_key()).await?;
    Ok(Json(found.into()))
}

pub async fn list(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<RuleS2SResponse>>> {
    let found = rule_s2s::list(&engine, &params.into_scope()).await?;
    Ok(Json(found.into_iter().map(Into::into).collect()))
}

pub async fn delete(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<()> {
    let cancel = CancellationToken::new();
    rule_s2s::delete(&engine, &path.into_key(), OffsetDateTime::now_utc(), &cancel).await
}
