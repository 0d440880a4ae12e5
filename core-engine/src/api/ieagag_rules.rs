//! Read-only surface over IEAgAgRule (§3: engine-owned, no external mutation).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::error::Result;
use crate::services::{ieagag_rule, Engine};

use super::dto::{IeAgAgRuleResponse, KeyPath};
use super::ListParams;

pub async fn get(State(engine): State<Arc<Engine>>, Path(path): Path<KeyPath>) -> Result<Json<IeAgAgRuleResponse>> {
    let found = ieagag_rule::get(&engine, &path.into_key()).await?;
    Ok(Json(found.into()))
}

pub async fn list(
    State(engine): State<Arc<Engine>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<IeAgAgRuleResponse>>> {
    let found = ieagag_rule::list(&engine, &params.into_scope()).await?;
    Ok(Json(found.into_iter().map(Into::into).collect()))
}
