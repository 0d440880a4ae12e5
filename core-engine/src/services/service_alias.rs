//! ServiceAlias resource service (§3, §9): a named pointer to a Service.
//! Resolved away by `rule_s2s::resolve_to_service` before the engine ever
//! sees a RuleS2S's references — 4.B/4.C operate only on Service keys.

use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::model::{Key, Meta, ServiceAlias};
use crate::store::{Scope, SyncOp};

use super::Engine;

pub async fn create(engine: &Engine, key: Key, service_ref: Key, now: OffsetDateTime) -> Result<ServiceAlias> {
    let mut writer = engine.registry.writer().await?;
    if writer.get_service(&service_ref).await.is_err() {
        writer.abort().await?;
        return Err(Error::validation(format!("Service {service_ref} does not exist")));
    }

    let alias = ServiceAlias { key, service_ref, meta: Meta::new(now) };
    writer.sync_service_alias(vec![alias.clone()], SyncOp::Upsert).await?;
    writer.commit().await?;
    Ok(alias)
}

pub async fn get(engine: &Engine, key: &Key) -> Result<ServiceAlias> {
    engine.registry.reader().await?.get_service_alias(key).await
}

pub async fn list(engine: &Engine, scope: &Scope) -> Result<Vec<ServiceAlias>> {
    engine.registry.reader().await?.list_service_aliases(scope).await
}

/// Idempotent: deleting an already-absent alias succeeds.
pub async fn delete(engine: &Engine, key: &Key) -> Result<()> {
    let mut writer = engine.registry.writer().await?;
    match writer.get_service_alias(key).await {
        Ok(alias) => {
            writer.sync_service_alias(vec![alias], SyncOp::Delete).await?;
            writer.commit().await
        }
        Err(Error::NotFound(_)) => writer.abort().await,
        Err(err) => {
            writer.abort().await?;
            Err(err)
        }
    }
}
