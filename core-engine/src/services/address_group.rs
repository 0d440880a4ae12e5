//! AddressGroup resource service. Creation/deletion are plain CRUD; its
//! `networks` field is mutated only as a side effect of NetworkBinding
//! lifecycle (§4.F, `services::network_binding`).

use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::model::{AddressGroup, Key, Meta};
use crate::store::{Scope, SyncOp};

use super::Engine;

pub async fn create(engine: &Engine, key: Key, now: OffsetDateTime) -> Result<AddressGroup> {
    let group = AddressGroup { key, networks: Vec::new(), meta: Meta::new(now) };

    let mut writer = engine.registry.writer().await?;
    writer.sync_address_group(vec![group.clone()], SyncOp::Upsert).await?;
    writer.commit().await?;
    Ok(group)
}

pub async fn get(engine: &Engine, key: &Key) -> Result<AddressGroup> {
    engine.registry.reader().await?.get_address_group(key).await
}

pub async fn list(engine: &Engine, scope: &Scope) -> Result<Vec<AddressGroup>> {
    engine.registry.reader().await?.list_address_groups(scope).await
}

/// Idempotent: deleting an already-absent AddressGroup succeeds. Deleting
/// one with live Networks spliced in is refused — the caller must remove
/// the NetworkBindings first, which reverses the splice (§3, §4.F).
pub async fn delete(engine: &Engine, key: &Key) -> Result<()> {
    let mut writer = engine.registry.writer().await?;
    match writer.get_address_group(key).await {
        Ok(group) => {
            if !group.networks.is_empty() {
                writer.abort().await?;
                return Err(Error::validation(
                    "cannot delete an AddressGroup with Networks still bound to it",
                ));
            }
            writer.sync_address_group(vec![group], SyncOp::Delete).await?;
            writer.commit().await
        }
        Err(Error::NotFound(_)) => writer.abort().await,
        Err(err) => {
            writer.abort().await?;
            Err(err)
        }
    }
}
