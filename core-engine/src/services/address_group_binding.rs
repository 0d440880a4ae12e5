//! AddressGroupBinding resource service: the edge the resolver (§4.A) walks
//! to derive a Service's effective AddressGroup membership. Adding or
//! removing one is treated as a Service change for recomputation (§4.D).

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::engine::recompute::{recompute, ChangeEvent};
use crate::error::{Error, Result};
use crate::model::{AddressGroupBinding, Key, Meta};
use crate::store::{Scope, SyncOp};

use super::Engine;

pub async fn create(
    engine: &Engine,
    key: Key,
    service_ref: Key,
    address_group_ref: Key,
    now: OffsetDateTime,
    cancel: &CancellationToken,
) -> Result<AddressGroupBinding> {
    let binding = AddressGroupBinding {
        key: key.clone(),
        service_ref: service_ref.clone(),
        address_group_ref: address_group_ref.clone(),
        meta: Meta::new(now),
    };

    {
        let mut writer = engine.registry.writer().await?;
        if writer.get_service(&service_ref).await.is_err() {
            writer.abort().await?;
            return Err(Error::validation(format!("Service {service_ref} does not exist")));
        }
        if writer.get_address_group(&address_group_ref).await.is_err() {
            writer.abort().await?;
            return Err(Error::validation(format!("AddressGroup {address_group_ref} does not exist")));
        }
        if writer.get_address_group_binding(&key).await.is_ok() {
            writer.abort().await?;
            return Err(Error::conflict(format!("AddressGroupBinding {key} already exists")));
        }
        writer.sync_address_group_binding(vec![binding.clone()], SyncOp::Upsert).await?;
        writer.commit().await?;
    }

    recompute(
        engine.registry.as_ref(),
        &engine.locks,
        &engine.ieagag_sync,
        &engine.address_group_sync,
        ChangeEvent::AddressGroupBindingChanged(service_ref),
        now,
        cancel,
    )
    .await?;

    Ok(binding)
}

pub async fn get(engine: &Engine, key: &Key) -> Result<AddressGroupBinding> {
    engine.registry.reader().await?.get_address_group_binding(key).await
}

pub async fn list(engine: &Engine, scope: &Scope) -> Result<Vec<AddressGroupBinding>> {
    engine.registry.reader().await?.list_address_group_bindings(scope).await
}

/// Idempotent: deleting an already-absent binding succeeds.
pub async fn delete(engine: &Engine, key: &Key, now: OffsetDateTime, cancel: &CancellationToken) -> Result<()> {
    let service_ref = {
        let mut writer = engine.registry.writer().await?;
        let binding = match writer.get_address_group_binding(key).await {
            Ok(binding) => binding,
            Err(Error::NotFound(_)) => {
                writer.abort().await?;
                return Ok(());
            }
            Err(err) => {
                writer.abort().await?;
                return Err(err);
            }
        };
        writer.sync_address_group_binding(vec![binding.clone()], SyncOp::Delete).await?;
        writer.commit().await?;
        binding.service_ref
    };

    recompute(
        engine.registry.as_ref(),
        &engine.locks,
        &engine.ieagag_sync,
        &engine.address_group_sync,
        ChangeEvent::AddressGroupBindingChanged(service_ref),
        now,
        cancel,
    )
    .await?;

    Ok(())
}
