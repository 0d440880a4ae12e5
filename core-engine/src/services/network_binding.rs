//! NetworkBinding resource service (§4.F: "Create NetworkBinding").
//!
//! Creation runs validation and the binding row write inside one writer
//! session, commits, then — outside that transaction — marks the Network
//! bound, splices a NetworkItem into the AddressGroup, and force-syncs the
//! updated AddressGroup to SGROUP (bypassing debouncing, since the engine
//! has no other signal that Networks changed).

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::model::{Key, Meta, NetworkBinding, NetworkItem};
use crate::store::{Scope, SyncOp};

use super::Engine;

pub async fn create(
    engine: &Engine,
    key: Key,
    network_ref: Key,
    address_group_ref: Key,
    now: OffsetDateTime,
    cancel: &CancellationToken,
) -> Result<NetworkBinding> {
    let binding = NetworkBinding {
        key: key.clone(),
        network_ref: network_ref.clone(),
        address_group_ref: address_group_ref.clone(),
        meta: Meta::new(now),
    };

    {
        let mut writer = engine.registry.writer().await?;

        let network = match writer.get_network(&network_ref).await {
            Ok(network) => network,
            Err(_) => {
                writer.abort().await?;
                return Err(Error::validation(format!("Network {network_ref} does not exist")));
            }
        };
        if let Some(existing) = &network.binding_ref {
            if existing != &key.as_string() {
                writer.abort().await?;
                return Err(Error::conflict(format!(
                    "Network {network_ref} is already bound by {existing}"
                )));
            }
        }

        if writer.get_address_group(&address_group_ref).await.is_err() {
            writer.abort().await?;
            return Err(Error::validation(format!("AddressGroup {address_group_ref} does not exist")));
        }

        if writer.get_network_binding(&key).await.is_ok() {
            writer.abort().await?;
            return Err(Error::conflict(format!("NetworkBinding {key} already exists")));
        }

        writer.sync_network_binding(vec![binding.clone()], SyncOp::Upsert).await?;
        writer.commit().await?;
    }

    {
        let mut writer = engine.registry.writer().await?;

        let mut network = writer.get_network(&network_ref).await?;
        network.binding_ref = Some(key.as_string());
        network.address_group_ref = Some(address_group_ref.as_string());
        network.meta.touch_status(now);
        let cidr = network.cidr.clone();
        writer.sync_network(vec![network], SyncOp::Upsert).await?;

        let mut group = writer.get_address_group(&address_group_ref).await?;
        group.splice_in(NetworkItem::for_network(&network_ref, cidr));
        group.meta.touch_status(now);
        writer.sync_address_group(vec![group], SyncOp::Upsert).await?;

        writer.commit().await?;
    }

    if let Ok(group) = engine.registry.reader().await?.get_address_group(&address_group_ref).await {
        engine.address_group_sync.sync_forced(&group, SyncOp::Upsert, cancel).await?;
    }

    Ok(binding)
}

pub async fn get(engine: &Engine, key: &Key) -> Result<NetworkBinding> {
    engine.registry.reader().await?.get_network_binding(key).await
}

pub async fn list(engine: &Engine, scope: &Scope) -> Result<Vec<NetworkBinding>> {
    engine.registry.reader().await?.list_network_bindings(scope).await
}

/// Idempotent: deleting an already-absent binding succeeds (§4.F).
pub async fn delete(engine: &Engine, key: &Key, now: OffsetDateTime, cancel: &CancellationToken) -> Result<()> {
    let binding = {
        let mut writer = engine.registry.writer().await?;
        let binding = match writer.get_network_binding(key).await {
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
        writer.sync_network_binding(vec![binding.clone()], SyncOp::Delete).await?;
        writer.commit().await?;
        binding
    };

    {
        let mut writer = engine.registry.writer().await?;
        if let Ok(mut network) = writer.get_network(&binding.network_ref).await {
            network.binding_ref = None;
            network.address_group_ref = None;
            network.meta.touch_status(now);
            writer.sync_network(vec![network], SyncOp::Upsert).await?;
        }
        if let Ok(mut group) = writer.get_address_group(&binding.address_group_ref).await {
            group.remove(&binding.network_ref.as_string());
            group.meta.touch_status(now);
            writer.sync_address_group(vec![group], SyncOp::Upsert).await?;
        }
        writer.commit().await?;
    }

    if let Ok(group) = engine.registry.reader().await?.get_address_group(&binding.address_group_ref).await {
        engine.address_group_sync.sync_forced(&group, SyncOp::Upsert, cancel).await?;
    }

    Ok(())
}
