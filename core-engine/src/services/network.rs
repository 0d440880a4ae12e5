//! Network resource service (§4.F: "Update Network while bound: CIDR
//! changes are forbidden").

use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::model::{Key, Meta, Network};
use crate::store::{Scope, SyncOp};

use super::Engine;

fn validate_cidr(cidr: &str) -> Result<()> {
    if cidr.is_empty() || !cidr.contains('/') {
        return Err(Error::validation("Network CIDR must be a non-empty string containing '/'"));
    }
    Ok(())
}

pub async fn create(engine: &Engine, key: Key, cidr: String, now: OffsetDateTime) -> Result<Network> {
    validate_cidr(&cidr)?;

    let network = Network {
        key,
        cidr,
        binding_ref: None,
        address_group_ref: None,
        meta: Meta::new(now),
    };

    let mut writer = engine.registry.writer().await?;
    writer.sync_network(vec![network.clone()], SyncOp::Upsert).await?;
    writer.commit().await?;
    Ok(network)
}

pub async fn get(engine: &Engine, key: &Key) -> Result<Network> {
    engine.registry.reader().await?.get_network(key).await
}

pub async fn list(engine: &Engine, scope: &Scope) -> Result<Vec<Network>> {
    engine.registry.reader().await?.list_networks(scope).await
}

/// CIDR changes are forbidden while the Network is bound (§4.F); any other
/// write goes through.
pub async fn update_cidr(engine: &Engine, key: &Key, cidr: String, now: OffsetDateTime) -> Result<Network> {
    validate_cidr(&cidr)?;

    let mut writer = engine.registry.writer().await?;
    let mut network = writer.get_network(key).await?;
    if network.is_bound() && network.cidr != cidr {
        return Err(Error::validation("CIDR cannot change while the Network is bound"));
    }

    network.cidr = cidr;
    network.meta.touch_spec(now);
    writer.sync_network(vec![network.clone()], SyncOp::Upsert).await?;
    writer.commit().await?;
    Ok(network)
}

/// Idempotent: deleting an already-absent Network succeeds.
pub async fn delete(engine: &Engine, key: &Key) -> Result<()> {
    let mut writer = engine.registry.writer().await?;
    match writer.get_network(key).await {
        Ok(network) => {
            if network.is_bound() {
                writer.abort().await?;
                return Err(Error::validation("cannot delete a Network while it is bound"));
            }
            writer.sync_network(vec![network], SyncOp::Delete).await?;
            writer.commit().await
        }
        Err(Error::NotFound(_)) => writer.abort().await,
        Err(err) => {
            writer.abort().await?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryRegistry;
    use crate::sync::coordinator::RetryPolicy;
    use std::sync::Arc;
    use std::time::Duration;

    fn engine() -> Engine {
        Engine::new(Arc::new(MemoryRegistry::new()), RetryPolicy::default(), Duration::from_secs(1))
    }

    fn now() -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH
    }

    #[tokio::test]
    async fn rejects_cidr_without_slash() {
        let engine = engine();
        let err = create(&engine, Key::new("default", "net-a"), "10.0.0.0".into(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn delete_of_missing_network_is_idempotent() {
        let engine = engine();
        delete(&engine, &Key::new("default", "nope")).await.unwrap();
    }

    #[tokio::test]
    async fn cidr_change_is_forbidden_while_bound() {
        let engine = engine();
        let key = Key::new("default", "net-a");
        create(&engine, key.clone(), "10.0.0.0/24".into(), now()).await.unwrap();

        {
            let mut writer = engine.registry.writer().await.unwrap();
            let mut network = writer.get_network(&key).await.unwrap();
            network.binding_ref = Some("binding".into());
            network.address_group_ref = Some("ag".into());
            writer.sync_network(vec![network], SyncOp::Upsert).await.unwrap();
            writer.commit().await.unwrap();
        }

        let err = update_cidr(&engine, &key, "10.0.1.0/24".into(), now()).await.unwrap_err();
        assert!(matches!(err, Error::ValidationFailed(_)));
    }
}
