//! Service resource service (§4.F: "Update Service: if IngressPorts or
//! AddressGroup set changed, trigger D on the Service").

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::engine::recompute::{recompute, ChangeEvent};
use crate::error::{Error, Result};
use crate::model::{IngressPort, Key, Meta, Service};
use crate::store::{Scope, SyncOp};

use super::Engine;

fn validate_ports(ports: &[IngressPort]) -> Result<()> {
    for port in ports {
        if port.port.is_empty() {
            return Err(Error::validation("IngressPort.Port must be a non-empty string"));
        }
    }
    Ok(())
}

pub async fn create(
    engine: &Engine,
    key: Key,
    description: String,
    ingress_ports: Vec<IngressPort>,
    now: OffsetDateTime,
) -> Result<Service> {
    validate_ports(&ingress_ports)?;

    let service = Service { key, description, ingress_ports, meta: Meta::new(now) };

    let mut writer = engine.registry.writer().await?;
    writer.sync_service(vec![service.clone()], SyncOp::Upsert).await?;
    writer.commit().await?;
    Ok(service)
}

pub async fn get(engine: &Engine, key: &Key) -> Result<Service> {
    engine.registry.reader().await?.get_service(key).await
}

pub async fn list(engine: &Engine, scope: &Scope) -> Result<Vec<Service>> {
    engine.registry.reader().await?.list_services(scope).await
}

pub async fn update(
    engine: &Engine,
    key: &Key,
    description: String,
    ingress_ports: Vec<IngressPort>,
    now: OffsetDateTime,
    cancel: &CancellationToken,
) -> Result<Service> {
    validate_ports(&ingress_ports)?;

    let (service, ports_changed) = {
        let mut writer = engine.registry.writer().await?;
        let mut service = writer.get_service(key).await?;
        let ports_changed = service.ingress_ports != ingress_ports;
        service.description = description;
        service.ingress_ports = ingress_ports;
        service.meta.touch_spec(now);
        writer.sync_service(vec![service.clone()], SyncOp::Upsert).await?;
        writer.commit().await?;
        (service, ports_changed)
    };

    if ports_changed {
        recompute(
            engine.registry.as_ref(),
            &engine.locks,
            &engine.ieagag_sync,
            &engine.address_group_sync,
            ChangeEvent::ServiceChanged(key.clone()),
            now,
            cancel,
        )
        .await?;
    }

    Ok(service)
}

/// Idempotent. Refused while an AddressGroupBinding or RuleS2S still
/// references this Service, to avoid leaving a dangling foreign key.
pub async fn delete(engine: &Engine, key: &Key) -> Result<()> {
    let mut writer = engine.registry.writer().await?;
    let service = match writer.get_service(key).await {
        Ok(service) => service,
        Err(Error::NotFound(_)) => return writer.abort().await,
        Err(err) => {
            writer.abort().await?;
            return Err(err);
        }
    };

    let bound = writer
        .list_address_group_bindings(&Scope::Empty)
        .await?
        .into_iter()
        .any(|b| &b.service_ref == key);
    let referenced = writer
        .list_rule_s2s(&Scope::Empty)
        .await?
        .into_iter()
        .any(|r| &r.service_local_ref == key || &r.service_ref == key);
    if bound || referenced {
        writer.abort().await?;
        return Err(Error::validation(format!(
            "Service {key} is still referenced by an AddressGroupBinding or RuleS2S"
        )));
    }

    writer.sync_service(vec![service], SyncOp::Delete).await?;
    writer.commit().await
}
