//! The AddressGroup Resolver (§4.A). Turns a Service identity into its
//! effective AddressGroup membership by scanning AddressGroupBindings.
//! Never persisted — `ResolvedService` is a read-time view (§9: "Derived
//! AddressGroups on Service").

use crate::error::Result;
use crate::model::{Key, Service};
use crate::store::{Reader, Scope};

#[derive(Debug, Clone)]
pub struct ResolvedService {
    pub service: Service,
    pub address_groups: Vec<Key>,
}

/// Must be called against the same reader session as the rule generation
/// that consumes its result, to avoid read-skew (§4.A).
pub async fn resolve_service(reader: &dyn Reader, service_key: &Key) -> Result<ResolvedService> {
    let service = reader.get_service(service_key).await?;

    let bindings = reader.list_address_group_bindings(&Scope::Empty).await?;
    let mut address_groups: Vec<Key> = bindings
        .into_iter()
        .filter(|binding| &binding.service_ref == service_key)
        .map(|binding| binding.address_group_ref)
        .collect();
    address_groups.sort();
    address_groups.dedup();

    Ok(ResolvedService { service, address_groups })
}
