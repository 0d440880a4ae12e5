//! Service, AddressGroupBinding, ServiceAlias (§3).

use serde::{Deserialize, Serialize};

use super::common::IngressPort;
use super::key::Key;
use super::meta::Meta;

/// `{ key, Description, IngressPorts, AddressGroups }`.
///
/// `address_groups` is intentionally absent here: per §3/§9 it is a *derived*
/// view, never stored on the Service itself. See `engine::resolver::ResolvedService`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub key: Key,
    pub description: String,
    pub ingress_ports: Vec<IngressPort>,
    pub meta: Meta,
}

impl Service {
    pub fn ports_for(&self, protocol: super::common::Protocol) -> Vec<String> {
        self.ingress_ports
            .iter()
            .filter(|p| p.protocol == protocol)
            .map(|p| p.port.clone())
            .collect()
    }
}

/// `{ key, ServiceRef, AddressGroupRef }` — an edge in the Service↔AddressGroup
/// bipartite graph (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressGroupBinding {
    pub key: Key,
    pub service_ref: Key,
    pub address_group_ref: Key,
    pub meta: Meta,
}

/// `{ key, ServiceRef }` — a named pointer to a Service (§3, §9 open question:
/// implemented as a required first-class resource; see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAlias {
    pub key: Key,
    pub service_ref: Key,
    pub meta: Meta,
}
