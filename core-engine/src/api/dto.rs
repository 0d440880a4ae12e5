//! Request/response JSON shapes (§6: ambient transport surface). Kept
//! distinct from the internal `model::*` types so the wire format can
//! diverge from storage representation.

use serde::{Deserialize, Serialize};

use crate::model::{
    AddressGroup, AddressGroupBinding, IeAgAgRule, IngressPort, Key, Network, NetworkBinding, Protocol,
    RuleS2S, Service, ServiceAlias, Traffic,
};

#[derive(Debug, Deserialize)]
pub struct KeyPath {
    pub namespace: String,
    pub name: String,
}

impl KeyPath {
    pub fn into_key(self) -> Key {
        Key::new(self.namespace, self.name)
    }
}

#[derive(Debug, Serialize)]
pub struct ConditionDto {
    pub kind: String,
    pub status: bool,
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MetaDto {
    pub generation: u64,
    pub resource_version: u64,
    pub conditions: Vec<ConditionDto>,
}

impl From<&crate::model::Meta> for MetaDto {
    fn from(meta: &crate::model::Meta) -> Self {
        Self {
            generation: meta.generation,
            resource_version: meta.resource_version,
            conditions: meta
                .conditions
                .iter()
                .map(|c| ConditionDto {
                    kind: format!("{:?}", c.kind),
                    status: c.status,
                    reason: c.reason.clone(),
                    message: c.message.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNetworkRequest {
    pub namespace: String,
    pub name: String,
    pub cidr: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNetworkRequest {
    pub cidr: String,
}

#[derive(Debug, Serialize)]
pub struct NetworkResponse {
    pub namespace: String,
    pub name: String,
    pub cidr: String,
    pub is_bound: bool,
    pub meta: MetaDto,
}

impl From<Network> for NetworkResponse {
    fn from(n: Network) -> Self {
        Self {
            namespace: n.key.namespace.clone(),
            name: n.key.name.clone(),
            is_bound: n.is_bound(),
            cidr: n.cidr,
            meta: MetaDto::from(&n.meta),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAddressGroupRequest {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct NetworkItemDto {
    pub name: String,
    pub cidr: String,
}

#[derive(Debug, Serialize)]
pub struct AddressGroupResponse {
    pub namespace: String,
    pub name: String,
    pub networks: Vec<NetworkItemDto>,
    pub meta: MetaDto,
}

impl From<AddressGroup> for AddressGroupResponse {
    fn from(g: AddressGroup) -> Self {
        Self {
            namespace: g.key.namespace.clone(),
            name: g.key.name.clone(),
            networks: g
                .networks
                .iter()
                .map(|n| NetworkItemDto { name: n.name.clone(), cidr: n.cidr.clone() })
                .collect(),
            meta: MetaDto::from(&g.meta),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNetworkBindingRequest {
    pub namespace: String,
    pub name: String,
    pub network_namespace: String,
    pub network_name: String,
    pub address_group_namespace: String,
    pub address_group_name: String,
}

#[derive(Debug, Serialize)]
pub struct NetworkBindingResponse {
    pub namespace: String,
    pub name: String,
    pub network_ref: String,
    pub address_group_ref: String,
    pub meta: MetaDto,
}

impl From<NetworkBinding> for NetworkBindingResponse {
    fn from(b: NetworkBinding) -> Self {
        Self {
            namespace: b.key.namespace.clone(),
            name: b.key.name.clone(),
            network_ref: b.network_ref.as_string(),
            address_group_ref: b.address_group_ref.as_string(),
            meta: MetaDto::from(&b.meta),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PortDto {
    pub port: String,
    pub protocol: String,
}

impl PortDto {
    pub fn into_ingress_port(self) -> Result<IngressPort, String> {
        Ok(IngressPort { port: self.port, protocol: parse_protocol(&self.protocol)? })
    }
}

fn parse_protocol(s: &str) -> Result<Protocol, String> {
    match s.to_ascii_lowercase().as_str() {
        "tcp" => Ok(Protocol::Tcp),
        "udp" => Ok(Protocol::Udp),
        other => Err(format!("unknown protocol {other}")),
    }
}

pub fn parse_traffic(s: &str) -> Result<Traffic, String> {
    match s.to_ascii_lowercase().as_str() {
        "ingress" => Ok(Traffic::Ingress),
        "egress" => Ok(Traffic::Egress),
        other => Err(format!("unknown traffic direction {other}")),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub ingress_ports: Vec<PortDto>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    #[serde(default)]
    pub description: String,
    pub ingress_ports: Vec<PortDto>,
}

#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub namespace: String,
    pub name: String,
    pub description: String,
    pub ingress_ports: Vec<PortDto>,
    pub meta: MetaDto,
}

impl From<Service> for ServiceResponse {
    fn from(s: Service) -> Self {
        Self {
            namespace: s.key.namespace.clone(),
            name: s.key.name.clone(),
            description: s.description,
            ingress_ports: s
                .ingress_ports
                .iter()
                .map(|p| PortDto { port: p.port.clone(), protocol: p.protocol.as_lower().to_string() })
                .collect(),
            meta: MetaDto::from(&s.meta),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAddressGroupBindingRequest {
    pub namespace: String,
    pub name: String,
    pub service_namespace: String,
    pub service_name: String,
    pub address_group_namespace: String,
    pub address_group_name: String,
}

#[derive(Debug, Serialize)]
pub struct AddressGroupBindingResponse {
    pub namespace: String,
    pub name: String,
    pub service_ref: String,
    pub address_group_ref: String,
    pub meta: MetaDto,
}

impl From<AddressGroupBinding> for AddressGroupBindingResponse {
    fn from(b: AddressGroupBinding) -> Self {
        Self {
            namespace: b.key.namespace.clone(),
            name: b.key.name.clone(),
            service_ref: b.service_ref.as_string(),
            address_group_ref: b.address_group_ref.as_string(),
            meta: MetaDto::from(&b.meta),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceAliasRequest {
    pub namespace: String,
    pub name: String,
    pub service_namespace: String,
    pub service_name: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceAliasResponse {
    pub namespace: String,
    pub name: String,
    pub service_ref: String,
    pub meta: MetaDto,
}

impl From<ServiceAlias> for ServiceAliasResponse {
    fn from(a: ServiceAlias) -> Self {
        Self {
            namespace: a.key.namespace.clone(),
            name: a.key.name.clone(),
            service_ref: a.service_ref.as_string(),
            meta: MetaDto::from(&a.meta),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRuleS2SRequest {
    pub namespace: String,
    pub name: String,
    pub traffic: String,
    pub service_local_namespace: String,
    pub service_local_name: String,
    pub service_namespace: String,
    pub service_name: String,
    #[serde(default)]
    pub trace: bool,
}

#[derive(Debug, Serialize)]
pub struct RuleS2SResponse {
    pub namespace: String,
    pub name: String,
    pub traffic: String,
    pub service_local_ref: String,
    pub service_ref: String,
    pub trace: bool,
    pub ie_ag_ag_rule_refs: Vec<String>,
    pub meta: MetaDto,
}

impl From<RuleS2S> for RuleS2SResponse {
    fn from(r: RuleS2S) -> Self {
        Self {
            namespace: r.key.namespace.clone(),
            name: r.key.name.clone(),
            traffic: r.traffic.as_lower().to_string(),
            service_local_ref: r.service_local_ref.as_string(),
            service_ref: r.service_ref.as_string(),
            trace: r.trace,
            ie_ag_ag_rule_refs: r.ie_ag_ag_rule_refs.iter().map(Key::as_string).collect(),
            meta: MetaDto::from(&r.meta),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IeAgAgRuleResponse {
    pub namespace: String,
    pub name: String,
    pub traffic: String,
    pub transport: String,
    pub address_group_local: String,
    pub address_group: String,
    pub ports: Vec<String>,
    pub logs: bool,
    pub trace: bool,
    pub priority: i32,
    pub meta: MetaDto,
}

impl From<IeAgAgRule> for IeAgAgRuleResponse {
    fn from(r: IeAgAgRule) -> Self {
        Self {
            namespace: r.key.namespace.clone(),
            name: r.key.name.clone(),
            traffic: r.traffic.as_lower().to_string(),
            transport: r.transport.as_lower().to_string(),
            address_group_local: r.address_group_local.as_string(),
            address_group: r.address_group.as_string(),
            ports: r.ports.iter().map(|p| p.destination.clone()).collect(),
            logs: r.logs,
            trace: r.trace,
            priority: r.priority,
            meta: MetaDto::from(&r.meta),
        }
    }
}
