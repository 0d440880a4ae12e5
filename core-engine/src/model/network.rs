//! Network and NetworkBinding (§3).

use serde::{Deserialize, Serialize};

use super::key::Key;
use super::meta::Meta;

/// `{ key, CIDR, IsBound, BindingRef, AddressGroupRef }`.
///
/// Invariant: `is_bound` iff both `binding_ref` and `address_group_ref` are
/// set; at most one active NetworkBinding may point at a given Network (the
/// resource service in `services::network_binding` is the sole writer of
/// `binding_ref` and enforces this).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub key: Key,
    pub cidr: String,
    pub binding_ref: Option<String>,
    pub address_group_ref: Option<String>,
    pub meta: Meta,
}

impl Network {
    pub fn is_bound(&self) -> bool {
        self.binding_ref.is_some() && self.address_group_ref.is_some()
    }
}

/// `{ key, NetworkRef, AddressGroupRef }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkBinding {
    pub key: Key,
    pub network_ref: Key,
    pub address_group_ref: Key,
    pub meta: Meta,
}
