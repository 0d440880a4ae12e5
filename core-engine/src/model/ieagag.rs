//! IEAgAgRule (§3) — the materialised, enforcement-plane rule. Owned
//! exclusively by the engine; no external mutation is legal.

use serde::{Deserialize, Serialize};

use super::common::{PortSpec, Protocol, Traffic};
use super::key::Key;
use super::meta::Meta;

pub const DEFAULT_PRIORITY: i32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IeAgAgRule {
    pub key: Key,
    pub traffic: Traffic,
    pub transport: Protocol,
    pub address_group_local: Key,
    pub address_group: Key,
    pub ports: Vec<PortSpec>,
    pub action: Action,
    pub logs: bool,
    pub trace: bool,
    pub priority: i32,
    pub meta: Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Accept,
}

impl IeAgAgRule {
    /// The `(Traffic, localAG, targetAG, Protocol)` aggregation key this rule
    /// materialises (§4.C).
    pub fn aggregation_key(&self) -> (Traffic, Key, Key, Protocol) {
        (
            self.traffic,
            self.address_group_local.clone(),
            self.address_group.clone(),
            self.transport,
        )
    }

    /// Only `ports` is compared for change detection per §4.E: "the name is
    /// a function of the immutable tuple; other fields are constants or
    /// contributor-derived booleans".
    pub fn needs_update(&self, fresh: &IeAgAgRule) -> bool {
        self.ports != fresh.ports
    }
}

impl crate::sync::ExternalSyncKey for IeAgAgRule {
    fn sync_key(&self) -> String {
        self.key.as_string()
    }
}
