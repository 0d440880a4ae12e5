//! The persistence contract (§6). The persistence layer itself is an
//! external collaborator per §1; this module defines the trait shape the
//! core needs and `memory` ships a reference implementation good enough to
//! run the engine and its tests without a real database.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    AddressGroup, AddressGroupBinding, IeAgAgRule, Key, Network, NetworkBinding, RuleS2S, Service,
    ServiceAlias,
};

/// What portion of an entity collection a `list` call should return.
#[derive(Debug, Clone, Default)]
pub enum Scope {
    /// No filter — every entity of the requested type.
    #[default]
    Empty,
    /// Entities matching one specific `(namespace, name)`.
    ByResourceIdentifier(Key),
    /// Entities within a namespace.
    ByNamespace(String),
    /// Entities whose key is in this explicit set (used by the reconciler
    /// and recomputer to scope a read to exactly the affected keys, §4.D/§4.E).
    ByKeys(Vec<Key>),
}

impl Scope {
    fn matches(&self, key: &Key) -> bool {
        match self {
            Scope::Empty => true,
            Scope::ByResourceIdentifier(k) => k == key,
            Scope::ByNamespace(ns) => &key.namespace == ns,
            Scope::ByKeys(keys) => keys.contains(key),
        }
    }
}

/// `Upsert` or `Delete`, per §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    Upsert,
    Delete,
}

/// Read access to one snapshot of the store. A `Reader` may be derived from
/// an open `Writer` for same-session visibility (§4.A: "must be invoked
/// through the same reader session as the subsequent rule generation").
#[async_trait]
pub trait Reader: Send + Sync {
    async fn get_network(&self, key: &Key) -> Result<Network>;
    async fn list_networks(&self, scope: &Scope) -> Result<Vec<Network>>;

    async fn get_address_group(&self, key: &Key) -> Result<AddressGroup>;
    async fn list_address_groups(&self, scope: &Scope) -> Result<Vec<AddressGroup>>;

    async fn get_network_binding(&self, key: &Key) -> Result<NetworkBinding>;
    async fn list_network_bindings(&self, scope: &Scope) -> Result<Vec<NetworkBinding>>;

    async fn get_service(&self, key: &Key) -> Result<Service>;
    async fn list_services(&self, scope: &Scope) -> Result<Vec<Service>>;

    async fn get_address_group_binding(&self, key: &Key) -> Result<AddressGroupBinding>;
    async fn list_address_group_bindings(&self, scope: &Scope) -> Result<Vec<AddressGroupBinding>>;

    async fn get_service_alias(&self, key: &Key) -> Result<ServiceAlias>;
    async fn list_service_aliases(&self, scope: &Scope) -> Result<Vec<ServiceAlias>>;

    async fn get_rule_s2s(&self, key: &Key) -> Result<RuleS2S>;
    async fn list_rule_s2s(&self, scope: &Scope) -> Result<Vec<RuleS2S>>;

    async fn get_ieagag_rule(&self, key: &Key) -> Result<IeAgAgRule>;
    async fn list_ieagag_rules(&self, scope: &Scope) -> Result<Vec<IeAgAgRule>>;
}

/// A single transactional write session (§5: "local store writes for a
/// single high-level operation are atomic"). `sync`/`delete_by_ids` stage
/// changes; nothing is visible to other sessions until `commit`.
#[async_trait]
pub trait Writer: Reader {
    async fn sync_network(&mut self, items: Vec<Network>, op: SyncOp) -> Result<()>;
    async fn sync_address_group(&mut self, items: Vec<AddressGroup>, op: SyncOp) -> Result<()>;
    async fn sync_network_binding(&mut self, items: Vec<NetworkBinding>, op: SyncOp) -> Result<()>;
    async fn sync_service(&mut self, items: Vec<Service>, op: SyncOp) -> Result<()>;
    async fn sync_address_group_binding(&mut self, items: Vec<AddressGroupBinding>, op: SyncOp) -> Result<()>;
    async fn sync_service_alias(&mut self, items: Vec<ServiceAlias>, op: SyncOp) -> Result<()>;
    async fn sync_rule_s2s(&mut self, items: Vec<RuleS2S>, op: SyncOp) -> Result<()>;
    async fn sync_ieagag_rule(&mut self, items: Vec<IeAgAgRule>, op: SyncOp) -> Result<()>;

    async fn delete_ieagag_rules_by_keys(&mut self, keys: &[Key]) -> Result<()>;

    /// Makes every staged change visible to subsequent sessions.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every staged change. Always safe to call instead of
    /// `commit`; used on validation failure and on cancellation (§5).
    async fn abort(self: Box<Self>) -> Result<()>;
}

/// Opens reader/writer sessions against the store (§6).
#[async_trait]
pub trait Registry: Send + Sync {
    async fn reader(&self) -> Result<Box<dyn Reader>>;
    async fn writer(&self) -> Result<Box<dyn Writer>>;

    /// A writer with ReadCommitted isolation, used to reduce serialisation
    /// conflicts during mass deletions (§6). The in-memory reference
    /// implementation's `writer_for_deletes` skips the optimistic
    /// conflict check `writer()` would otherwise apply on commit.
    async fn writer_for_deletes(&self) -> Result<Box<dyn Writer>>;
}
