//! AddressGroup (§3).

use serde::{Deserialize, Serialize};

use super::key::Key;
use super::meta::Meta;

/// `{ Name: "ns/name", CIDR, Namespace, Kind="Network" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkItem {
    pub name: String,
    pub cidr: String,
    pub namespace: String,
    pub kind: String,
}

impl NetworkItem {
    pub fn for_network(key: &Key, cidr: impl Into<String>) -> Self {
        Self {
            name: key.as_string(),
            cidr: cidr.into(),
            namespace: key.namespace.clone(),
            kind: "Network".to_string(),
        }
    }
}

/// `{ key, Networks: ordered sequence of NetworkItem }`.
///
/// Invariant: `networks` is a set keyed by `name` (no duplicates) — enforced
/// by `splice_in`/`remove` rather than by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressGroup {
    pub key: Key,
    pub networks: Vec<NetworkItem>,
    pub meta: Meta,
}

impl AddressGroup {
    /// Adds `item`, replacing any existing entry with the same `name`.
    /// Mirrors NetworkBinding creation's splice side-effect (§3, §4.F).
    pub fn splice_in(&mut self, item: NetworkItem) {
        if let Some(existing) = self.networks.iter_mut().find(|n| n.name == item.name) {
            *existing = item;
        } else {
            self.networks.push(item);
        }
    }

    /// Removes the entry with the given `name`, if present. Mirrors
    /// NetworkBinding deletion's reverse side-effect.
    pub fn remove(&mut self, name: &str) {
        self.networks.retain(|n| n.name != name);
    }
}

impl crate::sync::ExternalSyncKey for AddressGroup {
    fn sync_key(&self) -> String {
        self.key.as_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn ag() -> AddressGroup {
        AddressGroup {
            key: Key::new("default", "web"),
            networks: Vec::new(),
            meta: Meta::new(OffsetDateTime::UNIX_EPOCH),
        }
    }

    #[test]
    fn splice_in_is_idempotent_by_name() {
        let mut group = ag();
        let net_key = Key::new("default", "net-a");
        group.splice_in(NetworkItem::for_network(&net_key, "10.0.0.0/24"));
        group.splice_in(NetworkItem::for_network(&net_key, "10.0.0.0/24"));
        assert_eq!(group.networks.len(), 1);
    }

    #[test]
    fn remove_reverses_splice_in() {
        let mut group = ag();
        let net_key = Key::new("default", "net-a");
        group.splice_in(NetworkItem::for_network(&net_key, "10.0.0.0/24"));
        group.remove(&net_key.as_string());
        assert!(group.networks.is_empty());
    }
}
