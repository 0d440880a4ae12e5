//! Domain entities (§3).

mod address_group;
mod common;
mod ieagag;
mod key;
mod meta;
mod network;
mod rule_s2s;
mod service;

pub use address_group::{AddressGroup, NetworkItem};
pub use common::{IngressPort, PortSpec, Protocol, Traffic};
pub use ieagag::{Action, IeAgAgRule, DEFAULT_PRIORITY};
pub use key::Key;
pub use meta::{Condition, ConditionKind, Meta};
pub use network::{Network, NetworkBinding};
pub use rule_s2s::RuleS2S;
pub use service::{AddressGroupBinding, Service, ServiceAlias};
