//! RuleS2S (§3).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::common::Traffic;
use super::key::Key;
use super::meta::Meta;

/// `{ key, Traffic, ServiceLocalRef, ServiceRef, Trace, IEAgAgRuleRefs }`.
///
/// `ie_ag_ag_rule_refs` is maintained by the engine as an efficiency index
/// for targeted cleanup on delete (§4.D, §9) — it is never authoritative for
/// correctness, only for avoiding a full regeneration-and-diff pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleS2S {
    pub key: Key,
    pub traffic: Traffic,
    pub service_local_ref: Key,
    pub service_ref: Key,
    pub trace: bool,
    pub ie_ag_ag_rule_refs: BTreeSet<Key>,
    pub meta: Meta,
}

impl RuleS2S {
    /// A RuleS2S is eligible to contribute to aggregation only once its Ready
    /// condition is true (§4.C step 1).
    pub fn is_ready(&self) -> bool {
        self.meta.is_ready()
    }
}
