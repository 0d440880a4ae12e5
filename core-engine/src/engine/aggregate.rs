//! The Aggregation Engine (§4.C): for one aggregation key, finds all
//! contributing RuleS2S, unions their ports, and emits the fresh
//! IEAgAgRule that key should have — or `None` if it should not exist.

use time::OffsetDateTime;

use crate::error::Result;
use crate::model::{Action, IeAgAgRule, Key, Meta, PortSpec, DEFAULT_PRIORITY};
use crate::store::{Reader, Scope};

use super::resolver::resolve_service;
use super::rulegen::{generate_candidates, receiver_namespace, rule_name};
use super::AggregationKey;

pub struct AggregateOutcome {
    pub key: AggregationKey,
    /// `None` means this key currently has no Ready contributor with a
    /// non-empty port set — any existing rule with this name is an orphan
    /// to be removed by the reconciler (§4.C step 3).
    pub rule: Option<IeAgAgRule>,
}

/// Recomputes one aggregation key from scratch by scanning every RuleS2S in
/// the store. `reader` must be a single consistent session so contributor
/// discovery and port collection never read skew (§4.A/§4.C).
pub async fn aggregate(reader: &dyn Reader, key: &AggregationKey, now: OffsetDateTime) -> Result<AggregateOutcome> {
    let (traffic, local_ag, target_ag, protocol) = key.clone();

    let all_rules = reader.list_rule_s2s(&Scope::Empty).await?;

    let mut ports: Vec<String> = Vec::new();
    let mut trace_all = true;
    let mut contributors = 0usize;

    for rule in &all_rules {
        if rule.traffic != traffic || !rule.is_ready() {
            continue;
        }

        let local = resolve_service(reader, &rule.service_local_ref).await?;
        let target = resolve_service(reader, &rule.service_ref).await?;

        for candidate in generate_candidates(rule, &local, &target) {
            if candidate.aggregation_key != *key {
                continue;
            }
            contributors += 1;
            ports.extend(candidate.ports);
            trace_all &= rule.trace;
        }
    }

    if contributors == 0 || ports.is_empty() {
        return Ok(AggregateOutcome { key: key.clone(), rule: None });
    }

    let name = rule_name(traffic, &local_ag.name, &target_ag.name, protocol);
    let namespace = receiver_namespace(traffic, &local_ag, &target_ag);

    let rule = IeAgAgRule {
        key: Key::new(namespace, name),
        traffic,
        transport: protocol,
        address_group_local: local_ag,
        address_group: target_ag,
        ports: vec![PortSpec::from_ports(ports)],
        action: Action::Accept,
        logs: true,
        trace: trace_all,
        priority: DEFAULT_PRIORITY,
        meta: Meta::new(now),
    };

    Ok(AggregateOutcome { key: key.clone(), rule: Some(rule) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AddressGroupBinding, Condition, ConditionKind, IngressPort, Protocol, RuleS2S, Service, Traffic,
    };
    use crate::store::memory::MemoryRegistry;
    use crate::store::{Registry, SyncOp};
    use std::collections::BTreeSet;

    fn now() -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH
    }

    async fn seed_basic_topology(registry: &MemoryRegistry, trace: bool, ready: bool) {
        let mut writer = registry.writer().await.unwrap();
        let local_svc = Key::new("default", "local-svc");
        let target_svc = Key::new("default", "target-svc");

        writer
            .sync_service(
                vec![
                    Service {
                        key: local_svc.clone(),
                        description: String::new(),
                        ingress_ports: vec![IngressPort { port: "80".into(), protocol: Protocol::Tcp }],
                        meta: Meta::new(now()),
                    },
                    Service {
                        key: target_svc.clone(),
                        description: String::new(),
                        ingress_ports: vec![IngressPort { port: "443".into(), protocol: Protocol::Tcp }],
                        meta: Meta::new(now()),
                    },
                ],
                SyncOp::Upsert,
            )
            .await
            .unwrap();

        writer
            .sync_address_group_binding(
                vec![
                    AddressGroupBinding {
                        key: Key::new("default", "b-local"),
                        service_ref: local_svc.clone(),
                        address_group_ref: Key::new("default", "ag-local"),
                        meta: Meta::new(now()),
                    },
                    AddressGroupBinding {
                        key: Key::new("default", "b-target"),
                        service_ref: target_svc.clone(),
                        address_group_ref: Key::new("default", "ag-target"),
                        meta: Meta::new(now()),
                    },
                ],
                SyncOp::Upsert,
            )
            .await
            .unwrap();

        let mut rule_meta = Meta::new(now());
        if ready {
            rule_meta.set_condition(Condition::new(ConditionKind::Ready, true, "Admitted", 1));
        }
        writer
            .sync_rule_s2s(
                vec![RuleS2S {
                    key: Key::new("default", "r1"),
                    traffic: Traffic::Ingress,
                    service_local_ref: local_svc,
                    service_ref: target_svc,
                    trace,
                    ie_ag_ag_rule_refs: BTreeSet::new(),
                    meta: rule_meta,
                }],
                SyncOp::Upsert,
            )
            .await
            .unwrap();

        writer.commit().await.unwrap();
    }

    fn aggregation_key() -> AggregationKey {
        (
            Traffic::Ingress,
            Key::new("default", "ag-local"),
            Key::new("default", "ag-target"),
            Protocol::Tcp,
        )
    }

    #[tokio::test]
    async fn non_ready_rule_contributes_nothing() {
        let registry = MemoryRegistry::new();
        seed_basic_topology(&registry, false, false).await;

        let reader = registry.reader().await.unwrap();
        let outcome = aggregate(reader.as_ref(), &aggregation_key(), now()).await.unwrap();
        assert!(outcome.rule.is_none());
    }

    #[tokio::test]
    async fn ready_rule_produces_rule_with_ingress_ports() {
        let registry = MemoryRegistry::new();
        seed_basic_topology(&registry, true, true).await;

        let reader = registry.reader().await.unwrap();
        let outcome = aggregate(reader.as_ref(), &aggregation_key(), now()).await.unwrap();
        let rule = outcome.rule.unwrap();
        assert_eq!(rule.ports[0].destination, "443");
        assert!(rule.trace);
        assert_eq!(rule.action, Action::Accept);
        assert_eq!(rule.priority, DEFAULT_PRIORITY);
    }
}
