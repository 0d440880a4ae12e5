//! The Reactive Recomputer (§4.D): given a change event, compute the
//! minimal set of affected aggregation keys and hand them to the
//! reconciler (E).

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::model::{AddressGroup, IeAgAgRule, Key, RuleS2S};
use crate::store::{Reader, Registry, Scope};
use crate::sync::coordinator::SyncCoordinator;

use super::reconcile::{reconcile, ReconcileOutcome};
use super::resolver::resolve_service;
use super::rulegen::{generate_candidates, receiver_namespace, rule_name};
use super::{locks::KeyedLockManager, AggregationKey};

/// What changed, in just enough detail to compute the affected key set
/// (§4.D). Resource services (`crate::services`) construct these after a
/// successful local commit.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A Service's ports or AddressGroup membership changed.
    ServiceChanged(Key),
    /// An AddressGroupBinding was added or removed; treated as a Service
    /// change on the bound Service (§4.D).
    AddressGroupBindingChanged(Key),
    /// A Network/NetworkBinding spliced into (or out of) an AddressGroup's
    /// `Networks`. Does not affect aggregation keys — AGs are identified by
    /// name, not contents — but the AddressGroup itself must be propagated
    /// to SGROUP.
    AddressGroupContentsChanged(Key),
    /// A RuleS2S was created or its shape updated.
    RuleS2SUpserted(Key),
    /// A RuleS2S was deleted. Carries the pre-delete snapshot so its saved
    /// `ie_ag_ag_rule_refs` (or, failing that, its service refs) can drive
    /// targeted cleanup (§4.D, §9).
    RuleS2SDeleted(RuleS2S),
}

pub enum RecomputeOutcome {
    Reconciled(ReconcileOutcome),
    AddressGroupPropagated,
    NoOp,
}

/// Computes the affected aggregation keys for `event`, then recomputes and
/// reconciles them (§4.C/§4.D/§4.E), or force-propagates an AddressGroup
/// when the event carries no aggregation-key-affecting change.
#[allow(clippy::too_many_arguments)]
pub async fn recompute(
    registry: &dyn Registry,
    locks: &KeyedLockManager,
    ieagag_sync: &SyncCoordinator<IeAgAgRule>,
    address_group_sync: &SyncCoordinator<AddressGroup>,
    event: ChangeEvent,
    now: OffsetDateTime,
    cancel: &CancellationToken,
) -> Result<RecomputeOutcome> {
    if let ChangeEvent::AddressGroupContentsChanged(ag_key) = &event {
        let reader = registry.reader().await?;
        let group = reader.get_address_group(ag_key).await?;
        drop(reader);
        address_group_sync.sync_forced(&group, crate::store::SyncOp::Upsert, cancel).await?;
        return Ok(RecomputeOutcome::AddressGroupPropagated);
    }

    let reader = registry.reader().await?;
    let keys = affected_keys(reader.as_ref(), &event).await?;
    drop(reader);

    if keys.is_empty() {
        return Ok(RecomputeOutcome::NoOp);
    }

    let outcome = reconcile(registry, locks, ieagag_sync, &keys, now, cancel).await?;
    Ok(RecomputeOutcome::Reconciled(outcome))
}

async fn affected_keys(reader: &dyn Reader, event: &ChangeEvent) -> Result<Vec<AggregationKey>> {
    let mut keys = match event {
        ChangeEvent::ServiceChanged(service_key) | ChangeEvent::AddressGroupBindingChanged(service_key) => {
            affected_by_service(reader, service_key).await?
        }
        ChangeEvent::AddressGroupContentsChanged(_) => Vec::new(),
        ChangeEvent::RuleS2SUpserted(rule_key) => {
            let rule = reader.get_rule_s2s(rule_key).await?;
            affected_by_rule(reader, &rule).await?
        }
        ChangeEvent::RuleS2SDeleted(rule) => affected_by_deleted_rule(reader, rule).await?,
    };
    keys.sort();
    keys.dedup();
    Ok(keys)
}

async fn affected_by_service(reader: &dyn Reader, service_key: &Key) -> Result<Vec<AggregationKey>> {
    let rules = reader.list_rule_s2s(&Scope::Empty).await?;
    let mut keys = Vec::new();
    for rule in &rules {
        if &rule.service_local_ref == service_key || &rule.service_ref == service_key {
            keys.extend(affected_by_rule(reader, rule).await?);
        }
    }
    Ok(keys)
}

async fn affected_by_rule(reader: &dyn Reader, rule: &RuleS2S) -> Result<Vec<AggregationKey>> {
    let local = resolve_service(reader, &rule.service_local_ref).await?;
    let target = resolve_service(reader, &rule.service_ref).await?;
    Ok(generate_candidates(rule, &local, &target)
        .into_iter()
        .map(|c| c.aggregation_key)
        .collect())
}

/// Primary path: the rule's saved `ie_ag_ag_rule_refs` name the exact keys
/// to recompute. Fallback (§4.D): regenerate the candidates the rule would
/// have produced, then narrow to those that currently exist in the store —
/// never a full "recompute everything" sweep.
async fn affected_by_deleted_rule(reader: &dyn Reader, rule: &RuleS2S) -> Result<Vec<AggregationKey>> {
    if !rule.ie_ag_ag_rule_refs.is_empty() {
        let mut keys = Vec::new();
        for rule_ref in &rule.ie_ag_ag_rule_refs {
            if let Ok(existing) = reader.get_ieagag_rule(rule_ref).await {
                keys.push(existing.aggregation_key());
            }
        }
        return Ok(keys);
    }

    let candidates = affected_by_rule(reader, rule).await?;
    let mut existing = Vec::new();
    for key in candidates {
        let name = rule_name(key.0, &key.1.name, &key.2.name, key.3);
        let namespace = receiver_namespace(key.0, &key.1, &key.2);
        if reader.get_ieagag_rule(&Key::new(namespace, name)).await.is_ok() {
            existing.push(key);
        }
    }
    Ok(existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AddressGroupBinding, Condition, ConditionKind, IngressPort, Meta, Protocol, Service, Traffic,
    };
    use crate::store::memory::MemoryRegistry;
    use crate::store::SyncOp;
    use crate::sync::mock::LoggingSyncClient;
    use crate::sync::coordinator::RetryPolicy;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn now() -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH
    }

    async fn seed_ready_topology(registry: &MemoryRegistry) -> Key {
        let local_svc = Key::new("default", "local-svc");
        let target_svc = Key::new("default", "target-svc");
        let rule_key = Key::new("default", "r1");

        let mut writer = registry.writer().await.unwrap();
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
        rule_meta.set_condition(Condition::new(ConditionKind::Ready, true, "Admitted", 1));
        writer
            .sync_rule_s2s(
                vec![RuleS2S {
                    key: rule_key.clone(),
                    traffic: Traffic::Ingress,
                    service_local_ref: local_svc,
                    service_ref: target_svc,
                    trace: false,
                    ie_ag_ag_rule_refs: BTreeSet::new(),
                    meta: rule_meta,
                }],
                SyncOp::Upsert,
            )
            .await
            .unwrap();
        writer.commit().await.unwrap();
        rule_key
    }

    #[tokio::test]
    async fn rule_upsert_creates_aggregated_rule() {
        let registry = MemoryRegistry::new();
        let rule_key = seed_ready_topology(&registry).await;

        let locks = KeyedLockManager::new();
        let ieagag_client = Arc::new(LoggingSyncClient::new());
        let ieagag_sync = SyncCoordinator::new(ieagag_client, RetryPolicy::default(), Duration::from_millis(0));
        let ag_client = Arc::new(LoggingSyncClient::new());
        let ag_sync = SyncCoordinator::new(ag_client, RetryPolicy::default(), Duration::from_millis(0));
        let cancel = CancellationToken::new();

        let outcome = recompute(
            &registry,
            &locks,
            &ieagag_sync,
            &ag_sync,
            ChangeEvent::RuleS2SUpserted(rule_key),
            now(),
            &cancel,
        )
        .await
        .unwrap();

        match outcome {
            RecomputeOutcome::Reconciled(r) => assert_eq!(r.created.len(), 1),
            _ => panic!("expected a reconciliation"),
        }
    }

    #[tokio::test]
    async fn unrelated_service_change_is_a_no_op() {
        let registry = MemoryRegistry::new();
        seed_ready_topology(&registry).await;

        let locks = KeyedLockManager::new();
        let ieagag_client = Arc::new(LoggingSyncClient::new());
        let ieagag_sync = SyncCoordinator::new(ieagag_client, RetryPolicy::default(), Duration::from_millis(0));
        let ag_client = Arc::new(LoggingSyncClient::new());
        let ag_sync = SyncCoordinator::new(ag_client, RetryPolicy::default(), Duration::from_millis(0));
        let cancel = CancellationToken::new();

        let outcome = recompute(
            &registry,
            &locks,
            &ieagag_sync,
            &ag_sync,
            ChangeEvent::ServiceChanged(Key::new("default", "unrelated-svc")),
            now(),
            &cancel,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, RecomputeOutcome::NoOp));
    }
}
