//! End-to-end scenarios S1-S6 (§8): aggregation across two RuleS2S, port
//! change propagation, unbinding removes contribution, protocol split,
//! deterministic naming, and the mass-deletion safety cap.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use netguard_core::model::{IngressPort, Key, Protocol, Traffic};
use netguard_core::services::{address_group, address_group_binding, rule_s2s, service, Engine};
use netguard_core::store::memory::MemoryRegistry;
use netguard_core::store::{Registry, Scope};
use netguard_core::sync::coordinator::RetryPolicy;

fn now() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

fn engine() -> Arc<Engine> {
    Arc::new(Engine::new(Arc::new(MemoryRegistry::new()), RetryPolicy::default(), Duration::from_millis(0)))
}

async fn bind(engine: &Engine, service_key: &Key, ag_key: &Key, cancel: &CancellationToken) {
    address_group_binding::create(
        engine,
        Key::new(service_key.namespace.clone(), format!("{}-{}", service_key.name, ag_key.name)),
        service_key.clone(),
        ag_key.clone(),
        now(),
        cancel,
    )
    .await
    .unwrap();
}

/// S1: two RuleS2S sharing an aggregation key aggregate into one
/// IEAgAgRule whose Destination is the union of both contributions.
#[tokio::test]
async fn s1_aggregation_across_two_rules() {
    let engine = engine();
    let cancel = CancellationToken::new();

    let local = Key::new("default", "local-svc");
    let target_a = Key::new("default", "target-a");
    let target_b = Key::new("default", "target-b");
    let ag_local = Key::new("default", "ag-local");
    let ag_target = Key::new("default", "ag-target");

    service::create(&engine, local.clone(), String::new(), vec![], now()).await.unwrap();
    service::create(
        &engine,
        target_a.clone(),
        String::new(),
        vec![IngressPort { port: "80".into(), protocol: Protocol::Tcp }],
        now(),
    )
    .await
    .unwrap();
    service::create(
        &engine,
        target_b.clone(),
        String::new(),
        vec![IngressPort { port: "443".into(), protocol: Protocol::Tcp }],
        now(),
    )
    .await
    .unwrap();
    address_group::create(&engine, ag_local.clone(), now()).await.unwrap();
    address_group::create(&engine, ag_target.clone(), now()).await.unwrap();

    bind(&engine, &local, &ag_local, &cancel).await;
    bind(&engine, &target_a, &ag_target, &cancel).await;
    bind(&engine, &target_b, &ag_target, &cancel).await;

    rule_s2s::create(
        &engine,
        Key::new("default", "r-a"),
        Traffic::Ingress,
        local.clone(),
        target_a,
        false,
        now(),
        &cancel,
    )
    .await
    .unwrap();
    rule_s2s::create(
        &engine,
        Key::new("default", "r-b"),
        Traffic::Ingress,
        local,
        target_b,
        false,
        now(),
        &cancel,
    )
    .await
    .unwrap();

    let reader = engine.registry.reader().await.unwrap();
    let rules = reader.list_ieagag_rules(&Scope::Empty).await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].ports[0].destination, "443,80");
}

/// S2: changing a Service's ports propagates to the aggregated rule's
/// Destination without requiring a manual recompute trigger.
#[tokio::test]
async fn s2_port_change_propagation() {
    let engine = engine();
    let cancel = CancellationToken::new();

    let local = Key::new("default", "local-svc");
    let target = Key::new("default", "target-svc");
    let ag_local = Key::new("default", "ag-local");
    let ag_target = Key::new("default", "ag-target");

    service::create(&engine, local.clone(), String::new(), vec![], now()).await.unwrap();
    service::create(
        &engine,
        target.clone(),
        String::new(),
        vec![IngressPort { port: "80".into(), protocol: Protocol::Tcp }],
        now(),
    )
    .await
    .unwrap();
    address_group::create(&engine, ag_local.clone(), now()).await.unwrap();
    address_group::create(&engine, ag_target.clone(), now()).await.unwrap();
    bind(&engine, &local, &ag_local, &cancel).await;
    bind(&engine, &target, &ag_target, &cancel).await;

    rule_s2s::create(
        &engine,
        Key::new("default", "r1"),
        Traffic::Ingress,
        local,
        target.clone(),
        false,
        now(),
        &cancel,
    )
    .await
    .unwrap();

    service::update(
        &engine,
        &target,
        String::new(),
        vec![
            IngressPort { port: "80".into(), protocol: Protocol::Tcp },
            IngressPort { port: "8080".into(), protocol: Protocol::Tcp },
        ],
        now(),
        &cancel,
    )
    .await
    .unwrap();

    let reader = engine.registry.reader().await.unwrap();
    let rules = reader.list_ieagag_rules(&Scope::Empty).await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].ports[0].destination, "80,8080");
}

/// S3: removing an AddressGroupBinding removes that Service's contribution;
/// with no other contributor, the aggregated rule disappears entirely.
#[tokio::test]
async fn s3_unbinding_removes_contribution() {
    let engine = engine();
    let cancel = CancellationToken::new();

    let local = Key::new("default", "local-svc");
    let target = Key::new("default", "target-svc");
    let ag_local = Key::new("default", "ag-local");
    let ag_target = Key::new("default", "ag-target");

    service::create(&engine, local.clone(), String::new(), vec![], now()).await.unwrap();
    service::create(
        &engine,
        target.clone(),
        String::new(),
        vec![IngressPort { port: "80".into(), protocol: Protocol::Tcp }],
        now(),
    )
    .await
    .unwrap();
    address_group::create(&engine, ag_local.clone(), now()).await.unwrap();
    address_group::create(&engine, ag_target.clone(), now()).await.unwrap();
    bind(&engine, &local, &ag_local, &cancel).await;
    bind(&engine, &target, &ag_target, &cancel).await;

    rule_s2s::create(
        &engine,
        Key::new("default", "r1"),
        Traffic::Ingress,
        local.clone(),
        target.clone(),
        false,
        now(),
        &cancel,
    )
    .await
    .unwrap();

    let reader = engine.registry.reader().await.unwrap();
    assert_eq!(reader.list_ieagag_rules(&Scope::Empty).await.unwrap().len(), 1);
    drop(reader);

    address_group_binding::delete(
        &engine,
        &Key::new("default", format!("{}-{}", target.name, ag_target.name)),
        now(),
        &cancel,
    )
    .await
    .unwrap();

    let reader = engine.registry.reader().await.unwrap();
    assert!(reader.list_ieagag_rules(&Scope::Empty).await.unwrap().is_empty());
}

/// S4: a Service exposing both TCP and UDP ports produces two independent
/// IEAgAgRules, one per protocol, each carrying only its own ports.
#[tokio::test]
async fn s4_protocol_split() {
    let engine = engine();
    let cancel = CancellationToken::new();

    let local = Key::new("default", "local-svc");
    let target = Key::new("default", "target-svc");
    let ag_local = Key::new("default", "ag-local");
    let ag_target = Key::new("default", "ag-target");

    service::create(&engine, local.clone(), String::new(), vec![], now()).await.unwrap();
    service::create(
        &engine,
        target.clone(),
        String::new(),
        vec![
            IngressPort { port: "80".into(), protocol: Protocol::Tcp },
            IngressPort { port: "53".into(), protocol: Protocol::Udp },
        ],
        now(),
    )
    .await
    .unwrap();
    address_group::create(&engine, ag_local.clone(), now()).await.unwrap();
    address_group::create(&engine, ag_target.clone(), now()).await.unwrap();
    bind(&engine, &local, &ag_local, &cancel).await;
    bind(&engine, &target, &ag_target, &cancel).await;

    rule_s2s::create(&engine, Key::new("default", "r1"), Traffic::Ingress, local, target, false, now(), &cancel)
        .await
        .unwrap();

    let reader = engine.registry.reader().await.unwrap();
    let mut rules = reader.list_ieagag_rules(&Scope::Empty).await.unwrap();
    rules.sort_by(|a, b| a.transport.cmp(&b.transport));
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].transport, Protocol::Tcp);
    assert_eq!(rules[0].ports[0].destination, "80");
    assert_eq!(rules[1].transport, Protocol::Udp);
    assert_eq!(rules[1].ports[0].destination, "53");
}

/// S5: rule-name generation is pure — the identical `(Traffic, localAG,
/// targetAG, protocol)` tuple always yields the identical deterministic
/// name, `"ing-" + uuid`/`"egr-" + uuid`, byte for byte.
#[tokio::test]
async fn s5_deterministic_naming() {
    use sha2::{Digest, Sha256};
    use uuid::Uuid;

    use netguard_core::engine::rulegen::rule_name;

    let a = rule_name(Traffic::Ingress, "ag-local", "ag-target", Protocol::Tcp);
    let b = rule_name(Traffic::Ingress, "ag-local", "ag-target", Protocol::Tcp);
    assert_eq!(a, b);

    let digest = Sha256::digest("ingress-ag-local-ag-target-tcp".as_bytes());
    let uuid = Uuid::from_slice(&digest[..16]).unwrap();
    assert_eq!(a, format!("ing-{uuid}"));

    let c = rule_name(Traffic::Egress, "ag-local", "ag-target", Protocol::Tcp);
    assert_ne!(a, c);
    assert!(c.starts_with("egr-"));
}

/// S6: the reconciler refuses to delete more than 80% of a >10-rule
/// population in one pass, leaving every existing rule untouched.
#[tokio::test]
async fn s6_safety_cap_blocks_mass_deletion() {
    use netguard_core::engine::locks::KeyedLockManager;
    use netguard_core::engine::reconcile::reconcile;
    use netguard_core::engine::rulegen::{receiver_namespace, rule_name};
    use netguard_core::error::Error;
    use netguard_core::model::{Action, IeAgAgRule, Meta, PortSpec, DEFAULT_PRIORITY};
    use netguard_core::store::SyncOp;
    use netguard_core::sync::coordinator::SyncCoordinator;
    use netguard_core::sync::mock::LoggingSyncClient;

    let registry = MemoryRegistry::new();
    let locks = KeyedLockManager::new();
    let coordinator =
        SyncCoordinator::new(Arc::new(LoggingSyncClient::new()), RetryPolicy::default(), Duration::from_millis(0));
    let cancel = CancellationToken::new();

    // 12 aggregation keys with no live RuleS2S contributor; each has a
    // pre-existing IEAgAgRule seeded under its deterministic name, so a
    // reconcile over all 12 would delete the entire population.
    let keys: Vec<_> = (0..12)
        .map(|i| {
            (
                Traffic::Ingress,
                Key::new("default", "ag-local"),
                Key::new("default", format!("ag-target-{i}")),
                Protocol::Tcp,
            )
        })
        .collect();

    let mut writer = registry.writer().await.unwrap();
    let seeded: Vec<_> = keys
        .iter()
        .map(|k| {
            let name = rule_name(k.0, &k.1.name, &k.2.name, k.3);
            let namespace = receiver_namespace(k.0, &k.1, &k.2);
            IeAgAgRule {
                key: Key::new(namespace, name),
                traffic: k.0,
                transport: k.3,
                address_group_local: k.1.clone(),
                address_group: k.2.clone(),
                ports: vec![PortSpec::from_ports(["80".to_string()])],
                action: Action::Accept,
                logs: true,
                trace: false,
                priority: DEFAULT_PRIORITY,
                meta: Meta::new(now()),
            }
        })
        .collect();
    writer.sync_ieagag_rule(seeded, SyncOp::Upsert).await.unwrap();
    writer.commit().await.unwrap();

    let result = reconcile(&registry, &locks, &coordinator, &keys, now(), &cancel).await;
    assert!(matches!(result, Err(Error::SafetyGuardTriggered(_))));

    let reader = registry.reader().await.unwrap();
    assert_eq!(reader.list_ieagag_rules(&Scope::Empty).await.unwrap().len(), 12);
}
