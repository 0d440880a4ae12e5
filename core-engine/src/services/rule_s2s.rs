//! RuleS2S resource service (§4.F): validates Traffic and both Service
//! references (following ServiceAlias indirection down to a concrete
//! Service key, §9), writes, commits, marks the intent Ready, then invokes
//! the recomputer (D). Delete captures `IEAgAgRuleRefs` before the row is
//! removed so D can target its cleanup precisely (§4.D, §4.F).

use std::collections::BTreeSet;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::engine::recompute::{recompute, ChangeEvent};
use crate::error::{Error, Result};
use crate::model::{Condition, ConditionKind, Key, Meta, RuleS2S, Traffic};
use crate::store::{Reader, Scope, SyncOp};

use super::Engine;

const MAX_ALIAS_HOPS: usize = 8;

/// Follows ServiceAlias indirection from `key` down to a concrete Service
/// key, bounded to avoid looping on a cyclic alias chain. Returns the
/// resolved Service key, or `ValidationFailed` if it never lands on a
/// Service. Generic over `Reader` rather than `&dyn Reader` so it can be
/// called directly against an open `Writer` session (read-your-writes).
async fn resolve_to_service<R: Reader + ?Sized>(reader: &R, key: &Key) -> Result<Key> {
    let mut current = key.clone();
    for _ in 0..MAX_ALIAS_HOPS {
        if reader.get_service(&current).await.is_ok() {
            return Ok(current);
        }
        match reader.get_service_alias(&current).await {
            Ok(alias) => current = alias.service_ref,
            Err(_) => return Err(Error::validation(format!("{key} does not resolve to an existing Service"))),
        }
    }
    Err(Error::validation(format!("{key} exceeds the ServiceAlias resolution depth")))
}

#[allow(clippy::too_many_arguments)]
pub async fn create(
    engine: &Engine,
    key: Key,
    traffic: Traffic,
    service_local_ref: Key,
    service_ref: Key,
    trace: bool,
    now: OffsetDateTime,
    cancel: &CancellationToken,
) -> Result<RuleS2S> {
    let rule = {
        let mut writer = engine.registry.writer().await?;

        let service_local_ref = match resolve_to_service(writer.as_ref(), &service_local_ref).await {
            Ok(resolved) => resolved,
            Err(err) => {
                writer.abort().await?;
                return Err(err);
            }
        };
        let service_ref = match resolve_to_service(writer.as_ref(), &service_ref).await {
            Ok(resolved) => resolved,
            Err(err) => {
                writer.abort().await?;
                return Err(err);
            }
        };

        if writer.get_rule_s2s(&key).await.is_ok() {
            writer.abort().await?;
            return Err(Error::conflict(format!("RuleS2S {key} already exists")));
        }

        let rule = RuleS2S {
            key: key.clone(),
            traffic,
            service_local_ref,
            service_ref,
            trace,
            ie_ag_ag_rule_refs: BTreeSet::new(),
            meta: Meta::new(now),
        };
        writer.sync_rule_s2s(vec![rule.clone()], SyncOp::Upsert).await?;
        writer.commit().await?;
        rule
    };

    // Validation already ran synchronously above; nothing further gates
    // admission, so the intent is immediately eligible to contribute.
    engine
        .conditions
        .record_rule_s2s(
            engine.registry.as_ref(),
            &key,
            Condition::new(ConditionKind::Ready, true, "Admitted", rule.meta.generation),
            now,
        )
        .await?;

    if let RecomputeTrigger::Ran(outcome) =
        trigger_recompute(engine, ChangeEvent::RuleS2SUpserted(key.clone()), now, cancel).await?
    {
        record_rule_refs(engine, &key, &outcome, now).await?;
    }

    engine.registry.reader().await?.get_rule_s2s(&key).await
}

pub async fn get(engine: &Engine, key: &Key) -> Result<RuleS2S> {
    engine.registry.reader().await?.get_rule_s2s(key).await
}

pub async fn list(engine: &Engine, scope: &Scope) -> Result<Vec<RuleS2S>> {
    engine.registry.reader().await?.list_rule_s2s(scope).await
}

/// Idempotent: deleting an already-absent RuleS2S succeeds. Captures
/// `ie_ag_ag_rule_refs` before the row is removed so the recomputer can
/// target exactly the aggregation keys this intent used to contribute to.
pub async fn delete(engine: &Engine, key: &Key, now: OffsetDateTime, cancel: &CancellationToken) -> Result<()> {
    let rule = {
        let mut writer = engine.registry.writer().await?;
        let rule = match writer.get_rule_s2s(key).await {
            Ok(rule) => rule,
            Err(Error::NotFound(_)) => {
                writer.abort().await?;
                return Ok(());
            }
            Err(err) => {
                writer.abort().await?;
                return Err(err);
            }
        };
        writer.sync_rule_s2s(vec![rule.clone()], SyncOp::Delete).await?;
        writer.commit().await?;
        rule
    };

    trigger_recompute(engine, ChangeEvent::RuleS2SDeleted(rule), now, cancel).await?;
    Ok(())
}

enum RecomputeTrigger {
    Ran(crate::engine::recompute::RecomputeOutcome),
}

async fn trigger_recompute(
    engine: &Engine,
    event: ChangeEvent,
    now: OffsetDateTime,
    cancel: &CancellationToken,
) -> Result<RecomputeTrigger> {
    let outcome = recompute(
        engine.registry.as_ref(),
        &engine.locks,
        &engine.ieagag_sync,
        &engine.address_group_sync,
        event,
        now,
        cancel,
    )
    .await?;
    Ok(RecomputeTrigger::Ran(outcome))
}

/// Maintains the `ie_ag_ag_rule_refs` index (§4.D, §9: "never relied on for
/// correctness, only efficiency") by recording exactly the IEAgAgRule keys
/// this reconciliation created or updated.
async fn record_rule_refs(
    engine: &Engine,
    key: &Key,
    outcome: &crate::engine::recompute::RecomputeOutcome,
    now: OffsetDateTime,
) -> Result<()> {
    let crate::engine::recompute::RecomputeOutcome::Reconciled(reconciled) = outcome else {
        return Ok(());
    };
    if reconciled.created.is_empty() && reconciled.updated.is_empty() {
        return Ok(());
    }

    let mut writer = engine.registry.writer().await?;
    let mut rule = writer.get_rule_s2s(key).await?;
    for created in reconciled.created.iter().chain(reconciled.updated.iter()) {
        rule.ie_ag_ag_rule_refs.insert(created.key.clone());
    }
    rule.meta.touch_status(now);
    writer.sync_rule_s2s(vec![rule], SyncOp::Upsert).await?;
    writer.commit().await
}
