//! The condition-setting subsystem (§1, §9: "condition processing happens
//! outside the transactional path: commit first, then process conditions").
//! Implemented in-process against a `Registry`, since condition state is
//! part of resource metadata (§3) rather than an external collaborator.

use time::OffsetDateTime;

use crate::error::Result;
use crate::model::{Condition, Key};
use crate::store::{Registry, SyncOp};

/// Records one condition on one entity, read-modify-write in its own
/// transaction. Each `record_*` method is grounded on the same
/// get-touch-sync-commit shape, one per entity type, since the `Registry`
/// trait has no type-erased "update metadata" operation (§6 is per-entity).
pub struct ConditionRecorder;

impl ConditionRecorder {
    pub fn new() -> Self {
        Self
    }

    pub async fn record_network(
        &self,
        registry: &dyn Registry,
        key: &Key,
        condition: Condition,
        now: OffsetDateTime,
    ) -> Result<()> {
        let mut writer = registry.writer().await?;
        let mut entity = writer.get_network(key).await?;
        entity.meta.touch_status(now);
        entity.meta.set_condition(condition);
        writer.sync_network(vec![entity], SyncOp::Upsert).await?;
        writer.commit().await
    }

    pub async fn record_address_group(
        &self,
        registry: &dyn Registry,
        key: &Key,
        condition: Condition,
        now: OffsetDateTime,
    ) -> Result<()> {
        let mut writer = registry.writer().await?;
        let mut entity = writer.get_address_group(key).await?;
        entity.meta.touch_status(now);
        entity.meta.set_condition(condition);
        writer.sync_address_group(vec![entity], SyncOp::Upsert).await?;
        writer.commit().await
    }

    pub async fn record_network_binding(
        &self,
        registry: &dyn Registry,
        key: &Key,
        condition: Condition,
        now: OffsetDateTime,
    ) -> Result<()> {
        let mut writer = registry.writer().await?;
        let mut entity = writer.get_network_binding(key).await?;
        entity.meta.touch_status(now);
        entity.meta.set_condition(condition);
        writer.sync_network_binding(vec![entity], SyncOp::Upsert).await?;
        writer.commit().await
    }

    pub async fn record_service(
        &self,
        registry: &dyn Registry,
        key: &Key,
        condition: Condition,
        now: OffsetDateTime,
    ) -> Result<()> {
        let mut writer = registry.writer().await?;
        let mut entity = writer.get_service(key).await?;
        entity.meta.touch_status(now);
        entity.meta.set_condition(condition);
        writer.sync_service(vec![entity], SyncOp::Upsert).await?;
        writer.commit().await
    }

    pub async fn record_rule_s2s(
        &self,
        registry: &dyn Registry,
        key: &Key,
        condition: Condition,
        now: OffsetDateTime,
    ) -> Result<()> {
        let mut writer = registry.writer().await?;
        let mut entity = writer.get_rule_s2s(key).await?;
        entity.meta.touch_status(now);
        entity.meta.set_condition(condition);
        writer.sync_rule_s2s(vec![entity], SyncOp::Upsert).await?;
        writer.commit().await
    }

    pub async fn record_ieagag_rule(
        &self,
        registry: &dyn Registry,
        key: &Key,
        condition: Condition,
        now: OffsetDateTime,
    ) -> Result<()> {
        let mut writer = registry.writer().await?;
        let mut entity = writer.get_ieagag_rule(key).await?;
        entity.meta.touch_status(now);
        entity.meta.set_condition(condition);
        writer.sync_ieagag_rule(vec![entity], SyncOp::Upsert).await?;
        writer.commit().await
    }

    /// Returns whether `key`'s Ready condition currently reads `true`.
    /// Used by the aggregation engine's contributor filter (§4.C step 1).
    pub async fn is_ready_rule_s2s(&self, registry: &dyn Registry, key: &Key) -> Result<bool> {
        let reader = registry.reader().await?;
        Ok(reader.get_rule_s2s(key).await?.meta.is_ready())
    }
}

impl Default for ConditionRecorder {
    fn default() -> Self {
        Self::new()
    }
}
