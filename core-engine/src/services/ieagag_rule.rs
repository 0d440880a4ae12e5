//! IEAgAgRule read-only access (§3: "owned exclusively by the engine; no
//! external mutation is legal"). Callers may list and fetch but never write.

use crate::error::Result;
use crate::model::{IeAgAgRule, Key};
use crate::store::Scope;

use super::Engine;

pub async fn get(engine: &Engine, key: &Key) -> Result<IeAgAgRule> {
    engine.registry.reader().await?.get_ieagag_rule(key).await
}

pub async fn list(engine: &Engine, scope: &Scope) -> Result<Vec<IeAgAgRule>> {
    engine.registry.reader().await?.list_ieagag_rules(scope).await
}
