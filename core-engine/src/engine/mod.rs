//! The rule-derivation engine (§2, §4): resolver (A), rule generator (B),
//! aggregation engine (C), reactive recomputer (D), reconciler (E), and the
//! aggregation lock manager (G) that serialises them. The external sync
//! coordinator (H) lives in `crate::sync`.

pub mod aggregate;
pub mod locks;
pub mod recompute;
pub mod reconcile;
pub mod resolver;
pub mod rulegen;

use crate::model::{Key, Protocol, Traffic};

/// `(Traffic, localAG, targetAG, Protocol)` — uniquely identifies one
/// IEAgAgRule (§3 GLOSSARY).
pub type AggregationKey = (Traffic, Key, Key, Protocol);
