//! HTTP surface (§6, ambient transport concern): one `axum::Router` per
//! resource kind, assembled with `Router::new().route(...).with_state`.

pub mod address_group_bindings;
pub mod address_groups;
pub mod dto;
pub mod ieagag_rules;
pub mod network_bindings;
pub mod networks;
pub mod rule_s2s;
pub mod service_aliases;
pub mod services;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;

use crate::services::Engine;
use crate::store::Scope;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub namespace: Option<String>,
}

impl ListParams {
    pub fn into_scope(self) -> Scope {
        match self.namespace {
            Some(ns) => Scope::ByNamespace(ns),
            None => Scope::Empty,
        }
    }
}

pub fn create_router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/networks", get(networks::list).post(networks::create))
        .route(
            "/networks/:namespace/:name",
            get(networks::get).put(networks::update).delete(networks::delete),
        )
        .route("/address-groups", get(address_groups::list).post(address_groups::create))
        .route("/address-groups/:namespace/:name", get(address_groups::get).delete(address_groups::delete))
        .route("/network-bindings", get(network_bindings::list).post(network_bindings::create))
        .route(
            "/network-bindings/:namespace/:name",
            get(network_bindings::get).delete(network_bindings::delete),
        )
        .route("/services", get(services::list).post(services::create))
        .route(
            "/services/:namespace/:name",
            get(services::get).put(services::update).delete(services::delete),
        )
        .route(
            "/address-group-bindings",
            get(address_group_bindings::list).post(address_group_bindings::create),
        )
        .route(
            "/address-group-bindings/:namespace/:name",
            get(address_group_bindings::get).delete(address_group_bindings::delete),
        )
        .route("/service-aliases", get(service_aliases::list).post(service_aliases::create))
        .route(
            "/service-aliases/:namespace/:name",
            get(service_aliases::get).delete(service_aliases::delete),
        )
        .route("/rule-s2s", get(rule_s2s::list).post(rule_s2s::create))
        .route("/rule-s2s/:namespace/:name", get(rule_s2s::get).delete(rule_s2s::delete))
        .route("/ieagag-rules", get(ieagag_rules::list))
        .route("/ieagag-rules/:namespace/:name", get(ieagag_rules::get))
        .with_state(engine)
}

async fn health_check() -> &'static str {
    "OK"
}
