//! The Rule Generator (§4.B): from one RuleS2S and its two resolved
//! Services, the set of IEAgAgRule candidates this RuleS2S contributes to.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::model::{Key, Protocol, RuleS2S, Traffic};

use super::resolver::ResolvedService;
use super::AggregationKey;

/// One `(localAG, targetAG, protocol)` tuple this RuleS2S contributes ports
/// to, with the deterministic name/namespace the aggregated rule will carry.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub aggregation_key: AggregationKey,
    pub namespace: String,
    pub name: String,
    pub ports: Vec<String>,
}

/// Deterministic name for a `(traffic, localAG, targetAG, protocol)` tuple:
/// `prefix + "-" + sha256(...)` rendered as a canonical UUID (§4.B, S5).
/// Pure: identical inputs always yield identical output.
pub fn rule_name(traffic: Traffic, local_ag_name: &str, target_ag_name: &str, protocol: Protocol) -> String {
    let input = format!(
        "{}-{}-{}-{}",
        traffic.as_lower(),
        local_ag_name,
        target_ag_name,
        protocol.as_lower()
    );
    let digest = Sha256::digest(input.as_bytes());
    let uuid = Uuid::from_slice(&digest[..16]).expect("sha256 digest always yields at least 16 bytes");
    format!("{}-{}", traffic.name_prefix(), uuid)
}

/// Receiver-side AG's namespace becomes the rule's own namespace (§4.B,
/// §9 resolved open question: INGRESS protects the target (destination)
/// side, so its AG's namespace is used; EGRESS protects the local
/// (source) side, so its AG's namespace is used — matching S1's worked
/// example rather than a literal "local for INGRESS" reading of §4.B).
pub fn receiver_namespace(traffic: Traffic, local_ag: &Key, target_ag: &Key) -> String {
    match traffic {
        Traffic::Ingress => target_ag.namespace.clone(),
        Traffic::Egress => local_ag.namespace.clone(),
    }
}

/// The service whose ports define the rule: target for INGRESS (the rule
/// protects the receiving side, i.e. the destination of inbound traffic),
/// local for EGRESS (the rule protects the sending side). S1's worked
/// example ("INGRESS `web→db` … receiver is db-svc") is the ground truth
/// this direction is pinned to.
fn receiver<'a>(traffic: Traffic, local: &'a ResolvedService, target: &'a ResolvedService) -> &'a ResolvedService {
    match traffic {
        Traffic::Ingress => target,
        Traffic::Egress => local,
    }
}

pub fn generate_candidates(rule: &RuleS2S, local: &ResolvedService, target: &ResolvedService) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for local_ag in &local.address_groups {
        for target_ag in &target.address_groups {
            for protocol in Protocol::ALL {
                let receiver = receiver(rule.traffic, local, target);
                let ports = receiver.service.ports_for(protocol);
                if ports.is_empty() {
                    continue;
                }

                candidates.push(Candidate {
                    aggregation_key: (rule.traffic, local_ag.clone(), target_ag.clone(), protocol),
                    namespace: receiver_namespace(rule.traffic, local_ag, target_ag),
                    name: rule_name(rule.traffic, &local_ag.name, &target_ag.name, protocol),
                    ports,
                });
            }
        }
    }

    candidates
}
