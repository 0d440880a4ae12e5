//! Shared vocabulary between RuleS2S and IEAgAgRule (§3).

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Traffic {
    Ingress,
    Egress,
}

impl Traffic {
    /// Lower-case form used in the rule-name hash input (§4.B) and as the
    /// three-letter name prefix's source.
    pub fn as_lower(self) -> &'static str {
        match self {
            Traffic::Ingress => "ingress",
            Traffic::Egress => "egress",
        }
    }

    /// First three letters of the lower-case form: `ing` / `egr`.
    pub fn name_prefix(self) -> &'static str {
        match self {
            Traffic::Ingress => "ing",
            Traffic::Egress => "egr",
        }
    }
}

impl fmt::Display for Traffic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_lower())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Tcp, Protocol::Udp];

    pub fn as_lower(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_lower())
    }
}

/// One port entry declared on a Service (§3 `IngressPorts`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressPort {
    pub port: String,
    pub protocol: Protocol,
}

/// A materialised port set on an IEAgAgRule: the sorted, comma-joined union
/// of contributing port strings (§3, §4.C step 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub destination: String,
}

impl PortSpec {
    /// Builds a `PortSpec` from an arbitrary collection of port strings,
    /// deduplicating and sorting lexicographically per §4.C's tie-break rule.
    pub fn from_ports<I: IntoIterator<Item = String>>(ports: I) -> Self {
        let mut unique: Vec<String> = ports.into_iter().collect();
        unique.sort();
        unique.dedup();
        Self {
            destination: unique.join(","),
        }
    }
}
