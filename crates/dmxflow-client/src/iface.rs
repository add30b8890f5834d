//! Interface selection
//!
//! Enumerating the host's interfaces is the integrator's job: anything that
//! can produce [`InterfaceCandidate`] values plugs in through
//! [`InterfaceResolver`]. Picking one of them is pure policy over that
//! list, so it can be tested (and overridden) without touching the OS.

use std::net::Ipv4Addr;

use crate::error::{ClientError, Result};

/// One IPv4-configured interface as reported by a resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCandidate {
    pub name: String,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub broadcast: Ipv4Addr,
    pub mac: [u8; 6],
}

/// Source of interface candidates, supplied by the embedding application
pub trait InterfaceResolver: Send + Sync {
    fn candidates(&self) -> Vec<InterfaceCandidate>;
}

/// Resolver over a fixed list, for integrators and tests
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    candidates: Vec<InterfaceCandidate>,
}

impl StaticResolver {
    pub fn new(candidates: Vec<InterfaceCandidate>) -> Self {
        Self { candidates }
    }
}

impl InterfaceResolver for StaticResolver {
    fn candidates(&self) -> Vec<InterfaceCandidate> {
        self.candidates.clone()
    }
}

/// Interface preference table. A class-A address in `2.0.0.0/8` with a
/// `255.0.0.0` netmask (the traditional dedicated lighting network) beats
/// everything; after that, interfaces are ranked by name prefix in the
/// order given; anything else comes last.
#[derive(Debug, Clone)]
pub struct InterfaceRanking {
    pub name_prefixes: Vec<String>,
}

impl Default for InterfaceRanking {
    fn default() -> Self {
        Self {
            name_prefixes: vec!["enp".into(), "wlp".into()],
        }
    }
}

impl InterfaceRanking {
    fn rank(&self, candidate: &InterfaceCandidate) -> i32 {
        if candidate.ip.octets()[0] == 2 && candidate.netmask == Ipv4Addr::new(255, 0, 0, 0) {
            return -1;
        }
        for (i, prefix) in self.name_prefixes.iter().enumerate() {
            if candidate.name.starts_with(prefix.as_str()) {
                return i as i32;
            }
        }
        self.name_prefixes.len() as i32
    }
}

/// Pick the interface to use. A forced name bypasses ranking entirely;
/// otherwise the best-ranked candidate wins, with resolver order breaking
/// ties.
pub fn select_interface(
    candidates: Vec<InterfaceCandidate>,
    ranking: &InterfaceRanking,
    forced: Option<&str>,
) -> Result<InterfaceCandidate> {
    if let Some(name) = forced {
        return candidates
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ClientError::UnknownInterface(name.to_string()));
    }

    candidates
        .into_iter()
        .enumerate()
        .min_by_key(|(i, c)| (ranking.rank(c), *i))
        .map(|(_, c)| c)
        .ok_or_else(|| ClientError::UnknownInterface(String::new()))
}
