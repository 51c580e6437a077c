//! Deadlock handling: exactly one of wait-die or wait-for-graph cycle detection is
//! active per engine instance, selected via `DeadlockPolicy`.
//!
//! Cycle detection always makes the requester the victim on a detected cycle; there is
//! no configurable victim-selection strategy.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::common::{Timestamp, TransactionId};
use crate::transaction::types::DeadlockPolicy;

/// What the requester should do after a lock conflict is handed to the deadlock handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Requester should be enqueued as a waiter.
    Wait,
    /// Requester is the victim: drive it to `Failed` and do not enqueue it.
    Victim,
}

/// Directed wait-for graph: edge `a -> b` means "a is waiting for a lock held by b".
/// Only populated/consulted under `DeadlockPolicy::CycleDetection`.
#[derive(Default)]
struct WaitForGraph {
    edges: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl WaitForGraph {
    fn add_edges(&mut self, from: TransactionId, to: &[TransactionId]) {
        let entry = self.edges.entry(from).or_default();
        for t in to {
            if *t != from {
                entry.insert(*t);
            }
        }
    }

    /// DFS cycle check starting from `start`. `visited` memoizes dead ends so a node with
    /// fan-out into an already-explored acyclic region is not re-walked.
    fn has_cycle_from(&self, start: TransactionId) -> bool {
        fn visit(
            graph: &HashMap<TransactionId, HashSet<TransactionId>>,
            node: TransactionId,
            start: TransactionId,
            visited: &mut HashSet<TransactionId>,
        ) -> bool {
            let Some(neighbors) = graph.get(&node) else {
                return false;
            };
            for &next in neighbors {
                if next == start {
                    return true;
                }
                if visited.insert(next) && visit(graph, next, start, visited) {
                    return true;
                }
            }
            false
        }

        let mut visited = HashSet::new();
        visited.insert(start);
        visit(&self.edges, start, start, &mut visited)
    }

    fn remove_node(&mut self, id: TransactionId) {
        self.edges.remove(&id);
        for neighbors in self.edges.values_mut() {
            neighbors.remove(&id);
        }
    }

    fn is_waiting(&self, id: TransactionId) -> bool {
        self.edges.get(&id).map(|s| !s.is_empty()).unwrap_or(false)
    }
}

pub struct DeadlockHandler {
    policy: DeadlockPolicy,
    graph: RwLock<WaitForGraph>,
}

impl DeadlockHandler {
    pub fn new(policy: DeadlockPolicy) -> Self {
        Self {
            policy,
            graph: RwLock::new(WaitForGraph::default()),
        }
    }

    pub fn policy(&self) -> DeadlockPolicy {
        self.policy
    }

    /// Resolves a conflict between `requester` and the transactions in `holders`
    /// (each paired with its timestamp), per the configured policy.
    ///
    /// Wait-die: the requester waits only if it is older than every holder it would be
    /// enqueued behind; if it is younger than any of them it dies, since wait-die never
    /// lets a transaction wait for a younger one.
    ///
    /// Cycle detection: tentatively adds `requester -> holder` edges and runs a DFS from
    /// the requester. A cycle means the requester is the victim and its tentative edges
    /// are rolled back; otherwise the edges are committed and the requester waits.
    pub fn resolve(
        &self,
        requester: TransactionId,
        requester_ts: Timestamp,
        holders: &[(TransactionId, Timestamp)],
    ) -> Resolution {
        match self.policy {
            DeadlockPolicy::WaitDie => {
                let requester_is_oldest = holders.iter().all(|(_, ts)| requester_ts < *ts);
                if requester_is_oldest {
                    debug!(transaction_id = requester, "wait-die: requester waits");
                    Resolution::Wait
                } else {
                    warn!(transaction_id = requester, "wait-die: requester dies");
                    Resolution::Victim
                }
            }
            DeadlockPolicy::CycleDetection => {
                let holder_ids: Vec<TransactionId> = holders.iter().map(|(id, _)| *id).collect();
                let mut graph = self.graph.write();
                graph.add_edges(requester, &holder_ids);
                if graph.has_cycle_from(requester) {
                    graph.remove_node(requester);
                    warn!(transaction_id = requester, "cycle detected, requester is victim");
                    Resolution::Victim
                } else {
                    debug!(transaction_id = requester, "no cycle, requester waits");
                    Resolution::Wait
                }
            }
        }
    }

    /// Removes all edges incident to `id` from the wait-for graph, on lock release or
    /// transaction termination. A no-op under wait-die, which never populates the graph.
    pub fn clear(&self, id: TransactionId) {
        self.graph.write().remove_node(id);
    }

    pub fn is_waiting(&self, id: TransactionId) -> bool {
        self.graph.read().is_waiting(id)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.read().edges.values().map(|s| s.len()).sum()
    }
}
