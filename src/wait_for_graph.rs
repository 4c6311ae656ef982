//! The lock manager's wait-for graph: directed edges `waiter -> holder`.
//! A cycle means deadlock. Keyed on `TransactionID` values, never on
//! references to transactions, so the graph has no lifetime tied to any
//! live transaction object.

use std::collections::{HashMap, HashSet};

use crate::transaction_id::TransactionID;

pub struct WaitForGraph {
    graph: HashMap<TransactionID, HashSet<TransactionID>>,
}

impl WaitForGraph {
    pub fn new() -> Self {
        Self {
            graph: HashMap::new(),
        }
    }

    pub fn add_edge(&mut self, from: TransactionID, to: TransactionID) {
        self.graph.entry(from).or_insert_with(HashSet::new).insert(to);
    }

    pub fn remove_edge(&mut self, from: TransactionID, to: TransactionID) {
        if let Some(targets) = self.graph.get_mut(&from) {
            targets.remove(&to);
        }
    }

    /// Drops every outgoing edge from `tid` — called once a lock request is
    /// granted, since a granted transaction is no longer waiting on anyone.
    pub fn remove_edges_from(&mut self, tid: TransactionID) {
        self.graph.remove(&tid);
    }

    /// Drops `tid` both as a waiter (its own edge set) and as a target of
    /// every other waiter's edges — used when a transaction completes.
    pub fn remove_transaction(&mut self, tid: TransactionID) {
        self.graph.remove(&tid);
        for targets in self.graph.values_mut() {
            targets.remove(&tid);
        }
    }

    /// Would adding the edge `from -> to` create a cycle? Answers without
    /// mutating the graph.
    pub fn would_cycle(&self, from: TransactionID, to: TransactionID) -> bool {
        if from == to {
            return true;
        }
        // a cycle forms iff `to` can already reach `from`
        let mut visited = HashSet::new();
        let mut stack = vec![to];
        while let Some(node) = stack.pop() {
            if node == from {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(targets) = self.graph.get(&node) {
                stack.extend(targets.iter().copied());
            }
        }
        false
    }

    #[cfg(test)]
    pub fn exists_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        for &tid in self.graph.keys() {
            if self.is_cyclic(tid, &mut visited, &mut rec_stack) {
                return true;
            }
        }
        false
    }

    #[cfg(test)]
    fn is_cyclic(
        &self,
        tid: TransactionID,
        visited: &mut HashSet<TransactionID>,
        rec_stack: &mut HashSet<TransactionID>,
    ) -> bool {
        if !visited.contains(&tid) {
            visited.insert(tid);
            rec_stack.insert(tid);
            if let Some(targets) = self.graph.get(&tid) {
                for &t in targets {
                    if !visited.contains(&t) && self.is_cyclic(t, visited, rec_stack) {
                        return true;
                    } else if rec_stack.contains(&t) {
                        return true;
                    }
                }
            }
        }
        rec_stack.remove(&tid);
        false
    }
}
