//! Page-level shared/exclusive locking with wait-for-graph deadlock
//! detection. All state lives behind one coarse mutex, per spec.md §4.3 —
//! contention at this scale is cheaper than the bookkeeping a finer-grained
//! scheme would need, and a single monitor makes the deadlock invariant
//! ("the wait-for graph is acyclic after every operation") easy to reason
//! about.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use ::log::{debug, warn};

use crate::error::SmallError;
use crate::page_id::PageId;
use crate::transaction_id::TransactionID;
use crate::wait_for_graph::WaitForGraph;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LockKind {
    Shared,
    Exclusive,
}

struct State {
    exclusive: HashMap<PageId, TransactionID>,
    shared: HashMap<PageId, HashSet<TransactionID>>,
    wait_for: WaitForGraph,
}

pub struct LockManager {
    state: Mutex<State>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                exclusive: HashMap::new(),
                shared: HashMap::new(),
                wait_for: WaitForGraph::new(),
            }),
        }
    }

    /// Non-blocking attempt to acquire `kind` on `pid` for `tid`. Returns
    /// `Ok(true)` if the lock was granted, `Ok(false)` if the caller should
    /// retry (a wait edge has been recorded), or `Err(TransactionAborted)`
    /// if granting the wait edge would create a cycle in the wait-for
    /// graph — in which case `tid` must abort.
    pub fn try_acquire(
        &self,
        tid: TransactionID,
        pid: PageId,
        kind: LockKind,
    ) -> Result<bool, SmallError> {
        let mut state = self.state.lock().unwrap();
        match kind {
            LockKind::Shared => state.try_acquire_shared(tid, pid),
            LockKind::Exclusive => state.try_acquire_exclusive(tid, pid),
        }
    }

    pub fn holds_lock(&self, tid: TransactionID, pid: PageId) -> bool {
        let state = self.state.lock().unwrap();
        state.exclusive.get(&pid) == Some(&tid)
            || state.shared.get(&pid).map_or(false, |s| s.contains(&tid))
    }

    /// Releases every lock `tid` holds on any page. Part of
    /// `transactionComplete` — strict 2PL never releases locks early.
    pub fn finish_transaction(&self, tid: TransactionID) {
        let mut state = self.state.lock().unwrap();
        state.exclusive.retain(|_, holder| *holder != tid);
        for holders in state.shared.values_mut() {
            holders.remove(&tid);
        }
        state.shared.retain(|_, holders| !holders.is_empty());
    }

    /// Purges `tid` from the wait-for graph, both as a waiter and as
    /// something other transactions wait on.
    pub fn remove_dependency(&self, tid: TransactionID) {
        let mut state = self.state.lock().unwrap();
        state.wait_for.remove_transaction(tid);
    }
}

impl State {
    fn try_acquire_shared(&mut self, tid: TransactionID, pid: PageId) -> Result<bool, SmallError> {
        if let Some(&holder) = self.exclusive.get(&pid) {
            if holder != tid {
                return self.wait_or_abort(tid, holder, pid, LockKind::Shared);
            }
            // tid holds the exclusive lock itself; a shared request is
            // trivially satisfied by that.
            return Ok(true);
        }

        self.shared.entry(pid).or_insert_with(HashSet::new).insert(tid);
        self.wait_for.remove_edges_from(tid);
        Ok(true)
    }

    fn try_acquire_exclusive(&mut self, tid: TransactionID, pid: PageId) -> Result<bool, SmallError> {
        if let Some(&holder) = self.exclusive.get(&pid) {
            if holder != tid {
                return self.wait_or_abort(tid, holder, pid, LockKind::Exclusive);
            }
            return Ok(true);
        }

        let holders = self.shared.get(&pid).cloned().unwrap_or_default();
        if holders.is_empty() {
            self.exclusive.insert(pid, tid);
            self.wait_for.remove_edges_from(tid);
            return Ok(true);
        }
        if holders.len() == 1 && holders.contains(&tid) {
            self.shared.remove(&pid);
            self.exclusive.insert(pid, tid);
            self.wait_for.remove_edges_from(tid);
            return Ok(true);
        }

        // Multiple shared holders (or one holder that isn't us): check
        // every one of them for a would-be cycle before recording any
        // wait edge, so a doomed acquire never partially pollutes the
        // graph.
        let others: Vec<TransactionID> = holders.into_iter().filter(|&h| h != tid).collect();
        for &holder in &others {
            if self.wait_for.would_cycle(tid, holder) {
                warn!(
                    "deadlock detected: tx {:?} acquiring X on {:?} would cycle through {:?}",
                    tid, pid, holder
                );
                let err = SmallError::transaction_aborted(&format!(
                    "deadlock detected acquiring exclusive lock on {:?}",
                    pid
                ));
                err.show_backtrace();
                return Err(err);
            }
        }
        for holder in others {
            self.wait_for.add_edge(tid, holder);
        }
        Ok(false)
    }

    fn wait_or_abort(
        &mut self,
        tid: TransactionID,
        holder: TransactionID,
        pid: PageId,
        kind: LockKind,
    ) -> Result<bool, SmallError> {
        if self.wait_for.would_cycle(tid, holder) {
            warn!(
                "deadlock detected: tx {:?} acquiring {:?} on {:?} would cycle through {:?}",
                tid, kind, pid, holder
            );
            let err = SmallError::transaction_aborted(&format!(
                "deadlock detected acquiring {:?} lock on {:?}",
                kind, pid
            ));
            err.show_backtrace();
            return Err(err);
        }
        debug!("tx {:?} waits for tx {:?} on page {:?}", tid, holder, pid);
        self.wait_for.add_edge(tid, holder);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: usize) -> PageId {
        PageId::new(1, n)
    }

    #[test]
    fn shared_locks_from_distinct_transactions_coexist() {
        let lm = LockManager::new();
        let t1 = TransactionID::new();
        let t2 = TransactionID::new();
        assert_eq!(lm.try_acquire(t1, pid(0), LockKind::Shared).unwrap(), true);
        assert_eq!(lm.try_acquire(t2, pid(0), LockKind::Shared).unwrap(), true);
    }

    #[test]
    fn exclusive_blocks_other_transactions() {
        let lm = LockManager::new();
        let t1 = TransactionID::new();
        let t2 = TransactionID::new();
        assert_eq!(lm.try_acquire(t1, pid(0), LockKind::Exclusive).unwrap(), true);
        assert_eq!(lm.try_acquire(t2, pid(0), LockKind::Shared).unwrap(), false);
    }

    #[test]
    fn shared_to_exclusive_upgrade_succeeds_alone() {
        let lm = LockManager::new();
        let t1 = TransactionID::new();
        assert_eq!(lm.try_acquire(t1, pid(0), LockKind::Shared).unwrap(), true);
        assert_eq!(lm.try_acquire(t1, pid(0), LockKind::Exclusive).unwrap(), true);
    }

    #[test]
    fn direct_cycle_aborts_one_side() {
        let lm = LockManager::new();
        let t1 = TransactionID::new();
        let t2 = TransactionID::new();
        assert_eq!(lm.try_acquire(t1, pid(1), LockKind::Exclusive).unwrap(), true);
        assert_eq!(lm.try_acquire(t2, pid(2), LockKind::Exclusive).unwrap(), true);
        // t1 waits on t2
        assert_eq!(lm.try_acquire(t1, pid(2), LockKind::Exclusive).unwrap(), false);
        // t2 -> t1 would close the cycle
        let result = lm.try_acquire(t2, pid(1), LockKind::Exclusive);
        assert!(result.is_err());
    }

    #[test]
    fn finish_transaction_releases_all_locks() {
        let lm = LockManager::new();
        let t1 = TransactionID::new();
        let t2 = TransactionID::new();
        lm.try_acquire(t1, pid(0), LockKind::Exclusive).unwrap();
        lm.finish_transaction(t1);
        assert!(!lm.holds_lock(t1, pid(0)));
        assert_eq!(lm.try_acquire(t2, pid(0), LockKind::Exclusive).unwrap(), true);
    }
}
