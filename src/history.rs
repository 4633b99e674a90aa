//! Snapshot-based undo/redo history.
//!
//! The [`HistoryManager`] keeps a bounded, linear stack of full scene snapshots
//! (nodes + edges) and a pointer to the current one. Rapid edits can be coalesced
//! through a trailing-edge debounce whose pending save is an explicit value owned
//! by the manager and driven by the host's clock through [`HistoryManager::poll`].
//!
//! The manager is independent of any UI toolkit; the editor binds it to the
//! scene in `ui::undo`.

use crate::constants::{DEFAULT_DEBOUNCE_DELAY, DEFAULT_MAX_HISTORY_SIZE};
use std::time::Duration;

/// A point-in-time copy of the full node and edge collections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneSnapshot<N, E> {
    /// Nodes in scene order
    pub nodes: Vec<N>,
    /// Edges in scene order
    pub edges: Vec<E>,
}

impl<N: Clone, E: Clone> SceneSnapshot<N, E> {
    /// Copies the given collections into a new snapshot.
    pub fn capture(nodes: &[N], edges: &[E]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
        }
    }
}

impl<N, E> SceneSnapshot<N, E> {
    /// Bytes taken by the snapshot's node and edge values, not counting heap
    /// data they own.
    pub fn inline_bytes(&self) -> usize {
        self.nodes.len() * std::mem::size_of::<N>() + self.edges.len() * std::mem::size_of::<E>()
    }
}

/// A save scheduled by [`HistoryManager::debounced_save_state`].
#[derive(Debug, Clone)]
struct PendingSave<N, E> {
    /// Host-clock time at which the save is committed
    due: Duration,
    snapshot: SceneSnapshot<N, E>,
}

/// Bounded undo/redo stack of scene snapshots.
#[derive(Debug, Clone)]
pub struct HistoryManager<N, E> {
    history: Vec<SceneSnapshot<N, E>>,
    current_index: usize,
    max_history_size: usize,
    debounce_delay: Duration,
    pending: Option<PendingSave<N, E>>,
}

impl<N: Clone, E: Clone> Default for HistoryManager<N, E> {
    fn default() -> Self {
        Self::new(&[], &[], DEFAULT_MAX_HISTORY_SIZE)
    }
}

impl<N: Clone, E: Clone> HistoryManager<N, E> {
    /// Creates a history seeded with one snapshot of the given scene.
    ///
    /// A `max_history_size` of zero is treated as one, since the stack always
    /// holds the current snapshot.
    pub fn new(initial_nodes: &[N], initial_edges: &[E], max_history_size: usize) -> Self {
        Self {
            history: vec![SceneSnapshot::capture(initial_nodes, initial_edges)],
            current_index: 0,
            max_history_size: max_history_size.max(1),
            debounce_delay: DEFAULT_DEBOUNCE_DELAY,
            pending: None,
        }
    }

    /// Records a new snapshot, discarding any redo branch.
    ///
    /// When the stack is full the oldest snapshot is evicted and the index is
    /// held; otherwise the index advances to the new snapshot.
    pub fn save_state(&mut self, nodes: &[N], edges: &[E]) {
        self.push_snapshot(SceneSnapshot::capture(nodes, edges));
    }

    fn push_snapshot(&mut self, snapshot: SceneSnapshot<N, E>) {
        self.history.truncate(self.current_index + 1);
        self.history.push(snapshot);

        if self.history.len() > self.max_history_size {
            self.history.remove(0);
        } else {
            self.current_index += 1;
        }

        log::debug!(
            "history: saved snapshot {}/{}",
            self.current_index + 1,
            self.history.len()
        );
    }

    /// Schedules a save of the given scene once `debounce_delay` has elapsed
    /// after `now` without another call.
    ///
    /// Any previously pending save is replaced. The scene is copied immediately,
    /// so the pending save commits the arguments of the last call.
    pub fn debounced_save_state(&mut self, nodes: &[N], edges: &[E], now: Duration) {
        self.pending = Some(PendingSave {
            due: now + self.debounce_delay,
            snapshot: SceneSnapshot::capture(nodes, edges),
        });
    }

    /// Commits the pending save if its quiet period has elapsed by `now`.
    ///
    /// Returns `true` when a save was committed.
    pub fn poll(&mut self, now: Duration) -> bool {
        match &self.pending {
            Some(pending) if now >= pending.due => self.flush_pending(),
            _ => false,
        }
    }

    /// Commits the pending save immediately, regardless of its deadline.
    ///
    /// Returns `true` when there was a pending save.
    pub fn flush_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                log::debug!("history: committing debounced save");
                self.push_snapshot(pending.snapshot);
                true
            }
            None => false,
        }
    }

    /// Returns true while a debounced save is waiting to be committed.
    pub fn has_pending_save(&self) -> bool {
        self.pending.is_some()
    }

    /// Host-clock time at which the pending save will be committed, if any.
    pub fn pending_deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Steps back one snapshot.
    ///
    /// # Returns
    ///
    /// A copy of the snapshot that is now current, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<SceneSnapshot<N, E>> {
        if self.current_index > 0 {
            self.current_index -= 1;
            Some(self.current_state())
        } else {
            None
        }
    }

    /// Steps forward one snapshot.
    ///
    /// # Returns
    ///
    /// A copy of the snapshot that is now current, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<SceneSnapshot<N, E>> {
        if self.current_index + 1 < self.history.len() {
            self.current_index += 1;
            Some(self.current_state())
        } else {
            None
        }
    }

    /// Returns true if an older snapshot exists.
    pub fn can_undo(&self) -> bool {
        self.current_index > 0
    }

    /// Returns true if a newer snapshot exists.
    pub fn can_redo(&self) -> bool {
        self.current_index + 1 < self.history.len()
    }

    /// A copy of the current snapshot.
    pub fn current_state(&self) -> SceneSnapshot<N, E> {
        self.history[self.current_index].clone()
    }

    /// Position of the current snapshot within the stack.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Discards all history and reseeds it with one snapshot of the given scene.
    /// Cancels any pending debounced save.
    pub fn clear(&mut self, nodes: &[N], edges: &[E]) {
        self.history = vec![SceneSnapshot::capture(nodes, edges)];
        self.current_index = 0;
        self.pending = None;
    }

    /// Number of retained snapshots.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Estimated memory held by retained snapshots and the pending save.
    ///
    /// See [`SceneSnapshot::inline_bytes`] for what the estimate covers.
    pub fn retained_bytes(&self) -> usize {
        let pending = self.pending.as_ref().map_or(0, |p| p.snapshot.inline_bytes());
        self.history.iter().map(SceneSnapshot::inline_bytes).sum::<usize>() + pending
    }

    /// Upper bound on retained snapshots.
    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// Quiet period used by [`Self::debounced_save_state`].
    pub fn debounce_delay(&self) -> Duration {
        self.debounce_delay
    }

    /// Changes the quiet period for subsequent debounced saves.
    pub fn set_debounce_delay(&mut self, delay: Duration) {
        self.debounce_delay = delay;
    }

    /// Cancels any pending debounced save.
    pub fn destroy(&mut self) {
        if self.pending.take().is_some() {
            log::debug!("history: pending save cancelled");
        }
    }
}
