//! Binds the snapshot history to the editor.
//!
//! Every scene mutation goes through [`DiagramApp::record_change`], which
//! schedules a debounced save. The pending save is committed from the frame loop
//! by [`DiagramApp::tick_history`], or immediately before an undo or redo so the
//! latest edit is never lost.

use super::state::DiagramApp;
use crate::history::SceneSnapshot;
use crate::types::{DiagramNode, Edge};
use eframe::egui;

/// Summary of the history for toolbar and overlay display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStatus {
    /// Whether an older snapshot exists
    pub can_undo: bool,
    /// Whether a newer snapshot exists
    pub can_redo: bool,
    /// Index of the current snapshot
    pub position: usize,
    /// Number of retained snapshots
    pub len: usize,
    /// Whether an edit is waiting for its debounce to elapse
    pub pending: bool,
}

impl DiagramApp {
    /// Records that the scene changed.
    ///
    /// Calculation results are refreshed first so the saved snapshot is consistent.
    pub fn record_change(&mut self) {
        self.diagram.recompute_calculations();
        self.history
            .debounced_save_state(&self.diagram.nodes, &self.diagram.edges, self.frame_time);
    }

    /// Commits a due debounced save and schedules a repaint for a pending one.
    pub fn tick_history(&mut self, ctx: &egui::Context) {
        if self.history.poll(self.frame_time) {
            log::debug!(
                "history: debounced save committed at {:?}",
                self.frame_time
            );
        }
        if let Some(due) = self.history.pending_deadline() {
            ctx.request_repaint_after(due.saturating_sub(self.frame_time));
        }
    }

    /// Returns the state of the history.
    pub fn history_status(&self) -> HistoryStatus {
        HistoryStatus {
            can_undo: self.history.can_undo() || self.history.has_pending_save(),
            can_redo: self.history.can_redo() && !self.history.has_pending_save(),
            position: self.history.current_index(),
            len: self.history.history_len(),
            pending: self.history.has_pending_save(),
        }
    }

    /// Performs an undo operation.
    pub fn perform_undo(&mut self) {
        self.history.flush_pending();
        match self.history.undo() {
            Some(snapshot) => {
                log::info!("undo: restored snapshot {}", self.history.current_index());
                self.apply_snapshot(snapshot);
            }
            None => log::debug!("undo: nothing to undo"),
        }
    }

    /// Performs a redo operation.
    pub fn perform_redo(&mut self) {
        self.history.flush_pending();
        match self.history.redo() {
            Some(snapshot) => {
                log::info!("redo: restored snapshot {}", self.history.current_index());
                self.apply_snapshot(snapshot);
            }
            None => log::debug!("redo: nothing to redo"),
        }
    }

    /// Tears down the history binding when the editor closes. A pending save is
    /// dropped since the scene is not persisted.
    pub fn shutdown(&mut self) {
        self.interaction.cancel_gestures();
        self.history.destroy();
        log::info!(
            "editor: closing with {} node(s), {} snapshot(s)",
            self.diagram.nodes.len(),
            self.history.history_len()
        );
    }

    /// Replaces the scene with a snapshot and drops references to vanished items.
    fn apply_snapshot(&mut self, snapshot: SceneSnapshot<DiagramNode, Edge>) {
        self.diagram.nodes = snapshot.nodes;
        self.diagram.edges = snapshot.edges;
        self.ids.reserve_past(&self.diagram.nodes);

        self.interaction.cancel_gestures();
        if let Some(id) = self.interaction.selected_node {
            if self.diagram.node(id).is_none() {
                self.interaction.selected_node = None;
            }
        }
        if let Some(id) = self.interaction.selected_edge {
            if self.diagram.edge(id).is_none() {
                self.interaction.selected_edge = None;
            }
        }
        if let Some(id) = self.interaction.renaming_node {
            if self.diagram.node(id).is_none() {
                self.interaction.renaming_node = None;
            }
        }
    }
}
