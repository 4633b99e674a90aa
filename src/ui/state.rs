//! Application state management structures.
//!
//! This module contains the state structures that track the editor's current UI
//! state (canvas navigation, user interactions and the context menu) together
//! with the main [`DiagramApp`].

use super::overlays::FrameStats;
use crate::config::EditorConfig;
use crate::history::HistoryManager;
use crate::types::*;
use eframe::egui;
use std::time::Duration;

/// What a primary-button drag on empty canvas does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// Drag nodes, click to select
    #[default]
    Select,
    /// Drag pans the view
    Pan,
}

/// Axis a node is constrained to while dragging one of its axis arrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragAxis {
    /// Horizontal arrow, moves along x only
    X,
    /// Vertical arrow, moves along y only
    Y,
}

/// A single-axis drag started from an axis arrow of the selected node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisDrag {
    /// Node being moved
    pub node: NodeId,
    /// Axis the movement is locked to
    pub axis: DragAxis,
    /// World position of the pointer when the drag started
    pub start_pointer: egui::Pos2,
    /// Node position when the drag started
    pub start_position: (f32, f32),
}

/// State related to canvas navigation and display.
pub struct CanvasState {
    /// Current canvas pan offset (in screen space)
    pub offset: egui::Vec2,
    /// Current zoom level (1.0 = normal, 2.0 = 2x zoom, 0.5 = 50% zoom)
    pub zoom_factor: f32,
    /// Screen rectangle the canvas occupied on the last frame
    pub rect: egui::Rect,
    /// Whether the origin has been centred in the canvas yet
    pub centered: bool,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            offset: egui::Vec2::ZERO,
            zoom_factor: 1.0,
            rect: egui::Rect::NOTHING,
            centered: false,
        }
    }
}

/// State related to user interactions with nodes, edges and the canvas.
#[derive(Default)]
pub struct InteractionState {
    /// Currently selected node, if any
    pub selected_node: Option<NodeId>,
    /// Currently selected edge, if any
    pub selected_edge: Option<EdgeId>,
    /// Node currently being dragged by the user
    pub dragging_node: Option<NodeId>,
    /// Node position before the drag started
    pub drag_original_position: Option<(f32, f32)>,
    /// Offset from mouse to node center during dragging
    pub node_drag_offset: egui::Vec2,
    /// Whether the user is currently panning the canvas
    pub is_panning: bool,
    /// Last mouse position during panning operation
    pub last_pan_pos: Option<egui::Pos2>,
    /// Node and exit handle a connection is being drawn from
    pub drawing_connection_from: Option<(NodeId, usize)>,
    /// Current mouse position while drawing a connection
    pub connection_draw_pos: Option<egui::Pos2>,
    /// Shift-press on a node that becomes a connection once dragged far enough
    pub pending_shift_connection_from: Option<(NodeId, usize)>,
    /// Screen position of the pending shift-press
    pub pending_shift_start_screen_pos: Option<egui::Pos2>,
    /// Edge whose target end is being dragged to another node
    pub reconnecting_edge: Option<EdgeId>,
    /// Screen position where the endpoint drag started
    pub reconnect_start_screen_pos: Option<egui::Pos2>,
    /// Single-axis drag from the axis arrows of the selected node
    pub axis_drag: Option<AxisDrag>,
    /// Host time until which the coordinate readout stays visible after an axis drag
    pub axis_readout_until: Option<Duration>,
    /// Node whose label is being edited in the node manager
    pub renaming_node: Option<NodeId>,
    /// Label text while renaming
    pub temp_node_name: String,
}

impl InteractionState {
    /// Clears node and edge selection.
    pub fn clear_selection(&mut self) {
        self.selected_node = None;
        self.selected_edge = None;
    }

    /// Selects a single node.
    pub fn select_node(&mut self, id: NodeId) {
        self.selected_node = Some(id);
        self.selected_edge = None;
    }

    /// Selects a single edge.
    pub fn select_edge(&mut self, id: EdgeId) {
        self.selected_node = None;
        self.selected_edge = Some(id);
    }

    /// Cancels any drag, pan or connection gesture in progress.
    pub fn cancel_gestures(&mut self) {
        self.dragging_node = None;
        self.drag_original_position = None;
        self.drawing_connection_from = None;
        self.connection_draw_pos = None;
        self.pending_shift_connection_from = None;
        self.pending_shift_start_screen_pos = None;
        self.reconnecting_edge = None;
        self.reconnect_start_screen_pos = None;
        self.axis_drag = None;
    }

    /// Whether any pointer gesture on the canvas is under way.
    pub fn gesture_in_progress(&self) -> bool {
        self.dragging_node.is_some()
            || self.drawing_connection_from.is_some()
            || self.pending_shift_connection_from.is_some()
            || self.reconnecting_edge.is_some()
            || self.axis_drag.is_some()
    }
}

/// State of the right-click menu for creating new nodes.
#[derive(Default)]
pub struct ContextMenuState {
    /// Whether the context menu is currently visible
    pub show: bool,
    /// Screen position where the context menu should appear
    pub screen_pos: (f32, f32),
    /// World position where nodes should be created from context menu
    pub world_pos: (f32, f32),
    /// Prevents the menu from closing on the click that opened it
    pub just_opened: bool,
}

/// The main application structure containing UI state and the diagram.
///
/// This struct implements the `eframe::App` trait and handles all user interface
/// rendering and interaction logic.
pub struct DiagramApp {
    /// The scene being edited
    pub diagram: Diagram,
    /// Snapshot history of the scene
    pub history: HistoryManager<DiagramNode, Edge>,
    /// Source of fresh node identifiers
    pub ids: NodeIdGenerator,
    /// Canvas navigation state
    pub canvas: CanvasState,
    /// User interaction state
    pub interaction: InteractionState,
    /// Context menu state
    pub context_menu: ContextMenuState,
    /// Persisted preferences
    pub config: EditorConfig,
    /// Select or pan behaviour of primary drags
    pub mode: InteractionMode,
    /// Frame timing for the resource monitor
    pub stats: FrameStats,
    /// Host clock at the start of the current frame, drives history debouncing
    pub frame_time: Duration,
}

impl Default for DiagramApp {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl DiagramApp {
    /// Creates an editor showing the initial scene.
    pub fn new(config: EditorConfig) -> Self {
        let diagram = Diagram::initial();
        let mut history =
            HistoryManager::new(&diagram.nodes, &diagram.edges, config.max_history_size);
        history.set_debounce_delay(config.debounce_delay());
        let mut ids = NodeIdGenerator::new(1);
        ids.reserve_past(&diagram.nodes);

        log::info!(
            "editor: starting with {} node(s), history of {} snapshot(s)",
            diagram.nodes.len(),
            history.max_history_size()
        );

        Self {
            diagram,
            history,
            ids,
            canvas: CanvasState::default(),
            interaction: InteractionState::default(),
            context_menu: ContextMenuState::default(),
            config,
            mode: InteractionMode::default(),
            stats: FrameStats::default(),
            frame_time: Duration::ZERO,
        }
    }
}
