//! Canvas interaction and navigation functionality.
//!
//! This module handles canvas panning, zooming, node dragging, connection drawing,
//! hit testing and coordinate transformations between screen and world space.

use super::state::{AxisDrag, DiagramApp, DragAxis, InteractionMode};
use crate::constants::*;
use crate::routing::{node_radius_for_width, route_edge, EdgePath};
use crate::types::*;
use eframe::egui;

impl DiagramApp {
    /// Converts screen coordinates to world coordinates accounting for zoom and pan.
    pub fn screen_to_world(&self, screen_pos: egui::Pos2) -> egui::Pos2 {
        (screen_pos - self.canvas.offset) / self.canvas.zoom_factor
    }

    /// Converts world coordinates to screen coordinates accounting for zoom and pan.
    pub fn world_to_screen(&self, world_pos: egui::Pos2) -> egui::Pos2 {
        world_pos * self.canvas.zoom_factor + self.canvas.offset
    }

    /// Snaps a position to the nearest grid point.
    pub fn snap_to_grid(&self, pos: egui::Pos2) -> egui::Pos2 {
        egui::pos2(
            (pos.x / GRID_SIZE).round() * GRID_SIZE,
            (pos.y / GRID_SIZE).round() * GRID_SIZE,
        )
    }

    /// Sets the zoom level, keeping the world point under `anchor` fixed on screen.
    ///
    /// The zoom is clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`].
    pub fn zoom_around(&mut self, anchor: egui::Pos2, zoom: f32) {
        let world_anchor = self.screen_to_world(anchor);
        self.canvas.zoom_factor = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let moved = self.world_to_screen(world_anchor);
        self.canvas.offset += anchor - moved;
    }

    /// Sets the zoom level around the centre of the canvas.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom_around(self.canvas.rect.center(), zoom);
    }

    /// Zooms in one toolbar step.
    pub fn zoom_in(&mut self) {
        self.set_zoom(self.canvas.zoom_factor * ZOOM_STEP);
    }

    /// Zooms out one toolbar step.
    pub fn zoom_out(&mut self) {
        self.set_zoom(self.canvas.zoom_factor / ZOOM_STEP);
    }

    /// Pans so that `world` is at the centre of the canvas.
    pub fn center_view_on(&mut self, world: egui::Pos2) {
        self.canvas.offset = self.canvas.rect.center().to_vec2() - world.to_vec2() * self.canvas.zoom_factor;
    }

    /// Zooms and pans so every node is visible, leaving [`FIT_VIEW_PADDING`] of
    /// the canvas empty around the diagram.
    pub fn fit_view(&mut self) {
        let Some((min, max)) = self.diagram.bounds() else {
            self.canvas.zoom_factor = 1.0;
            self.center_view_on(egui::Pos2::ZERO);
            return;
        };
        let world = egui::Rect::from_min_max(egui::pos2(min.0, min.1), egui::pos2(max.0, max.1));
        let available = self.canvas.rect.size() * (1.0 - 2.0 * FIT_VIEW_PADDING);
        let zoom = (available.x / world.width().max(1.0)).min(available.y / world.height().max(1.0));

        self.canvas.zoom_factor = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.center_view_on(world.center());
        log::debug!("view: fit {} node(s) at zoom {:.2}", self.diagram.nodes.len(), self.canvas.zoom_factor);
    }

    /// Handles canvas panning with the middle button, Cmd/Ctrl+primary drag, or a
    /// primary drag in pan mode.
    pub fn handle_canvas_panning(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let pan_mode = self.mode == InteractionMode::Pan;
        let should_pan = ui.input(|i| {
            i.pointer.middle_down()
                || (i.pointer.primary_down() && (i.modifiers.command || pan_mode))
        }) && !self.interaction.gesture_in_progress();

        if should_pan {
            if let Some(current_pos) = response.interact_pointer_pos() {
                if !self.interaction.is_panning {
                    self.interaction.is_panning = true;
                    self.interaction.last_pan_pos = Some(current_pos);
                } else if let Some(last_pos) = self.interaction.last_pan_pos {
                    self.canvas.offset += current_pos - last_pos;
                    self.interaction.last_pan_pos = Some(current_pos);
                }
            }
        } else {
            self.interaction.is_panning = false;
            self.interaction.last_pan_pos = None;
        }
    }

    /// Handles scroll wheel zooming around the cursor, only while it is over the canvas.
    pub fn handle_canvas_zoom(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let scroll_delta = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll_delta == 0.0 {
            return;
        }

        let mouse_pos = ui
            .input(|i| i.pointer.hover_pos())
            .or_else(|| response.interact_pointer_pos());
        if let Some(mouse_pos) = mouse_pos {
            if !response.rect.contains(mouse_pos) {
                return;
            }
            let zoom_delta = if scroll_delta > 0.0 { 0.025 } else { -0.025 };
            self.zoom_around(mouse_pos, self.canvas.zoom_factor + zoom_delta);
        }
    }

    /// Handles node dragging, axis-locked dragging, edge endpoint dragging and
    /// Shift+drag connection drawing with the primary button.
    pub fn handle_node_dragging(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        if self.mode == InteractionMode::Pan {
            return;
        }

        if ui.input(|i| i.pointer.primary_down()) && !self.interaction.is_panning {
            let Some(current_pos) = response.interact_pointer_pos() else {
                return;
            };
            let world_pos = self.screen_to_world(current_pos);

            if !self.interaction.gesture_in_progress() {
                self.start_pointer_gesture(ui, current_pos, world_pos);
            } else if let Some(drag) = self.interaction.axis_drag {
                self.update_axis_drag(drag, world_pos);
            } else if let Some(dragging_id) = self.interaction.dragging_node {
                let snap = ui.input(|i| i.modifiers.shift);
                self.update_dragged_node_position(dragging_id, world_pos, snap);
            } else if self.interaction.drawing_connection_from.is_some() {
                self.interaction.connection_draw_pos = Some(current_pos);
            } else if self.interaction.reconnecting_edge.is_some() {
                if self.interaction.connection_draw_pos.is_some()
                    || self.moved_past_click_threshold(self.interaction.reconnect_start_screen_pos, current_pos)
                {
                    self.interaction.connection_draw_pos = Some(current_pos);
                }
            } else if let Some(from) = self.interaction.pending_shift_connection_from {
                if self.moved_past_click_threshold(self.interaction.pending_shift_start_screen_pos, current_pos) {
                    self.interaction.drawing_connection_from = Some(from);
                    self.interaction.connection_draw_pos = Some(current_pos);
                    self.interaction.pending_shift_connection_from = None;
                    self.interaction.pending_shift_start_screen_pos = None;
                }
            }
        } else {
            if self.interaction.drawing_connection_from.is_some() {
                let release = self
                    .interaction
                    .connection_draw_pos
                    .or_else(|| response.interact_pointer_pos());
                if let Some(pos) = release {
                    self.finalize_connection(self.screen_to_world(pos));
                }
            }

            // An endpoint press that never moved is just a click on the edge.
            if let Some(edge_id) = self.interaction.reconnecting_edge.take() {
                if let Some(pos) = self.interaction.connection_draw_pos {
                    self.finalize_reconnect(edge_id, self.screen_to_world(pos));
                }
            }
            self.interaction.reconnect_start_screen_pos = None;

            // A shift-click that never became a drag just selects the node.
            if let Some((node_id, _)) = self.interaction.pending_shift_connection_from.take() {
                self.interaction.select_node(node_id);
            }
            self.interaction.pending_shift_start_screen_pos = None;

            if let Some(drag) = self.interaction.axis_drag.take() {
                self.record_node_movement(drag.node, drag.start_position);
                self.interaction.axis_readout_until = Some(self.frame_time + AXIS_READOUT_DURATION);
            }

            if let (Some(id), Some(old_pos)) = (
                self.interaction.dragging_node,
                self.interaction.drag_original_position,
            ) {
                self.record_node_movement(id, old_pos);
            }

            self.interaction.dragging_node = None;
            self.interaction.drag_original_position = None;
            self.interaction.drawing_connection_from = None;
            self.interaction.connection_draw_pos = None;
        }
    }

    /// Decides what a fresh primary press starts. Axis arrows of the selected
    /// node win over edge endpoints, which win over node bodies.
    fn start_pointer_gesture(&mut self, ui: &egui::Ui, current_pos: egui::Pos2, world_pos: egui::Pos2) {
        if let Some(axis) = self.find_axis_arrow_at(world_pos) {
            if let Some(node) = self.interaction.selected_node.and_then(|id| self.diagram.node(id)) {
                self.interaction.axis_readout_until = None;
                self.interaction.axis_drag = Some(AxisDrag {
                    node: node.id,
                    axis,
                    start_pointer: world_pos,
                    start_position: node.position,
                });
            }
        } else if let Some(edge_id) = self.find_edge_endpoint_at(world_pos) {
            self.interaction.select_edge(edge_id);
            self.interaction.reconnecting_edge = Some(edge_id);
            self.interaction.reconnect_start_screen_pos = Some(current_pos);
        } else if let Some(node_id) = self.find_node_at_position(world_pos) {
            if ui.input(|i| i.modifiers.shift) {
                let handle = self
                    .diagram
                    .node(node_id)
                    .map(|n| n.nearest_source_handle(world_pos.y))
                    .unwrap_or(0);
                self.interaction.pending_shift_connection_from = Some((node_id, handle));
                self.interaction.pending_shift_start_screen_pos = Some(current_pos);
            } else {
                self.start_node_drag(node_id, world_pos);
            }
        }
    }

    fn moved_past_click_threshold(&self, start: Option<egui::Pos2>, current_pos: egui::Pos2) -> bool {
        start.is_some_and(|start| {
            (self.screen_to_world(current_pos) - self.screen_to_world(start)).length() >= CLICK_THRESHOLD
        })
    }

    /// Moves the node of an axis drag along its locked axis only.
    fn update_axis_drag(&mut self, drag: AxisDrag, world_pos: egui::Pos2) {
        let delta = world_pos - drag.start_pointer;
        let (x, y) = drag.start_position;
        let position = match drag.axis {
            DragAxis::X => (x + delta.x, y),
            DragAxis::Y => (x, y + delta.y),
        };
        if let Some(node) = self.diagram.node_mut(drag.node) {
            node.position = position;
        }
    }

    /// Whether the coordinate readout of the axis control should be shown.
    pub fn axis_readout_visible(&self) -> bool {
        self.interaction.axis_drag.is_some()
            || self
                .interaction
                .axis_readout_until
                .is_some_and(|until| self.frame_time < until)
    }

    /// Starts dragging the specified node and selects it.
    fn start_node_drag(&mut self, node_id: NodeId, world_pos: egui::Pos2) {
        self.interaction.dragging_node = Some(node_id);
        self.interaction.select_node(node_id);

        if let Some(node) = self.diagram.node(node_id) {
            let center = egui::pos2(node.position.0, node.position.1);
            self.interaction.node_drag_offset = center - world_pos;
            self.interaction.drag_original_position = Some(node.position);
        }
    }

    /// Moves the dragged node, snapping to the grid when `snap` is set.
    fn update_dragged_node_position(&mut self, node_id: NodeId, world_pos: egui::Pos2, snap: bool) {
        let mut new_pos = world_pos + self.interaction.node_drag_offset;
        if snap {
            new_pos = self.snap_to_grid(new_pos);
        }
        if let Some(node) = self.diagram.node_mut(node_id) {
            node.position = (new_pos.x, new_pos.y);
        }
    }

    /// Records a finished drag in the history if the node actually moved.
    fn record_node_movement(&mut self, node_id: NodeId, old_position: (f32, f32)) {
        if let Some(node) = self.diagram.node(node_id) {
            if node.position != old_position {
                log::debug!("node {node_id} moved to {:?}", node.position);
                self.record_change();
            }
        }
    }

    /// Finishes a connection gesture at `world_pos`.
    ///
    /// Released over another node, the nearest handles are connected. Released on
    /// empty canvas, a new activity node is created there and connected.
    pub fn finalize_connection(&mut self, world_pos: egui::Pos2) {
        let Some((from_id, source_handle)) = self.interaction.drawing_connection_from else {
            return;
        };

        let (target_id, target_handle) = match self.find_node_at_position(world_pos) {
            Some(to_id) => {
                let handle = self
                    .diagram
                    .node(to_id)
                    .map(|n| n.nearest_target_handle(world_pos.y))
                    .unwrap_or(0);
                (to_id, handle)
            }
            None => {
                let id = self.ids.next_id();
                let node = DiagramNode::new(
                    id,
                    id.to_string(),
                    (world_pos.x, world_pos.y),
                    NodeKind::activity(),
                );
                self.diagram.add_node(node);
                log::debug!("connect: created node {id} at connection end");
                (id, 0)
            }
        };

        match self
            .diagram
            .connect(from_id, target_id, Some(source_handle), Some(target_handle))
        {
            Ok(edge_id) => {
                log::debug!("connect: {from_id}:{source_handle} -> {target_id}:{target_handle}");
                self.interaction.select_edge(edge_id);
                self.record_change();
            }
            Err(err) => log::info!("connect: rejected, {err}"),
        }
    }

    /// Finishes dragging an edge's target end at `world_pos`.
    ///
    /// Released over a node, the edge is moved to that node's nearest target
    /// handle. Released on empty canvas, the edge is removed.
    pub fn finalize_reconnect(&mut self, edge_id: EdgeId, world_pos: egui::Pos2) {
        match self.find_node_at_position(world_pos) {
            Some(target) => {
                let handle = self
                    .diagram
                    .node(target)
                    .map(|n| n.nearest_target_handle(world_pos.y))
                    .unwrap_or(0);
                match self.diagram.reconnect(edge_id, target, Some(handle)) {
                    Ok(()) => {
                        log::debug!("reconnect: edge {edge_id} -> {target}:{handle}");
                        self.interaction.select_edge(edge_id);
                        self.record_change();
                    }
                    Err(err) => log::info!("reconnect: rejected, {err}"),
                }
            }
            None => {
                if self.diagram.remove_edge(edge_id).is_ok() {
                    log::debug!("reconnect: edge {edge_id} dropped on canvas, removed");
                    if self.interaction.selected_edge == Some(edge_id) {
                        self.interaction.clear_selection();
                    }
                    self.record_change();
                }
            }
        }
    }

    /// Finds the topmost edge whose target end lies within [`ENDPOINT_GRAB_RADIUS`].
    pub fn find_edge_endpoint_at(&self, pos: egui::Pos2) -> Option<EdgeId> {
        self.diagram.edges.iter().rev().find_map(|edge| {
            let target = self.diagram.node(edge.target)?;
            let (x, y) = target.target_anchor(edge.target_handle);
            (egui::pos2(x, y).distance(pos) <= ENDPOINT_GRAB_RADIUS).then_some(edge.id)
        })
    }

    /// Finds the axis arrow of the selected node under a world position.
    pub fn find_axis_arrow_at(&self, pos: egui::Pos2) -> Option<DragAxis> {
        let node = self.diagram.node(self.interaction.selected_node?)?;
        [DragAxis::X, DragAxis::Y].into_iter().find(|axis| {
            let center = axis_arrow_center(node, *axis);
            let (along, across) = match axis {
                DragAxis::X => ((pos.x - center.x).abs(), (pos.y - center.y).abs()),
                DragAxis::Y => ((pos.y - center.y).abs(), (pos.x - center.x).abs()),
            };
            along <= AXIS_ARROW_LENGTH / 2.0 && across <= AXIS_ARROW_WIDTH / 2.0 + 2.0
        })
    }

    /// Finds the topmost node at the given world position, if any.
    pub fn find_node_at_position(&self, pos: egui::Pos2) -> Option<NodeId> {
        self.diagram
            .nodes
            .iter()
            .rev()
            .find(|n| n.contains((pos.x, pos.y)))
            .map(|n| n.id)
    }

    /// Routed path of an edge in world space, or `None` if an endpoint is missing.
    pub fn edge_path(&self, edge: &Edge) -> Option<EdgePath> {
        let source = self.diagram.node(edge.source)?;
        let target = self.diagram.node(edge.target)?;
        Some(route_edge(
            self.config.edge_style,
            source.source_anchor(edge.source_handle),
            target.target_anchor(edge.target_handle),
            node_radius_for_width(source.size().0),
            self.config.corner_radius,
        ))
    }

    /// Finds the topmost edge passing within [`CLICK_THRESHOLD`] of a world position.
    pub fn find_edge_at_position(&self, pos: egui::Pos2) -> Option<EdgeId> {
        self.diagram.edges.iter().rev().find_map(|edge| {
            let points = self.edge_path(edge)?.points();
            let hit = points.windows(2).any(|segment| {
                let a = egui::pos2(segment[0].0, segment[0].1);
                let b = egui::pos2(segment[1].0, segment[1].1);
                point_to_line_distance(pos, a, b) < CLICK_THRESHOLD
            });
            hit.then_some(edge.id)
        })
    }

    /// Creates a node of the given kind at the context menu position and selects it.
    pub fn create_node_at_pos(&mut self, kind: NodeKind) -> NodeId {
        let id = self.ids.next_id();
        let node = DiagramNode::new(id, id.to_string(), self.context_menu.world_pos, kind);
        log::debug!("node {id} ({}) created", node.kind.type_name());
        self.diagram.add_node(node);
        self.interaction.select_node(id);
        self.record_change();
        id
    }
}

/// World position of the middle of a node's axis arrow. The x arrow sits to
/// the right of the node, the y arrow above it.
pub fn axis_arrow_center(node: &DiagramNode, axis: DragAxis) -> egui::Pos2 {
    let (w, h) = node.size();
    let (x, y) = node.position;
    let reach = AXIS_ARROW_GAP + AXIS_ARROW_LENGTH / 2.0;
    match axis {
        DragAxis::X => egui::pos2(x + w / 2.0 + reach, y),
        DragAxis::Y => egui::pos2(x, y - h / 2.0 - reach),
    }
}

/// Distance from a point to a line segment.
pub fn point_to_line_distance(point: egui::Pos2, line_start: egui::Pos2, line_end: egui::Pos2) -> f32 {
    let line_vec = line_end - line_start;
    let point_vec = point - line_start;
    let line_len_sq = line_vec.length_sq();

    if line_len_sq < 0.0001 {
        return point_vec.length();
    }

    let t = (point_vec.dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
    (point - (line_start + line_vec * t)).length()
}
