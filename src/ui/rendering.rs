//! Canvas rendering for the grid, routed edges and the three node kinds.

use super::canvas::axis_arrow_center;
use super::state::{DiagramApp, DragAxis};
use crate::constants::*;
use crate::routing::{node_radius_for_width, route_edge};
use crate::types::*;
use eframe::egui;
use eframe::epaint::StrokeKind;

const SELECTED_COLOR: egui::Color32 = egui::Color32::from_rgb(100, 150, 255);

/// Fill colour used for a node kind on the canvas and minimap.
pub fn node_color(kind: &NodeKind) -> egui::Color32 {
    match kind {
        NodeKind::Activity { .. } => egui::Color32::from_rgb(120, 190, 140),
        NodeKind::Calculation { .. } => egui::Color32::from_rgb(230, 180, 90),
        NodeKind::DatabaseSchema { .. } => egui::Color32::from_rgb(120, 160, 220),
    }
}

impl DiagramApp {
    /// Renders all diagram elements on the canvas.
    ///
    /// Elements are drawn in layers: grid first, then edges, then nodes.
    pub fn render_diagram_elements(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        if self.config.show_grid {
            self.draw_grid(painter, canvas_rect);
        }

        let reconnecting = self
            .interaction
            .connection_draw_pos
            .and(self.interaction.reconnecting_edge);
        for edge in &self.diagram.edges {
            if reconnecting == Some(edge.id) {
                continue;
            }
            let is_selected = self.interaction.selected_edge == Some(edge.id);
            self.draw_edge(painter, edge, is_selected);
        }

        if let (Some((from, handle)), Some(draw_pos)) = (
            self.interaction.drawing_connection_from,
            self.interaction.connection_draw_pos,
        ) {
            self.draw_connection_preview(painter, from, handle, draw_pos);
        }
        if let (Some(edge), Some(draw_pos)) = (
            reconnecting.and_then(|id| self.diagram.edge(id)),
            self.interaction.connection_draw_pos,
        ) {
            self.draw_connection_preview(painter, edge.source, edge.source_handle.unwrap_or(0), draw_pos);
        }

        for node in &self.diagram.nodes {
            self.draw_node(painter, node);
        }

        if let Some(node) = self.interaction.selected_node.and_then(|id| self.diagram.node(id)) {
            self.draw_axis_control(painter, node);
        }
    }

    /// Draws the x and y arrows of the selected node, and its coordinates while
    /// an arrow is dragged and shortly after.
    fn draw_axis_control(&self, painter: &egui::Painter, node: &DiagramNode) {
        let zoom = self.canvas.zoom_factor;
        let center = self.world_to_screen(egui::pos2(node.position.0, node.position.1));
        let active = self.interaction.axis_drag.map(|drag| drag.axis);

        for (axis, color) in [
            (DragAxis::X, egui::Color32::from_rgb(255, 80, 80)),
            (DragAxis::Y, egui::Color32::from_rgb(33, 150, 243)),
        ] {
            let color = if active == Some(axis) {
                color
            } else {
                color.gamma_multiply(0.8)
            };
            let direction = match axis {
                DragAxis::X => egui::vec2(1.0, 0.0),
                DragAxis::Y => egui::vec2(0.0, -1.0),
            };
            let arrow_center = self.world_to_screen(axis_arrow_center(node, axis));
            let half_length = AXIS_ARROW_LENGTH / 2.0 * zoom;
            let base = arrow_center - direction * half_length;

            painter.line_segment([center, base], egui::Stroke::new(1.0, color.gamma_multiply(0.5)));
            let perpendicular = egui::vec2(-direction.y, direction.x) * AXIS_ARROW_WIDTH / 2.0 * zoom;
            painter.add(egui::Shape::convex_polygon(
                vec![arrow_center + direction * half_length, base + perpendicular, base - perpendicular],
                color,
                egui::Stroke::new(1.0, egui::Color32::WHITE),
            ));
        }
        painter.circle_filled(center, 3.0, egui::Color32::from_rgb(33, 150, 243));

        if self.axis_readout_visible() {
            let origin = center + egui::vec2(15.0, 15.0);
            let bg = egui::Rect::from_min_size(origin, egui::vec2(100.0, 44.0));
            painter.rect_filled(bg, 8.0, egui::Color32::from_black_alpha(190));
            let font = egui::FontId::monospace(12.0);
            for (i, line) in [
                format!("X: {}", node.position.0.round()),
                format!("Y: {}", node.position.1.round()),
            ]
            .into_iter()
            .enumerate()
            {
                painter.text(
                    origin + egui::vec2(12.0, 8.0 + i as f32 * 16.0),
                    egui::Align2::LEFT_TOP,
                    line,
                    font.clone(),
                    egui::Color32::WHITE,
                );
            }
            if let Some(until) = self.interaction.axis_readout_until {
                painter.ctx().request_repaint_after(until.saturating_sub(self.frame_time));
            }
        }
    }

    /// Draws a zoom-aware grid on the canvas.
    ///
    /// Grid lines are skipped entirely once they would be closer than two pixels.
    pub fn draw_grid(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let screen_grid_size = GRID_SIZE * self.canvas.zoom_factor;
        if screen_grid_size < 2.0 {
            return;
        }

        let stroke = egui::Stroke::new(1.0, egui::Color32::from_rgba_unmultiplied(128, 128, 128, 32));
        let top_left = self.screen_to_world(canvas_rect.min);
        let bottom_right = self.screen_to_world(canvas_rect.max);

        let mut x = (top_left.x / GRID_SIZE).floor() * GRID_SIZE;
        while x <= bottom_right.x {
            let screen_x = self.world_to_screen(egui::pos2(x, 0.0)).x;
            painter.vline(screen_x, canvas_rect.y_range(), stroke);
            x += GRID_SIZE;
        }

        let mut y = (top_left.y / GRID_SIZE).floor() * GRID_SIZE;
        while y <= bottom_right.y {
            let screen_y = self.world_to_screen(egui::pos2(0.0, y)).y;
            painter.hline(canvas_rect.x_range(), screen_y, stroke);
            y += GRID_SIZE;
        }
    }

    /// Renders an edge along its routed path with an arrow head at the target.
    pub fn draw_edge(&self, painter: &egui::Painter, edge: &Edge, is_selected: bool) {
        let Some(path) = self.edge_path(edge) else {
            return;
        };
        let points: Vec<egui::Pos2> = path
            .points()
            .into_iter()
            .map(|(x, y)| self.world_to_screen(egui::pos2(x, y)))
            .collect();

        let (color, width) = if is_selected {
            (SELECTED_COLOR, 3.0)
        } else {
            (egui::Color32::GRAY, 2.0)
        };
        self.draw_polyline_with_arrow(painter, &points, egui::Stroke::new(width, color));
    }

    fn draw_polyline_with_arrow(&self, painter: &egui::Painter, points: &[egui::Pos2], stroke: egui::Stroke) {
        if points.len() < 2 {
            return;
        }
        painter.add(egui::Shape::line(points.to_vec(), stroke));

        let tip = points[points.len() - 1];
        let Some(from) = points.iter().rev().skip(1).find(|p| **p != tip) else {
            return;
        };
        self.draw_arrow_head(painter, tip, (tip - *from).normalized(), stroke.color);
    }

    /// Draws a filled triangle whose point sits at `tip`, facing `direction`.
    fn draw_arrow_head(
        &self,
        painter: &egui::Painter,
        tip: egui::Pos2,
        direction: egui::Vec2,
        color: egui::Color32,
    ) {
        let length = 10.0 * self.canvas.zoom_factor;
        let half_width = 5.0 * self.canvas.zoom_factor;
        let perpendicular = egui::vec2(-direction.y, direction.x);
        let base = tip - direction * length;

        painter.add(egui::Shape::convex_polygon(
            vec![tip, base + perpendicular * half_width, base - perpendicular * half_width],
            color,
            egui::Stroke::NONE,
        ));
    }

    /// Renders the connection being drawn, routed in the current edge style.
    ///
    /// The preview is red while hovering the source node itself.
    pub fn draw_connection_preview(
        &self,
        painter: &egui::Painter,
        from: NodeId,
        handle: usize,
        to_screen_pos: egui::Pos2,
    ) {
        let Some(node) = self.diagram.node(from) else {
            return;
        };
        let to_world = self.screen_to_world(to_screen_pos);
        let is_valid = self.find_node_at_position(to_world) != Some(from);
        let color = if is_valid {
            SELECTED_COLOR
        } else {
            egui::Color32::from_rgb(255, 80, 80)
        };

        let path = route_edge(
            self.config.edge_style,
            node.source_anchor(Some(handle)),
            (to_world.x, to_world.y),
            node_radius_for_width(node.size().0),
            self.config.corner_radius,
        );
        let points: Vec<egui::Pos2> = path
            .points()
            .into_iter()
            .map(|(x, y)| self.world_to_screen(egui::pos2(x, y)))
            .collect();
        painter.add(egui::Shape::line(points, egui::Stroke::new(2.0, color)));
        painter.circle_filled(to_screen_pos, 4.0, color);
    }

    /// Renders a node with its kind-specific body and connection handles.
    pub fn draw_node(&self, painter: &egui::Painter, node: &DiagramNode) {
        let zoom = self.canvas.zoom_factor;
        let center = self.world_to_screen(egui::pos2(node.position.0, node.position.1));
        let (w, h) = node.size();
        let rect = egui::Rect::from_center_size(center, egui::vec2(w, h) * zoom);

        let stroke = if Some(node.id) == self.interaction.dragging_node {
            egui::Stroke::new(3.0, egui::Color32::from_rgb(255, 165, 0))
        } else if Some(node.id) == self.interaction.selected_node {
            egui::Stroke::new(3.0, egui::Color32::YELLOW)
        } else {
            egui::Stroke::new(1.5, egui::Color32::BLACK)
        };
        let fill = node_color(&node.kind);
        let font = |size: f32| egui::FontId::proportional((size * zoom).clamp(6.0, 48.0));
        let text_color = egui::Color32::BLACK;

        match &node.kind {
            NodeKind::Activity { .. } => {
                painter.circle_filled(center, w / 2.0 * zoom, fill);
                painter.circle_stroke(center, w / 2.0 * zoom, stroke);
                painter.text(center, egui::Align2::CENTER_CENTER, &node.label, font(14.0), text_color);
            }
            NodeKind::Calculation { operator, result } => {
                painter.rect_filled(rect, 6.0 * zoom, fill);
                painter.rect_stroke(rect, 6.0 * zoom, stroke, StrokeKind::Outside);
                painter.text(
                    rect.center_top() + egui::vec2(0.0, 6.0 * zoom),
                    egui::Align2::CENTER_TOP,
                    &node.label,
                    font(12.0),
                    text_color,
                );
                painter.text(center, egui::Align2::CENTER_CENTER, operator.symbol(), font(24.0), text_color);
                painter.text(
                    rect.center_bottom() - egui::vec2(0.0, 6.0 * zoom),
                    egui::Align2::CENTER_BOTTOM,
                    format!("= {result}"),
                    font(12.0),
                    text_color,
                );
            }
            NodeKind::DatabaseSchema { table_name, fields } => {
                painter.rect_filled(rect, 4.0 * zoom, fill);
                painter.rect_stroke(rect, 4.0 * zoom, stroke, StrokeKind::Outside);
                let header = egui::Rect::from_min_size(rect.min, egui::vec2(rect.width(), SCHEMA_HEADER_HEIGHT * zoom));
                painter.rect_filled(header, 4.0 * zoom, fill.gamma_multiply(0.8));
                painter.text(header.center(), egui::Align2::CENTER_CENTER, table_name, font(13.0), text_color);

                for (i, field) in fields.iter().enumerate() {
                    let row_y = node.source_anchor(Some(i)).1;
                    let row_center = self.world_to_screen(egui::pos2(node.position.0, row_y));
                    let value = if field.text.is_empty() {
                        format!("<{}>", field.field_type)
                    } else {
                        field.text.clone()
                    };
                    painter.text(
                        egui::pos2(rect.min.x + 8.0 * zoom, row_center.y),
                        egui::Align2::LEFT_CENTER,
                        &field.name,
                        font(11.0),
                        text_color,
                    );
                    painter.text(
                        egui::pos2(rect.max.x - 8.0 * zoom, row_center.y),
                        egui::Align2::RIGHT_CENTER,
                        value,
                        font(11.0),
                        egui::Color32::from_gray(40),
                    );
                }
            }
        }

        self.draw_handles(painter, node);
    }

    fn draw_handles(&self, painter: &egui::Painter, node: &DiagramNode) {
        let radius = HANDLE_RADIUS * self.canvas.zoom_factor;
        let outline = egui::Stroke::new(1.0, egui::Color32::BLACK);

        for i in 0..node.target_handle_count() {
            let (x, y) = node.target_anchor(Some(i));
            let pos = self.world_to_screen(egui::pos2(x, y));
            painter.circle(pos, radius, egui::Color32::WHITE, outline);
        }
        for i in 0..node.source_handle_count() {
            let (x, y) = node.source_anchor(Some(i));
            let pos = self.world_to_screen(egui::pos2(x, y));
            painter.circle(pos, radius, egui::Color32::DARK_GRAY, outline);
        }
    }
}
