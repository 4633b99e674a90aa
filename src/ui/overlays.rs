//! Canvas overlays: the minimap and the resource monitor.

use super::rendering::node_color;
use super::state::DiagramApp;
use crate::constants::*;
use eframe::egui;
use eframe::epaint::StrokeKind;
use std::collections::VecDeque;

/// Rolling frame-time statistics.
///
/// The displayed FPS is an average over the last [`FPS_SAMPLE_WINDOW`] frames and
/// only refreshes every [`FPS_REFRESH_INTERVAL`] frames so the number stays legible.
#[derive(Debug, Default)]
pub struct FrameStats {
    samples: VecDeque<f64>,
    last_time: Option<f64>,
    frames: u64,
    fps: f32,
}

impl FrameStats {
    /// Records the start of a frame at `now` seconds on the host clock.
    pub fn record(&mut self, now: f64) {
        if let Some(last) = self.last_time {
            let dt = now - last;
            if dt > 0.0 {
                self.samples.push_back(dt);
                while self.samples.len() > FPS_SAMPLE_WINDOW {
                    self.samples.pop_front();
                }
            }
        }
        self.last_time = Some(now);
        self.frames += 1;

        if self.frames % FPS_REFRESH_INTERVAL == 0 {
            self.fps = self.average_fps();
        }
    }

    fn average_fps(&self) -> f32 {
        let total: f64 = self.samples.iter().sum();
        if total > 0.0 {
            (self.samples.len() as f64 / total) as f32
        } else {
            0.0
        }
    }

    /// Last displayed frames-per-second value.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Number of frames recorded so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Maps between world coordinates and a minimap rectangle on screen.
#[derive(Debug, Clone, Copy)]
pub struct MinimapProjection {
    world: egui::Rect,
    screen: egui::Rect,
    scale: f32,
}

impl MinimapProjection {
    /// Fits `world` into `screen`, preserving aspect ratio and centring it.
    pub fn new(world: egui::Rect, screen: egui::Rect) -> Self {
        let world = if world.width() > 0.0 && world.height() > 0.0 {
            world
        } else {
            egui::Rect::from_center_size(world.center(), egui::vec2(1.0, 1.0))
        };
        let scale = (screen.width() / world.width()).min(screen.height() / world.height());
        Self {
            world,
            screen,
            scale,
        }
    }

    /// Minimap position of a world point.
    pub fn to_minimap(&self, world: egui::Pos2) -> egui::Pos2 {
        self.screen.center() + (world - self.world.center()) * self.scale
    }

    /// World point under a minimap position.
    pub fn to_world(&self, minimap: egui::Pos2) -> egui::Pos2 {
        self.world.center() + (minimap - self.screen.center()) / self.scale
    }

    /// Minimap rectangle of a world rectangle.
    pub fn rect_to_minimap(&self, world: egui::Rect) -> egui::Rect {
        egui::Rect::from_two_pos(self.to_minimap(world.min), self.to_minimap(world.max))
    }
}

impl DiagramApp {
    /// World rectangle currently visible in the canvas.
    pub fn visible_world_rect(&self) -> egui::Rect {
        egui::Rect::from_two_pos(
            self.screen_to_world(self.canvas.rect.min),
            self.screen_to_world(self.canvas.rect.max),
        )
    }

    /// Draws the minimap in the bottom-right corner of the canvas.
    ///
    /// Clicking or dragging inside it recentres the view on that point.
    pub fn draw_minimap(&mut self, ui: &mut egui::Ui, canvas_rect: egui::Rect) {
        let size = egui::vec2(MINIMAP_SIZE.0, MINIMAP_SIZE.1);
        let rect = egui::Rect::from_min_size(canvas_rect.max - size - egui::vec2(10.0, 10.0), size);
        if !canvas_rect.contains_rect(rect) {
            return;
        }

        let viewport = self.visible_world_rect();
        let world = match self.diagram.bounds() {
            Some((min, max)) => viewport.union(egui::Rect::from_min_max(
                egui::pos2(min.0, min.1),
                egui::pos2(max.0, max.1),
            )),
            None => viewport,
        }
        .expand(GRID_SIZE);
        let projection = MinimapProjection::new(world, rect.shrink(4.0));

        let response = ui.interact(rect, ui.id().with("minimap"), egui::Sense::click_and_drag());
        if response.clicked() || response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.center_view_on(projection.to_world(pos));
            }
        }

        let painter = ui.painter_at(rect);
        let visuals = ui.visuals();
        painter.rect_filled(rect, 4.0, visuals.extreme_bg_color.gamma_multiply(0.9));
        painter.rect_stroke(
            rect,
            4.0,
            egui::Stroke::new(1.0, visuals.widgets.noninteractive.bg_stroke.color),
            StrokeKind::Inside,
        );

        for node in &self.diagram.nodes {
            let (w, h) = node.size();
            let world_rect =
                egui::Rect::from_center_size(egui::pos2(node.position.0, node.position.1), egui::vec2(w, h));
            let color = if self.interaction.selected_node == Some(node.id) {
                egui::Color32::YELLOW
            } else {
                node_color(&node.kind)
            };
            painter.rect_filled(projection.rect_to_minimap(world_rect), 1.0, color);
        }

        painter.rect_stroke(
            projection.rect_to_minimap(viewport),
            0.0,
            egui::Stroke::new(1.5, egui::Color32::from_rgb(100, 150, 255)),
            StrokeKind::Inside,
        );
    }

    /// Draws frame rate, scene statistics and the memory held by the undo
    /// history in the top-left corner of the canvas.
    pub fn draw_resource_monitor(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let status = self.history_status();
        let lines = [
            format!("FPS: {:.0}", self.stats.fps()),
            format!("Nodes: {}", self.diagram.nodes.len()),
            format!("Edges: {}", self.diagram.edges.len()),
            format!("History: {}/{}", status.position + 1, status.len),
            format!("Memory: ~{}", format_bytes(self.history.retained_bytes())),
            format!("Pending save: {}", if status.pending { "yes" } else { "no" }),
        ];

        let font = egui::FontId::monospace(12.0);
        let line_height = 16.0;
        let origin = canvas_rect.min + egui::vec2(10.0, 10.0);
        let bg = egui::Rect::from_min_size(origin, egui::vec2(150.0, line_height * lines.len() as f32 + 8.0));
        painter.rect_filled(bg, 4.0, egui::Color32::from_black_alpha(160));

        for (i, line) in lines.iter().enumerate() {
            painter.text(
                origin + egui::vec2(6.0, 4.0 + i as f32 * line_height),
                egui::Align2::LEFT_TOP,
                line,
                font.clone(),
                egui::Color32::from_gray(230),
            );
        }
    }
}

/// Human-readable byte count with one decimal above a kilobyte.
pub fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KB {
        format!("{bytes} B")
    } else if bytes_f < KB * KB {
        format!("{:.1} KB", bytes_f / KB)
    } else {
        format!("{:.1} MB", bytes_f / (KB * KB))
    }
}
