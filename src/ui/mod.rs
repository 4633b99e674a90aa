//! User interface components and rendering logic for the diagram editor.
//!
//! This module contains the main application struct, canvas rendering, the
//! properties panel, the node manager, context menus and input handling.
//!
//! # Module Organization
//!
//! - `state` - Application state structures and the main DiagramApp
//! - `canvas` - Canvas navigation, zooming, panning, hit testing and connecting
//! - `rendering` - Drawing nodes, edges and the grid
//! - `overlays` - Minimap and resource monitor
//! - `undo` - Binding between the scene and the snapshot history

mod canvas;
mod overlays;
mod rendering;
mod state;
mod undo;

#[cfg(target_arch = "wasm32")]
use web_sys;

fn is_macos_platform() -> bool {
    #[cfg(target_arch = "wasm32")]
    {
        web_sys::window()
            .and_then(|win| win.navigator().platform().ok())
            .map(|platform| platform.contains("Mac"))
            .unwrap_or(false)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        cfg!(target_os = "macos")
    }
}

pub use state::{DiagramApp, InteractionMode};
pub use undo::HistoryStatus;

use crate::routing::EdgeStyle;
use crate::types::*;
use eframe::egui;
use std::time::Duration;

/// Zoom levels offered by the toolbar preset selector.
const ZOOM_PRESETS: [f32; 4] = [0.5, 1.0, 1.5, 2.0];

/// Widget id of the text editor for one schema field.
fn schema_field_id(node: NodeId, index: usize) -> egui::Id {
    egui::Id::new(("schema_field", node, index))
}

impl eframe::App for DiagramApp {
    /// Persist preferences between restarts. The diagram itself is not stored.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.config.store(storage);
    }

    /// Called once on shutdown, after [`Self::save`].
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.shutdown();
    }

    /// Main update function called by egui for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|i| i.time);
        self.frame_time = Duration::from_secs_f64(now.max(0.0));
        self.stats.record(now);

        let visuals = if self.config.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);

        self.handle_undo_redo_keys(ctx);
        self.handle_delete_key(ctx);

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        let viewport_width = ctx.input(|i| i.screen_rect().width());
        let max_width = (viewport_width * 0.9).max(180.0);
        egui::SidePanel::right("properties_panel")
            .resizable(true)
            .default_width(self.config.properties_panel_width.clamp(180.0, max_width))
            .show(ctx, |ui| {
                self.config.properties_panel_width = ui.available_width().clamp(180.0, max_width);
                self.draw_properties_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_canvas(ui);
        });

        self.tick_history(ctx);

        if self.config.show_resource_monitor {
            ctx.request_repaint();
        }
    }
}

impl DiagramApp {
    /// Handles undo/redo keyboard shortcuts unless a text field has focus.
    fn handle_undo_redo_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Z) && i.modifiers.command && !i.modifiers.shift) {
            self.perform_undo();
        } else if ctx.input(|i| {
            (i.key_pressed(egui::Key::Z) && i.modifiers.command && i.modifiers.shift)
                || (i.key_pressed(egui::Key::Y) && i.modifiers.command)
        }) {
            self.perform_redo();
        }
    }

    /// Removes the selected node or edge when Delete is pressed.
    fn handle_delete_key(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() || !ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
            return;
        }

        if let Some(id) = self.interaction.selected_node {
            self.delete_node(id);
        } else if let Some(id) = self.interaction.selected_edge {
            self.delete_edge(id);
        }
    }

    /// Removes a node and its edges.
    pub fn delete_node(&mut self, id: NodeId) {
        if self.diagram.remove_node(id).is_none() {
            return;
        }
        log::debug!("node {id} deleted");
        if self.interaction.selected_node == Some(id) {
            self.interaction.selected_node = None;
        }
        if self.interaction.selected_edge.is_some_and(|e| self.diagram.edge(e).is_none()) {
            self.interaction.selected_edge = None;
        }
        if self.interaction.renaming_node == Some(id) {
            self.interaction.renaming_node = None;
        }
        self.record_change();
    }

    /// Removes an edge.
    pub fn delete_edge(&mut self, id: EdgeId) {
        match self.diagram.remove_edge(id) {
            Ok(_) => {
                if self.interaction.selected_edge == Some(id) {
                    self.interaction.selected_edge = None;
                }
                self.record_change();
            }
            Err(err) => log::warn!("delete: {err}"),
        }
    }

    /// Renders the toolbar with interaction mode, history, edge style and view controls.
    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        let status = self.history_status();
        let (undo_hint, redo_hint) = if is_macos_platform() {
            ("⌘Z", "⌘⇧Z")
        } else {
            ("Ctrl+Z", "Ctrl+Shift+Z / Ctrl+Y")
        };

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.mode, InteractionMode::Select, "Select");
            ui.selectable_value(&mut self.mode, InteractionMode::Pan, "Pan");

            ui.separator();

            if ui
                .add_enabled(status.can_undo, egui::Button::new("⟲ Undo"))
                .on_hover_text(undo_hint)
                .clicked()
            {
                self.perform_undo();
            }
            if ui
                .add_enabled(status.can_redo, egui::Button::new("⟳ Redo"))
                .on_hover_text(redo_hint)
                .clicked()
            {
                self.perform_redo();
            }

            ui.separator();

            egui::ComboBox::from_id_salt("edge_style_combo")
                .selected_text(self.config.edge_style.label())
                .show_ui(ui, |ui| {
                    for style in EdgeStyle::ALL {
                        ui.selectable_value(&mut self.config.edge_style, style, style.label());
                    }
                });

            ui.separator();

            if ui.button("−").on_hover_text("Zoom out").clicked() {
                self.zoom_out();
            }
            egui::ComboBox::from_id_salt("zoom_preset_combo")
                .selected_text(format!("{:.0}%", self.canvas.zoom_factor * 100.0))
                .show_ui(ui, |ui| {
                    for preset in ZOOM_PRESETS {
                        let selected = (self.canvas.zoom_factor - preset).abs() < f32::EPSILON;
                        if ui
                            .selectable_label(selected, format!("{:.0}%", preset * 100.0))
                            .clicked()
                        {
                            self.set_zoom(preset);
                        }
                    }
                });
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                self.zoom_in();
            }
            if ui.button("Fit").on_hover_text("Fit all nodes in view").clicked() {
                self.fit_view();
            }

            ui.separator();

            ui.checkbox(&mut self.config.show_grid, "Grid");
            ui.checkbox(&mut self.config.show_minimap, "Minimap");
            ui.checkbox(&mut self.config.show_resource_monitor, "Monitor");
            ui.checkbox(&mut self.config.dark_mode, "Dark Mode");
        });
    }

    /// Renders the properties panel and the node manager.
    fn draw_properties_panel(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                ui.heading("Properties");
                ui.separator();

                if let Some(id) = self.interaction.selected_node {
                    self.draw_node_editor(ui, id);
                } else if let Some(id) = self.interaction.selected_edge {
                    self.draw_edge_properties(ui, id);
                } else {
                    ui.label("Select a node or edge to view its properties.");
                    ui.add_space(4.0);
                    ui.label("Right-click the canvas to add a node.");
                    ui.label("Shift+drag from a node to connect it.");
                }

                ui.add_space(12.0);
                egui::CollapsingHeader::new("Nodes")
                    .default_open(true)
                    .show(ui, |ui| self.draw_node_manager(ui));
            });
    }

    /// Editor for the label, position and kind-specific data of a node.
    fn draw_node_editor(&mut self, ui: &mut egui::Ui, id: NodeId) {
        let mut changed = false;
        let mut add_field = false;
        let mut field_edit: Option<(usize, String)> = None;
        let Some(node) = self.diagram.node_mut(id) else {
            return;
        };

        ui.label(format!("Type: {}", node.kind.type_name()));
        ui.label(format!("ID: {}", node.id));
        ui.horizontal(|ui| {
            ui.label("Label:");
            changed |= ui.text_edit_singleline(&mut node.label).changed();
        });
        ui.horizontal(|ui| {
            ui.label("X:");
            changed |= ui.add(egui::DragValue::new(&mut node.position.0)).changed();
            ui.label("Y:");
            changed |= ui.add(egui::DragValue::new(&mut node.position.1)).changed();
        });
        ui.separator();

        match &mut node.kind {
            NodeKind::Activity {
                assignee,
                duration,
                value,
            } => {
                egui::Grid::new("activity_fields").num_columns(2).show(ui, |ui| {
                    ui.label("Assignee:");
                    changed |= ui.text_edit_singleline(assignee).changed();
                    ui.end_row();
                    ui.label("Duration:");
                    changed |= ui
                        .add(egui::DragValue::new(duration).range(0.0..=f32::MAX).suffix(" days"))
                        .changed();
                    ui.end_row();
                    ui.label("Value:");
                    changed |= ui.add(egui::DragValue::new(value).speed(0.1)).changed();
                    ui.end_row();
                });
            }
            NodeKind::Calculation { operator, result } => {
                ui.horizontal(|ui| {
                    ui.label("Operator:");
                    egui::ComboBox::from_id_salt("calc_operator_combo")
                        .selected_text(operator.symbol())
                        .show_ui(ui, |ui| {
                            for op in CalcOperator::ALL {
                                changed |= ui.selectable_value(operator, op, op.symbol()).changed();
                            }
                        });
                });
                ui.label(format!("Result: {result}"));
            }
            NodeKind::DatabaseSchema { table_name, fields } => {
                ui.horizontal(|ui| {
                    ui.label("Table:");
                    changed |= ui.text_edit_singleline(table_name).changed();
                });
                egui::Grid::new("schema_fields").num_columns(2).striped(true).show(ui, |ui| {
                    for (index, field) in fields.iter().enumerate() {
                        ui.label(field.name.as_str());
                        let mut text = field.text.clone();
                        let edited = ui
                            .add(
                                egui::TextEdit::singleline(&mut text)
                                    .id(schema_field_id(id, index))
                                    .hint_text(field.field_type.as_str()),
                            )
                            .changed();
                        if edited {
                            field_edit = Some((index, text));
                        }
                        ui.end_row();
                    }
                });
                add_field = ui.button("Add field").clicked();
            }
        }

        if let Some((index, text)) = field_edit {
            match self.diagram.set_schema_field_text(id, index, text) {
                Ok(()) => changed = true,
                Err(err) => log::warn!("edit field: {err}"),
            }
        }
        if add_field {
            match self.diagram.add_schema_field(id) {
                Ok(index) => {
                    log::debug!("node {id}: added field {index}");
                    changed = true;
                }
                Err(err) => log::warn!("add field: {err}"),
            }
        }
        if changed {
            self.record_change();
        }
    }

    fn draw_edge_properties(&mut self, ui: &mut egui::Ui, id: EdgeId) {
        let Some(edge) = self.diagram.edge(id) else {
            return;
        };
        let label = |node: NodeId| {
            self.diagram
                .node(node)
                .map(|n| n.label.clone())
                .unwrap_or_else(|| format!("#{node}"))
        };

        ui.label("Type: Edge");
        ui.label(format!(
            "From: {} (handle {})",
            label(edge.source),
            edge.source_handle.unwrap_or(0)
        ));
        ui.label(format!(
            "To: {} (handle {})",
            label(edge.target),
            edge.target_handle.unwrap_or(0)
        ));
        if let Some(path) = self.edge_path(edge) {
            ui.label(format!("Length: {:.0}", path.length()));
            ui.add(egui::Label::new(egui::RichText::new(path.to_string()).monospace().small()).wrap());
        }

        if ui.button("Delete edge").clicked() {
            self.delete_edge(id);
        }
    }

    /// List of all nodes with select, rename and delete actions.
    fn draw_node_manager(&mut self, ui: &mut egui::Ui) {
        let rows: Vec<(NodeId, String, &'static str)> = self
            .diagram
            .nodes
            .iter()
            .map(|n| (n.id, n.label.clone(), n.kind.type_name()))
            .collect();
        let mut delete = None;

        for (id, label, type_name) in rows {
            ui.horizontal(|ui| {
                if self.interaction.renaming_node == Some(id) {
                    let response = ui.text_edit_singleline(&mut self.interaction.temp_node_name);
                    if !response.has_focus() && !response.lost_focus() {
                        response.request_focus();
                    }
                    let enter = ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if response.lost_focus() || enter {
                        self.commit_rename(id);
                    }
                } else {
                    let selected = self.interaction.selected_node == Some(id);
                    if ui
                        .selectable_label(selected, format!("{label} ({type_name})"))
                        .clicked()
                    {
                        self.interaction.select_node(id);
                    }
                    if ui.small_button("Rename").clicked() {
                        self.interaction.renaming_node = Some(id);
                        self.interaction.temp_node_name = label.clone();
                    }
                    if ui.small_button("🗑").on_hover_text("Delete node").clicked() {
                        delete = Some(id);
                    }
                }
            });
        }

        if let Some(id) = delete {
            self.delete_node(id);
        }
    }

    fn commit_rename(&mut self, id: NodeId) {
        let name = self.interaction.temp_node_name.trim().to_string();
        self.interaction.renaming_node = None;
        self.interaction.temp_node_name.clear();

        let unchanged = self.diagram.node(id).is_some_and(|n| n.label == name);
        if name.is_empty() || unchanged {
            return;
        }
        match self.diagram.rename_node(id, name) {
            Ok(()) => self.record_change(),
            Err(err) => log::warn!("rename: {err}"),
        }
    }

    /// Renders the right-click context menu for creating nodes.
    fn draw_context_menu(&mut self, ui: &mut egui::Ui) {
        let screen_pos = egui::pos2(self.context_menu.screen_pos.0, self.context_menu.screen_pos.1);

        let area_response = egui::Area::new(egui::Id::new("context_menu"))
            .fixed_pos(screen_pos)
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label("Create Node:");
                    ui.separator();

                    let choice = if ui.button("Activity").clicked() {
                        Some(NodeKind::activity())
                    } else if ui.button("Calculation").clicked() {
                        Some(NodeKind::calculation())
                    } else if ui.button("Database").clicked() {
                        Some(NodeKind::database_schema())
                    } else {
                        None
                    };
                    if let Some(kind) = choice {
                        self.create_node_at_pos(kind);
                        self.context_menu.show = false;
                    }

                    ui.separator();
                    if ui.button("Cancel").clicked() {
                        self.context_menu.show = false;
                    }
                })
            });

        if !self.context_menu.just_opened && ui.input(|i| i.pointer.primary_clicked()) {
            if let Some(click_pos) = ui.input(|i| i.pointer.interact_pos()) {
                if !area_response.response.rect.contains(click_pos) {
                    self.context_menu.show = false;
                }
            }
        }
        self.context_menu.just_opened = false;
    }

    /// Renders the canvas with the diagram and overlays and handles its input.
    fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        self.canvas.rect = response.rect;

        if !self.canvas.centered {
            self.canvas.offset = response.rect.center().to_vec2();
            self.canvas.centered = true;
        }

        self.handle_canvas_panning(ui, &response);
        self.handle_canvas_zoom(ui, &response);
        self.handle_canvas_interactions(ui, &response);
        self.handle_node_dragging(ui, &response);

        self.render_diagram_elements(&painter, response.rect);

        if self.config.show_resource_monitor {
            self.draw_resource_monitor(&painter, response.rect);
        }
        if self.config.show_minimap {
            self.draw_minimap(ui, response.rect);
        }
        if self.context_menu.show {
            self.draw_context_menu(ui);
        }
    }

    /// Handles click selection and the right-click context menu.
    fn handle_canvas_interactions(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        if response.clicked() && !self.interaction.is_panning && !self.interaction.gesture_in_progress() {
            if let Some(pos) = response.interact_pointer_pos() {
                let world_pos = self.screen_to_world(pos);
                if let Some(node_id) = self.find_node_at_position(world_pos) {
                    self.interaction.select_node(node_id);
                } else if let Some(edge_id) = self.find_edge_at_position(world_pos) {
                    self.interaction.select_edge(edge_id);
                } else {
                    self.interaction.clear_selection();
                }
                self.interaction.renaming_node = None;
            }
        }

        if response.secondary_clicked() && !self.interaction.is_panning {
            if let Some(screen_pos) = response.interact_pointer_pos() {
                let world_pos = self.screen_to_world(screen_pos);
                self.context_menu.screen_pos = (screen_pos.x, screen_pos.y);
                self.context_menu.world_pos = (world_pos.x, world_pos.y);
                self.context_menu.show = true;
                self.context_menu.just_opened = true;
            }
        }

        if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
            if self.context_menu.show {
                self.context_menu.show = false;
            } else {
                self.interaction.clear_selection();
            }
        }
    }
}

#[cfg(test)]
mod tests;
