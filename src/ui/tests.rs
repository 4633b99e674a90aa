use super::*;
use crate::types::{CalcOperator, CalcOutcome, DiagramNode, NodeId, NodeKind};
use eframe::egui;
use std::time::Duration;

const SCREEN: egui::Vec2 = egui::vec2(1200.0, 800.0);

fn raw_input(events: Vec<egui::Event>, modifiers: egui::Modifiers) -> egui::RawInput {
    let mut raw = egui::RawInput::default();
    raw.screen_rect = Some(egui::Rect::from_min_size(egui::Pos2::ZERO, SCREEN));
    raw.modifiers = modifiers;
    raw.events = events;
    raw
}

/// Runs one headless frame that draws only the canvas.
fn canvas_frame(
    ctx: &egui::Context,
    app: &mut DiagramApp,
    events: Vec<egui::Event>,
    modifiers: egui::Modifiers,
) {
    let _ = ctx.run(raw_input(events, modifiers), |ctx| {
        egui::CentralPanel::default().show(ctx, |ui| {
            app.draw_canvas(ui);
        });
    });
}

fn press(pos: egui::Pos2, pressed: bool, modifiers: egui::Modifiers) -> Vec<egui::Event> {
    vec![
        egui::Event::PointerMoved(pos),
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers,
        },
    ]
}

fn key(key: egui::Key, modifiers: egui::Modifiers) -> egui::Event {
    egui::Event::Key {
        key,
        physical_key: None,
        pressed: true,
        repeat: false,
        modifiers,
    }
}

/// An editor whose world origin sits at screen (300, 300) with no minimap.
fn test_app() -> DiagramApp {
    let mut app = DiagramApp::default();
    app.canvas.offset = egui::vec2(300.0, 300.0);
    app.canvas.zoom_factor = 1.0;
    app.canvas.centered = true;
    app.config.show_minimap = false;
    app
}

#[test]
fn undo_operation_removes_last_created_node() {
    let mut app = test_app();
    app.context_menu.world_pos = (100.0, 100.0);

    let created = app.create_node_at_pos(NodeKind::calculation());
    assert!(app.diagram.node(created).is_some());
    assert_eq!(app.interaction.selected_node, Some(created));

    app.perform_undo();
    assert!(app.diagram.node(created).is_none());
    assert_eq!(app.interaction.selected_node, None);

    app.perform_redo();
    assert!(app.diagram.node(created).is_some());
}

#[test]
fn undo_flushes_pending_edit_before_stepping_back() {
    let mut app = test_app();
    app.diagram.set_node_position(NodeId(0), (80.0, 0.0)).unwrap();
    app.record_change();
    assert!(app.history_status().pending);

    app.perform_undo();

    assert_eq!(app.diagram.nodes[0].position, (0.0, 0.0));
    let status = app.history_status();
    assert!(!status.pending);
    assert!(status.can_redo);
}

#[test]
fn debounced_edits_commit_once_after_quiet_period() {
    let ctx = egui::Context::default();
    let mut app = test_app();

    for step in 0..3 {
        app.frame_time = Duration::from_millis(step * 100);
        app.diagram
            .set_node_position(NodeId(0), (step as f32 * 10.0, 0.0))
            .unwrap();
        app.record_change();
        app.tick_history(&ctx);
    }
    assert_eq!(app.history.history_len(), 1);

    // Last edit was at 200ms, so nothing commits before 700ms.
    app.frame_time = Duration::from_millis(699);
    app.tick_history(&ctx);
    assert_eq!(app.history.history_len(), 1);

    app.frame_time = Duration::from_millis(700);
    app.tick_history(&ctx);
    assert_eq!(app.history.history_len(), 2);
    assert_eq!(app.history.current_state().nodes[0].position, (20.0, 0.0));
}

#[test]
fn clicking_canvas_selects_node() {
    let mut app = test_app();
    let node_id = app.diagram.add_node(DiagramNode::new(
        NodeId(7),
        "A",
        (200.0, 150.0),
        NodeKind::activity(),
    ));
    let click_pos = app.world_to_screen(egui::pos2(200.0, 150.0));

    let ctx = egui::Context::default();
    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(click_pos)], egui::Modifiers::NONE);
    canvas_frame(&ctx, &mut app, press(click_pos, true, egui::Modifiers::NONE), egui::Modifiers::NONE);

    assert_eq!(app.interaction.selected_node, Some(node_id));
    assert_eq!(app.interaction.dragging_node, Some(node_id));
}

#[test]
fn dragging_node_moves_it_and_records_history() {
    let mut app = test_app();
    let start = app.world_to_screen(egui::pos2(0.0, 0.0));
    let end = start + egui::vec2(120.0, 40.0);

    let ctx = egui::Context::default();
    let none = egui::Modifiers::NONE;
    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(start)], none);
    canvas_frame(&ctx, &mut app, press(start, true, none), none);
    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(start + egui::vec2(60.0, 20.0))], none);
    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(end)], none);
    canvas_frame(&ctx, &mut app, press(end, false, none), none);

    assert_eq!(app.diagram.nodes[0].position, (120.0, 40.0));
    assert_eq!(app.interaction.dragging_node, None);
    assert!(app.history_status().pending);
}

#[test]
fn shift_drag_to_empty_canvas_creates_connected_node() {
    let mut app = test_app();
    let start = app.world_to_screen(egui::pos2(0.0, 0.0));
    let end = app.world_to_screen(egui::pos2(250.0, 100.0));

    let ctx = egui::Context::default();
    let shift = egui::Modifiers::SHIFT;
    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(start)], shift);
    canvas_frame(&ctx, &mut app, press(start, true, shift), shift);
    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(start + egui::vec2(40.0, 20.0))], shift);
    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(end)], shift);
    assert!(app.interaction.drawing_connection_from.is_some());
    canvas_frame(&ctx, &mut app, press(end, false, shift), shift);

    assert_eq!(app.diagram.nodes.len(), 2);
    assert_eq!(app.diagram.nodes[1].position, (250.0, 100.0));
    assert_eq!(app.diagram.edges.len(), 1);
    assert_eq!(app.diagram.edges[0].source, NodeId(0));
    assert_eq!(app.diagram.edges[0].target, app.diagram.nodes[1].id);
}

#[test]
fn connection_into_calculation_picks_nearest_input() {
    let mut app = test_app();
    let lhs = app.diagram.add_node(DiagramNode::new(
        NodeId(1),
        "lhs",
        (0.0, -100.0),
        NodeKind::Activity {
            assignee: String::new(),
            duration: 0.0,
            value: 6.0,
        },
    ));
    let rhs = app.diagram.add_node(DiagramNode::new(
        NodeId(2),
        "rhs",
        (0.0, 100.0),
        NodeKind::Activity {
            assignee: String::new(),
            duration: 0.0,
            value: 3.0,
        },
    ));
    let calc = app.diagram.add_node(DiagramNode::new(
        NodeId(3),
        "calc",
        (300.0, 0.0),
        NodeKind::Calculation {
            operator: CalcOperator::Divide,
            result: CalcOutcome::MissingInputs,
        },
    ));

    app.interaction.drawing_connection_from = Some((lhs, 0));
    app.finalize_connection(egui::pos2(300.0, -20.0));
    app.interaction.drawing_connection_from = Some((rhs, 0));
    app.finalize_connection(egui::pos2(300.0, 20.0));

    let handles: Vec<Option<usize>> = app.diagram.incoming(calc).iter().map(|e| e.target_handle).collect();
    assert_eq!(handles, vec![Some(0), Some(1)]);
    match app.diagram.node(calc).map(|n| &n.kind) {
        Some(NodeKind::Calculation { result, .. }) => assert_eq!(*result, CalcOutcome::Value(2.0)),
        other => panic!("unexpected node {other:?}"),
    }
}

#[test]
fn delete_key_removes_selected_node_and_its_edges() {
    let mut app = test_app();
    let other = app.diagram.add_node(DiagramNode::new(
        NodeId(1),
        "1",
        (200.0, 0.0),
        NodeKind::activity(),
    ));
    app.diagram.connect(NodeId(0), other, None, None).unwrap();
    app.interaction.select_node(other);

    let ctx = egui::Context::default();
    let _ = ctx.run(
        raw_input(vec![key(egui::Key::Delete, egui::Modifiers::NONE)], egui::Modifiers::NONE),
        |ctx| app.handle_delete_key(ctx),
    );

    assert!(app.diagram.node(other).is_none());
    assert!(app.diagram.edges.is_empty());
    assert_eq!(app.interaction.selected_node, None);
}

#[test]
fn command_z_undoes_and_command_y_redoes() {
    let mut app = test_app();
    app.context_menu.world_pos = (50.0, 50.0);
    let created = app.create_node_at_pos(NodeKind::activity());

    let ctx = egui::Context::default();
    let command = egui::Modifiers::COMMAND;
    let _ = ctx.run(raw_input(vec![key(egui::Key::Z, command)], command), |ctx| {
        app.handle_undo_redo_keys(ctx)
    });
    assert!(app.diagram.node(created).is_none());

    let _ = ctx.run(raw_input(vec![key(egui::Key::Y, command)], command), |ctx| {
        app.handle_undo_redo_keys(ctx)
    });
    assert!(app.diagram.node(created).is_some());
}

#[test]
fn properties_panel_renders_every_node_kind_without_edits() {
    let mut app = test_app();
    app.context_menu.world_pos = (0.0, 200.0);
    let calc = app.create_node_at_pos(NodeKind::calculation());
    let table = app.create_node_at_pos(NodeKind::database_schema());
    app.history.flush_pending();
    let len = app.history.history_len();

    let ctx = egui::Context::default();
    for id in [NodeId(0), calc, table] {
        app.interaction.select_node(id);
        let _ = ctx.run(raw_input(Vec::new(), egui::Modifiers::NONE), |ctx| {
            egui::SidePanel::right("properties_panel").show(ctx, |ui| {
                app.draw_properties_panel(ui);
            });
            egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
                app.draw_toolbar(ui);
            });
        });
    }

    assert!(!app.history.has_pending_save());
    assert_eq!(app.history.history_len(), len);
}

#[test]
fn renaming_from_node_manager_records_change() {
    let mut app = test_app();
    app.interaction.renaming_node = Some(NodeId(0));
    app.interaction.temp_node_name = "  Start  ".to_string();

    app.commit_rename(NodeId(0));

    assert_eq!(app.diagram.nodes[0].label, "Start");
    assert_eq!(app.interaction.renaming_node, None);
    assert!(app.history_status().pending);
}

#[test]
fn zoom_presets_and_fit_view_stay_in_range() {
    let mut app = test_app();
    app.canvas.rect = egui::Rect::from_min_size(egui::Pos2::ZERO, SCREEN);

    for preset in ZOOM_PRESETS {
        app.set_zoom(preset);
        assert_eq!(app.canvas.zoom_factor, preset);
    }

    app.diagram.add_node(DiagramNode::new(
        NodeId(9),
        "far",
        (20_000.0, 0.0),
        NodeKind::activity(),
    ));
    app.fit_view();
    assert_eq!(app.canvas.zoom_factor, crate::constants::MIN_ZOOM);
}

/// An editor with `0 -> 1` where node 1 sits at (200, 0) and node 2 at (200, 200).
fn app_with_edge() -> (DiagramApp, NodeId, NodeId, crate::types::EdgeId) {
    let mut app = test_app();
    let b = app.diagram.add_node(DiagramNode::new(NodeId(1), "1", (200.0, 0.0), NodeKind::activity()));
    let c = app.diagram.add_node(DiagramNode::new(NodeId(2), "2", (200.0, 200.0), NodeKind::activity()));
    let edge = app.diagram.connect(NodeId(0), b, None, None).unwrap();
    (app, b, c, edge)
}

/// Presses at `start`, moves through `via`, and releases at `end`.
fn drag(ctx: &egui::Context, app: &mut DiagramApp, start: egui::Pos2, via: egui::Pos2, end: egui::Pos2) {
    let none = egui::Modifiers::NONE;
    canvas_frame(ctx, app, vec![egui::Event::PointerMoved(start)], none);
    canvas_frame(ctx, app, press(start, true, none), none);
    canvas_frame(ctx, app, vec![egui::Event::PointerMoved(via)], none);
    canvas_frame(ctx, app, vec![egui::Event::PointerMoved(end)], none);
    canvas_frame(ctx, app, press(end, false, none), none);
}

#[test]
fn dragging_edge_end_onto_another_node_reconnects() {
    let (mut app, _, c, edge) = app_with_edge();
    let start = app.world_to_screen(egui::pos2(166.0, 0.0));
    let end = app.world_to_screen(egui::pos2(200.0, 200.0));

    let ctx = egui::Context::default();
    drag(&ctx, &mut app, start, start + egui::vec2(10.0, 30.0), end);

    assert_eq!(app.diagram.edges.len(), 1);
    assert_eq!(app.diagram.edges[0].id, edge);
    assert_eq!(app.diagram.edges[0].source, NodeId(0));
    assert_eq!(app.diagram.edges[0].target, c);
    assert_eq!(app.interaction.reconnecting_edge, None);
    assert!(app.history_status().pending);
}

#[test]
fn dragging_edge_end_onto_empty_canvas_removes_edge() {
    let (mut app, _, _, _) = app_with_edge();
    let start = app.world_to_screen(egui::pos2(166.0, 0.0));
    let end = app.world_to_screen(egui::pos2(400.0, -200.0));

    let ctx = egui::Context::default();
    drag(&ctx, &mut app, start, start + egui::vec2(30.0, -30.0), end);

    assert!(app.diagram.edges.is_empty());
    assert_eq!(app.diagram.nodes.len(), 3);
    assert!(app.history_status().pending);
}

#[test]
fn clicking_edge_end_selects_edge_without_changes() {
    let (mut app, b, _, edge) = app_with_edge();
    let pos = app.world_to_screen(egui::pos2(166.0, 0.0));

    let ctx = egui::Context::default();
    let none = egui::Modifiers::NONE;
    canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(pos)], none);
    canvas_frame(&ctx, &mut app, press(pos, true, none), none);
    canvas_frame(&ctx, &mut app, press(pos, false, none), none);

    assert_eq!(app.diagram.edges.len(), 1);
    assert_eq!(app.diagram.edges[0].target, b);
    assert_eq!(app.interaction.selected_edge, Some(edge));
    assert!(!app.history_status().pending);
}

#[test]
fn x_arrow_drag_moves_node_horizontally_only() {
    let mut app = test_app();
    app.interaction.select_node(NodeId(0));
    let start = app.world_to_screen(egui::pos2(65.0, 0.0));

    let ctx = egui::Context::default();
    drag(
        &ctx,
        &mut app,
        start,
        start + egui::vec2(40.0, 25.0),
        start + egui::vec2(80.0, 30.0),
    );

    assert_eq!(app.diagram.nodes[0].position, (80.0, 0.0));
    assert_eq!(app.interaction.axis_drag, None);
    assert!(app.history_status().pending);

    assert!(app.axis_readout_visible());
    app.frame_time = Duration::from_secs(2);
    assert!(!app.axis_readout_visible());
}

#[test]
fn y_arrow_drag_moves_node_vertically_only() {
    let mut app = test_app();
    app.interaction.select_node(NodeId(0));
    let start = app.world_to_screen(egui::pos2(0.0, -65.0));

    let ctx = egui::Context::default();
    drag(
        &ctx,
        &mut app,
        start,
        start + egui::vec2(20.0, -20.0),
        start + egui::vec2(50.0, -40.0),
    );

    assert_eq!(app.diagram.nodes[0].position, (0.0, -40.0));
    assert_eq!(app.interaction.selected_node, Some(NodeId(0)));
}

#[test]
fn typing_into_schema_field_updates_the_table() {
    let mut app = test_app();
    app.context_menu.world_pos = (0.0, 200.0);
    let table = app.create_node_at_pos(NodeKind::database_schema());
    app.history.flush_pending();
    let field = schema_field_id(table, 0);

    let ctx = egui::Context::default();
    let panel_frame = |app: &mut DiagramApp, events: Vec<egui::Event>, focus: bool| {
        let _ = ctx.run(raw_input(events, egui::Modifiers::NONE), |ctx| {
            if focus {
                ctx.memory_mut(|m| m.request_focus(field));
            }
            egui::SidePanel::right("properties_panel").show(ctx, |ui| {
                app.draw_properties_panel(ui);
            });
        });
    };
    panel_frame(&mut app, Vec::new(), false);
    panel_frame(&mut app, Vec::new(), true);
    panel_frame(&mut app, vec![egui::Event::Text("42".to_string())], false);

    match app.diagram.node(table).map(|n| &n.kind) {
        Some(NodeKind::DatabaseSchema { fields, .. }) => assert_eq!(fields[0].text, "42"),
        other => panic!("unexpected node {other:?}"),
    }
    assert!(app.history_status().pending);
}

#[test]
fn shutdown_drops_pending_save() {
    let ctx = egui::Context::default();
    let mut app = test_app();
    app.diagram.set_node_position(NodeId(0), (50.0, 0.0)).unwrap();
    app.record_change();

    app.shutdown();
    assert!(!app.history_status().pending);

    app.frame_time = Duration::from_secs(5);
    app.tick_history(&ctx);
    assert_eq!(app.history.history_len(), 1);
}
