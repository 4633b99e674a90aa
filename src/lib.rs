//! # Diagram Canvas
//!
//! An interactive node-and-edge diagram editor. Nodes are placed on a pannable,
//! zoomable canvas and connected by orthogonally routed edges. Three node kinds
//! are supported:
//! - **Activities**: circular steps carrying an assignee, duration and value
//! - **Calculations**: combine two inputs with `+ - × ÷`
//! - **Database schemas**: tables whose fields each expose an output handle
//!
//! ## Features
//! - Snapshot-based undo/redo with debounced saving
//! - Orthogonal, rounded and straight edge routing
//! - Minimap, resource monitor, zoom presets and fit view
//! - Node manager with rename and delete

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod history;
pub mod routing;
mod types;
mod ui;

// Re-export public types and functions
pub use config::EditorConfig;
pub use history::{HistoryManager, SceneSnapshot};
pub use routing::{route_edge, route_orthogonal, EdgePath, EdgeStyle, PathCommand, RouteKind};
pub use types::*;
pub use ui::{DiagramApp, HistoryStatus, InteractionMode};

/// Runs the diagram editor.
///
/// Stored preferences are loaded from eframe's storage; the diagram always starts
/// from [`Diagram::initial`].
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an `eframe::Error` if
/// initialization fails.
///
/// # Example
///
/// ```no_run
/// use diagram_canvas::run_app;
///
/// fn main() -> Result<(), eframe::Error> {
///     run_app()
/// }
/// ```
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Diagram Canvas",
        options,
        Box::new(|cc| {
            let config = EditorConfig::load(cc.storage);
            Ok(Box::new(DiagramApp::new(config)))
        }),
    )
}
