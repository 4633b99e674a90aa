//! Shared application-wide constants.
//! Centralizes tweakable values used across rendering, routing and interactions.

use std::time::Duration;

// Node dimensions
/// Diameter of circular activity nodes in world units.
pub const ACTIVITY_NODE_DIAMETER: f32 = 60.0;
/// Width of calculation nodes in world units.
pub const CALCULATION_NODE_WIDTH: f32 = 120.0;
/// Height of calculation nodes in world units.
pub const CALCULATION_NODE_HEIGHT: f32 = 90.0;
/// Width of database schema nodes in world units.
pub const SCHEMA_NODE_WIDTH: f32 = 180.0;
/// Height of the table-name header of a schema node.
pub const SCHEMA_HEADER_HEIGHT: f32 = 30.0;
/// Height of one field row of a schema node.
pub const SCHEMA_ROW_HEIGHT: f32 = 24.0;
/// Gap between a node's boundary and its connection handles.
pub const HANDLE_MARGIN: f32 = 4.0;
/// Radius of the drawn connection handles (in world units).
pub const HANDLE_RADIUS: f32 = 4.0;

// Grid/drawing
/// Grid cell size in world units.
pub const GRID_SIZE: f32 = 50.0;

// Canvas interactions
/// Click threshold in world units used for distinguishing click vs drag.
pub const CLICK_THRESHOLD: f32 = 10.0;
/// Distance in world units within which an edge's target end can be grabbed.
pub const ENDPOINT_GRAB_RADIUS: f32 = 8.0;
/// Smallest zoom factor reachable through wheel or toolbar.
pub const MIN_ZOOM: f32 = 0.25;
/// Largest zoom factor reachable through wheel or toolbar.
pub const MAX_ZOOM: f32 = 2.0;
/// Multiplicative step of the toolbar zoom buttons.
pub const ZOOM_STEP: f32 = 1.2;
/// Fraction of the viewport left empty around the diagram by "fit view".
pub const FIT_VIEW_PADDING: f32 = 0.1;

// Axis control
/// Gap between a selected node's boundary and its axis arrows, in world units.
pub const AXIS_ARROW_GAP: f32 = 20.0;
/// Length of an axis arrow along its axis, in world units.
pub const AXIS_ARROW_LENGTH: f32 = 30.0;
/// Width of an axis arrow across its axis, in world units.
pub const AXIS_ARROW_WIDTH: f32 = 15.0;
/// How long the coordinate readout stays up after an axis drag ends.
pub const AXIS_READOUT_DURATION: Duration = Duration::from_millis(1500);

// Overlays
/// Size of the minimap overlay in screen pixels.
pub const MINIMAP_SIZE: (f32, f32) = (200.0, 140.0);
/// Number of frame times averaged by the resource monitor.
pub const FPS_SAMPLE_WINDOW: usize = 30;
/// The resource monitor refreshes its displayed FPS every this many frames.
pub const FPS_REFRESH_INTERVAL: u64 = 10;

// Undo/redo
/// Default number of snapshots retained by the history manager.
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 50;
/// Default quiet period before a debounced save is committed.
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);
