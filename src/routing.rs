//! Edge path computation between node anchors.
//!
//! Nodes have a single left entry handle and a single right exit handle, so the
//! orthogonal router never ends a path at a node's centre: every case offsets by
//! the node radius, or by the full diameter when the path has to wrap around the
//! target to reach its entry side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vertical misalignment below which two anchors are joined by one horizontal run.
pub const HORIZONTAL_THRESHOLD: f32 = 20.0;

/// Horizontal misalignment (after the diameter offset) below which two anchors
/// are joined by one vertical run.
pub const VERTICAL_THRESHOLD: f32 = 30.0;

/// Number of line segments used to flatten a rounded corner for drawing.
const CURVE_SAMPLES: usize = 8;

/// How connections are drawn on the canvas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EdgeStyle {
    /// Axis-aligned connector with a single square corner
    #[default]
    Orthogonal,
    /// Axis-aligned connector whose corner is rounded
    Rounded,
    /// Direct line between the anchors
    Straight,
}

impl EdgeStyle {
    /// All styles, in toolbar order.
    pub const ALL: [EdgeStyle; 3] = [EdgeStyle::Orthogonal, EdgeStyle::Rounded, EdgeStyle::Straight];

    /// Human-readable name for menus.
    pub fn label(self) -> &'static str {
        match self {
            EdgeStyle::Orthogonal => "Orthogonal",
            EdgeStyle::Rounded => "Rounded",
            EdgeStyle::Straight => "Straight",
        }
    }
}

/// A single SVG path command in absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    /// `M x,y`
    MoveTo(f32, f32),
    /// `H x`
    HorizontalTo(f32),
    /// `V y`
    VerticalTo(f32),
    /// `L x,y`
    LineTo(f32, f32),
    /// `Q cx,cy x,y`
    QuadTo {
        /// Control point
        control: (f32, f32),
        /// End point
        end: (f32, f32),
    },
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathCommand::MoveTo(x, y) => write!(f, "M {x},{y}"),
            PathCommand::HorizontalTo(x) => write!(f, "H {x}"),
            PathCommand::VerticalTo(y) => write!(f, "V {y}"),
            PathCommand::LineTo(x, y) => write!(f, "L {x},{y}"),
            PathCommand::QuadTo { control, end } => {
                write!(f, "Q {},{} {},{}", control.0, control.1, end.0, end.1)
            }
        }
    }
}

/// Which routing case produced a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// One horizontal run
    Horizontal,
    /// One vertical run
    Vertical,
    /// One vertical run followed by one horizontal run
    Corner,
    /// Direct line
    Straight,
}

/// A connector path: a move followed by line or curve segments.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePath {
    kind: RouteKind,
    commands: Vec<PathCommand>,
}

impl EdgePath {
    fn new(kind: RouteKind, commands: Vec<PathCommand>) -> Self {
        Self { kind, commands }
    }

    /// The routing case that produced this path.
    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    /// The path commands in drawing order.
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    /// First point of the path.
    pub fn start(&self) -> (f32, f32) {
        self.points().first().copied().unwrap_or_default()
    }

    /// Last point of the path.
    pub fn end(&self) -> (f32, f32) {
        self.points().last().copied().unwrap_or_default()
    }

    /// Flattens the path into a polyline; curves are sampled.
    pub fn points(&self) -> Vec<(f32, f32)> {
        let mut points: Vec<(f32, f32)> = Vec::with_capacity(self.commands.len());
        let mut cursor = (0.0, 0.0);
        for command in &self.commands {
            match *command {
                PathCommand::MoveTo(x, y) | PathCommand::LineTo(x, y) => cursor = (x, y),
                PathCommand::HorizontalTo(x) => cursor.0 = x,
                PathCommand::VerticalTo(y) => cursor.1 = y,
                PathCommand::QuadTo { control, end } => {
                    let from = cursor;
                    for i in 1..CURVE_SAMPLES {
                        let t = i as f32 / CURVE_SAMPLES as f32;
                        let u = 1.0 - t;
                        points.push((
                            u * u * from.0 + 2.0 * u * t * control.0 + t * t * end.0,
                            u * u * from.1 + 2.0 * u * t * control.1 + t * t * end.1,
                        ));
                    }
                    cursor = end;
                }
            }
            points.push(cursor);
        }
        points
    }

    /// Total length of the flattened path.
    pub fn length(&self) -> f32 {
        self.points()
            .windows(2)
            .map(|w| ((w[1].0 - w[0].0).powi(2) + (w[1].1 - w[0].1).powi(2)).sqrt())
            .sum()
    }
}

impl fmt::Display for EdgePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{command}")?;
        }
        Ok(())
    }
}

/// Effective radius of a node of the given rendered width, as used by the router.
pub fn node_radius_for_width(width: f32) -> f32 {
    width / 2.0 + crate::constants::HANDLE_MARGIN
}

/// Routes an axis-aligned connector with a square corner.
///
/// `source` is the exit anchor on the right of the source node and `target` the
/// entry anchor on the left of the target node.
pub fn route_orthogonal(source: (f32, f32), target: (f32, f32), node_radius: f32) -> EdgePath {
    route_orthogonal_rounded(source, target, node_radius, 0.0)
}

/// Routes an axis-aligned connector whose corner is rounded with a quadratic
/// curve of `corner_radius`. A radius of zero gives [`route_orthogonal`].
pub fn route_orthogonal_rounded(
    source: (f32, f32),
    target: (f32, f32),
    node_radius: f32,
    corner_radius: f32,
) -> EdgePath {
    let (sx, sy) = source;
    let (tx, ty) = target;
    let r = node_radius;
    let dx = tx - sx;
    let dy = ty - sy;

    if dy.abs() < HORIZONTAL_THRESHOLD {
        let end_x = if tx > sx { tx } else { tx + 2.0 * r };
        return EdgePath::new(
            RouteKind::Horizontal,
            vec![PathCommand::MoveTo(sx, sy), PathCommand::HorizontalTo(end_x)],
        );
    }

    if (dx + 2.0 * r).abs() < VERTICAL_THRESHOLD {
        let end_y = if dy > 0.0 { ty - r } else { ty + r };
        return EdgePath::new(
            RouteKind::Vertical,
            vec![PathCommand::MoveTo(sx - r, sy), PathCommand::VerticalTo(end_y)],
        );
    }

    let start_x = sx - r;
    let wraps = dx <= -r;
    let end_x = if wraps { tx + 2.0 * r } else { tx };

    let mut commands = vec![PathCommand::MoveTo(start_x, sy)];
    if corner_radius > 0.0 {
        let c = corner_radius;
        let before_corner = if dy > 0.0 { ty - c } else { ty + c };
        let after_corner = if wraps { start_x - c } else { start_x + c };
        commands.push(PathCommand::VerticalTo(before_corner));
        commands.push(PathCommand::QuadTo {
            control: (start_x, ty),
            end: (after_corner, ty),
        });
    } else {
        commands.push(PathCommand::VerticalTo(ty));
    }
    commands.push(PathCommand::HorizontalTo(end_x));

    EdgePath::new(RouteKind::Corner, commands)
}

/// Direct line between the two anchors.
pub fn route_straight(source: (f32, f32), target: (f32, f32)) -> EdgePath {
    EdgePath::new(
        RouteKind::Straight,
        vec![
            PathCommand::MoveTo(source.0, source.1),
            PathCommand::LineTo(target.0, target.1),
        ],
    )
}

/// Routes a connector in the given style.
pub fn route_edge(
    style: EdgeStyle,
    source: (f32, f32),
    target: (f32, f32),
    node_radius: f32,
    corner_radius: f32,
) -> EdgePath {
    match style {
        EdgeStyle::Orthogonal => route_orthogonal(source, target, node_radius),
        EdgeStyle::Rounded => route_orthogonal_rounded(source, target, node_radius, corner_radius),
        EdgeStyle::Straight => route_straight(source, target),
    }
}
