//! Core data types for the diagram scene.
//!
//! This module defines the nodes, edges and the [`Diagram`] that holds them, along
//! with the scene-editing operations the canvas performs.

use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for diagram nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for edges.
pub type EdgeId = Uuid;

/// Hands out node identifiers for one diagram instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeIdGenerator {
    next: u64,
}

impl Default for NodeIdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl NodeIdGenerator {
    /// Creates a generator whose first identifier is `start`.
    pub fn new(start: u64) -> Self {
        Self { next: start }
    }

    /// Returns a fresh identifier.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Ensures future identifiers do not collide with any of `nodes`.
    pub fn reserve_past(&mut self, nodes: &[DiagramNode]) {
        if let Some(max) = nodes.iter().map(|n| n.id.0).max() {
            self.next = self.next.max(max + 1);
        }
    }
}

/// Errors raised by scene-editing operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagramError {
    /// The referenced node is not part of the diagram
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    /// The referenced edge is not part of the diagram
    #[error("edge {0} does not exist")]
    UnknownEdge(EdgeId),
    /// An edge may not start and end on the same node
    #[error("node {0} cannot connect to itself")]
    SelfConnection(NodeId),
    /// The node has no schema field at this index
    #[error("node {node} has no field {index}")]
    UnknownField {
        /// Node that was addressed
        node: NodeId,
        /// Requested field index
        index: usize,
    },
}

/// Arithmetic performed by a calculation node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CalcOperator {
    /// Addition
    #[default]
    Add,
    /// Subtraction
    Subtract,
    /// Multiplication
    Multiply,
    /// Division
    Divide,
}

impl CalcOperator {
    /// All operators, in menu order.
    pub const ALL: [CalcOperator; 4] = [
        CalcOperator::Add,
        CalcOperator::Subtract,
        CalcOperator::Multiply,
        CalcOperator::Divide,
    ];

    /// Symbol shown on the node.
    pub fn symbol(self) -> &'static str {
        match self {
            CalcOperator::Add => "+",
            CalcOperator::Subtract => "-",
            CalcOperator::Multiply => "×",
            CalcOperator::Divide => "÷",
        }
    }

    /// Applies the operator to two inputs.
    ///
    /// Division by zero and any other non-finite result, including one computed
    /// from an infinite input, give [`CalcOutcome::Infinite`].
    pub fn apply(self, lhs: f64, rhs: f64) -> CalcOutcome {
        let value = match self {
            CalcOperator::Add => lhs + rhs,
            CalcOperator::Subtract => lhs - rhs,
            CalcOperator::Multiply => lhs * rhs,
            CalcOperator::Divide if rhs == 0.0 => return CalcOutcome::Infinite,
            CalcOperator::Divide => lhs / rhs,
        };
        if value.is_finite() {
            CalcOutcome::Value(value)
        } else {
            CalcOutcome::Infinite
        }
    }
}

/// Result of evaluating a calculation node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub enum CalcOutcome {
    /// Fewer than two inputs are connected
    #[default]
    MissingInputs,
    /// Division by zero, or a result that is not a finite number
    Infinite,
    /// A finite result
    Value(f64),
}

impl CalcOutcome {
    /// Numeric value passed downstream; missing inputs count as zero.
    pub fn as_number(self) -> f64 {
        match self {
            CalcOutcome::Value(v) => v,
            CalcOutcome::Infinite => f64::INFINITY,
            CalcOutcome::MissingInputs => 0.0,
        }
    }
}

impl fmt::Display for CalcOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcOutcome::MissingInputs => f.write_str("needs two inputs"),
            CalcOutcome::Infinite => f.write_str("∞"),
            CalcOutcome::Value(v) => write!(f, "{v}"),
        }
    }
}

/// One column of a database schema node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaField {
    /// Column name
    pub name: String,
    /// Declared column type, shown as a placeholder
    pub field_type: String,
    /// User-entered value
    pub text: String,
}

impl SchemaField {
    /// Creates an empty `varchar` field with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: "varchar".to_string(),
            text: String::new(),
        }
    }
}

/// The kind-specific data of a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NodeKind {
    /// A circular activity with one entry and one exit handle
    Activity {
        /// Who carries out the activity
        assignee: String,
        /// Duration in days
        duration: f32,
        /// Value passed to downstream nodes
        value: f64,
    },
    /// Combines two inputs with an operator
    Calculation {
        /// The arithmetic operator
        operator: CalcOperator,
        /// Cached result of the last evaluation
        result: CalcOutcome,
    },
    /// A table with one exit handle per field
    DatabaseSchema {
        /// Table name shown in the header
        table_name: String,
        /// Columns of the table
        fields: Vec<SchemaField>,
    },
}

impl NodeKind {
    /// A default activity.
    pub fn activity() -> Self {
        NodeKind::Activity {
            assignee: "nothing".to_string(),
            duration: 0.0,
            value: 0.0,
        }
    }

    /// A default calculation.
    pub fn calculation() -> Self {
        NodeKind::Calculation {
            operator: CalcOperator::Add,
            result: CalcOutcome::MissingInputs,
        }
    }

    /// A default schema table with two fields.
    pub fn database_schema() -> Self {
        NodeKind::DatabaseSchema {
            table_name: "table".to_string(),
            fields: vec![SchemaField::new("field_1"), SchemaField::new("field_2")],
        }
    }

    /// Short type name for panels and lists.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Activity { .. } => "Activity",
            NodeKind::Calculation { .. } => "Calculation",
            NodeKind::DatabaseSchema { .. } => "Database",
        }
    }
}

/// A single node in the diagram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagramNode {
    /// Unique identifier for this node
    pub id: NodeId,
    /// User-displayable label
    pub label: String,
    /// Centre of the node on the canvas
    pub position: (f32, f32),
    /// The type and data of this node
    pub kind: NodeKind,
}

impl DiagramNode {
    /// Creates a node.
    pub fn new(id: NodeId, label: impl Into<String>, position: (f32, f32), kind: NodeKind) -> Self {
        Self {
            id,
            label: label.into(),
            position,
            kind,
        }
    }

    /// Rendered width and height in world units.
    pub fn size(&self) -> (f32, f32) {
        match &self.kind {
            NodeKind::Activity { .. } => (ACTIVITY_NODE_DIAMETER, ACTIVITY_NODE_DIAMETER),
            NodeKind::Calculation { .. } => (CALCULATION_NODE_WIDTH, CALCULATION_NODE_HEIGHT),
            NodeKind::DatabaseSchema { fields, .. } => (
                SCHEMA_NODE_WIDTH,
                SCHEMA_HEADER_HEIGHT + SCHEMA_ROW_HEIGHT * fields.len().max(1) as f32,
            ),
        }
    }

    /// Returns true if the world-space point lies inside the node.
    pub fn contains(&self, point: (f32, f32)) -> bool {
        let (w, h) = self.size();
        let (dx, dy) = (point.0 - self.position.0, point.1 - self.position.1);
        match self.kind {
            NodeKind::Activity { .. } => dx * dx + dy * dy <= (w / 2.0) * (w / 2.0),
            _ => dx.abs() <= w / 2.0 && dy.abs() <= h / 2.0,
        }
    }

    /// Number of exit handles.
    pub fn source_handle_count(&self) -> usize {
        match &self.kind {
            NodeKind::DatabaseSchema { fields, .. } => fields.len(),
            _ => 1,
        }
    }

    /// Number of entry handles.
    pub fn target_handle_count(&self) -> usize {
        match self.kind {
            NodeKind::Calculation { .. } => 2,
            _ => 1,
        }
    }

    /// Vertical offset from the node centre of handle `index` out of `count`.
    fn handle_offset_y(&self, index: usize, count: usize) -> f32 {
        let (_, h) = self.size();
        match &self.kind {
            NodeKind::DatabaseSchema { .. } if count > 0 => {
                -h / 2.0 + SCHEMA_HEADER_HEIGHT + SCHEMA_ROW_HEIGHT * (index as f32 + 0.5)
            }
            _ if count > 1 => h * ((index as f32 + 1.0) / (count as f32 + 1.0) - 0.5),
            _ => 0.0,
        }
    }

    /// World position of an exit handle on the right side of the node.
    pub fn source_anchor(&self, handle: Option<usize>) -> (f32, f32) {
        let (w, _) = self.size();
        let count = self.source_handle_count();
        let index = handle.unwrap_or(0).min(count.saturating_sub(1));
        (
            self.position.0 + w / 2.0 + HANDLE_MARGIN,
            self.position.1 + self.handle_offset_y(index, count),
        )
    }

    /// World position of an entry handle on the left side of the node.
    pub fn target_anchor(&self, handle: Option<usize>) -> (f32, f32) {
        let (w, _) = self.size();
        let count = self.target_handle_count();
        let index = handle.unwrap_or(0).min(count.saturating_sub(1));
        let offset = match self.kind {
            NodeKind::DatabaseSchema { .. } => 0.0,
            _ => self.handle_offset_y(index, count),
        };
        (self.position.0 - w / 2.0 - HANDLE_MARGIN, self.position.1 + offset)
    }

    /// Exit handle whose anchor is vertically closest to `y`.
    pub fn nearest_source_handle(&self, y: f32) -> usize {
        nearest_handle(self.source_handle_count(), y, |i| self.source_anchor(Some(i)).1)
    }

    /// Entry handle whose anchor is vertically closest to `y`.
    pub fn nearest_target_handle(&self, y: f32) -> usize {
        nearest_handle(self.target_handle_count(), y, |i| self.target_anchor(Some(i)).1)
    }

    /// Value this node passes downstream through the given exit handle.
    ///
    /// Schema fields are parsed as numbers; text that is not numeric counts as zero.
    pub fn output_value(&self, handle: Option<usize>) -> f64 {
        match &self.kind {
            NodeKind::Activity { value, .. } => *value,
            NodeKind::Calculation { result, .. } => result.as_number(),
            NodeKind::DatabaseSchema { fields, .. } => fields
                .get(handle.unwrap_or(0))
                .and_then(|f| f.text.trim().parse::<f64>().ok())
                .unwrap_or(0.0),
        }
    }
}

fn nearest_handle(count: usize, y: f32, anchor_y: impl Fn(usize) -> f32) -> usize {
    (0..count)
        .min_by(|a, b| {
            let da = (anchor_y(*a) - y).abs();
            let db = (anchor_y(*b) - y).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(0)
}

/// A directed connection between two node handles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Node the edge leaves from
    pub source: NodeId,
    /// Node the edge enters
    pub target: NodeId,
    /// Exit handle on the source node
    pub source_handle: Option<usize>,
    /// Entry handle on the target node
    pub target_handle: Option<usize>,
}

impl Edge {
    /// Creates an edge with a fresh identifier.
    pub fn new(
        source: NodeId,
        target: NodeId,
        source_handle: Option<usize>,
        target_handle: Option<usize>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            target,
            source_handle,
            target_handle,
        }
    }

    /// Returns true if the edge starts or ends on the node.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }

    fn same_target_slot(&self, target: NodeId, handle: Option<usize>) -> bool {
        self.target == target && self.target_handle.unwrap_or(0) == handle.unwrap_or(0)
    }
}

/// The scene: ordered nodes and edges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Diagram {
    /// Nodes in drawing order
    pub nodes: Vec<DiagramNode>,
    /// Edges in drawing order
    pub edges: Vec<Edge>,
}

impl Diagram {
    /// Creates an empty diagram.
    pub fn new() -> Self {
        Self::default()
    }

    /// The scene a new editor starts with: one activity node at the origin.
    pub fn initial() -> Self {
        Self {
            nodes: vec![DiagramNode::new(NodeId(0), "0", (0.0, 0.0), NodeKind::activity())],
            edges: Vec::new(),
        }
    }

    /// Adds a node, returning its identifier.
    pub fn add_node(&mut self, node: DiagramNode) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&DiagramNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Looks up a node for editing.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut DiagramNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Looks up an edge.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Removes a node and every edge that touches it.
    ///
    /// # Returns
    ///
    /// The removed node, or `None` if it did not exist.
    pub fn remove_node(&mut self, id: NodeId) -> Option<DiagramNode> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(index);
        self.edges.retain(|e| !e.touches(id));
        Some(node)
    }

    /// Connects two node handles.
    ///
    /// A target handle accepts one edge: an existing edge into the same handle is
    /// replaced.
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        source_handle: Option<usize>,
        target_handle: Option<usize>,
    ) -> Result<EdgeId, DiagramError> {
        if self.node(source).is_none() {
            return Err(DiagramError::UnknownNode(source));
        }
        if self.node(target).is_none() {
            return Err(DiagramError::UnknownNode(target));
        }
        if source == target {
            return Err(DiagramError::SelfConnection(source));
        }

        self.edges.retain(|e| !e.same_target_slot(target, target_handle));
        let edge = Edge::new(source, target, source_handle, target_handle);
        let id = edge.id;
        self.edges.push(edge);
        Ok(id)
    }

    /// Moves the target end of an edge to another node handle.
    pub fn reconnect(
        &mut self,
        edge_id: EdgeId,
        new_target: NodeId,
        new_target_handle: Option<usize>,
    ) -> Result<(), DiagramError> {
        let source = self
            .edge(edge_id)
            .map(|e| e.source)
            .ok_or(DiagramError::UnknownEdge(edge_id))?;
        if self.node(new_target).is_none() {
            return Err(DiagramError::UnknownNode(new_target));
        }
        if source == new_target {
            return Err(DiagramError::SelfConnection(source));
        }

        self.edges
            .retain(|e| e.id == edge_id || !e.same_target_slot(new_target, new_target_handle));
        if let Some(edge) = self.edges.iter_mut().find(|e| e.id == edge_id) {
            edge.target = new_target;
            edge.target_handle = new_target_handle;
        }
        Ok(())
    }

    /// Removes an edge.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, DiagramError> {
        let index = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or(DiagramError::UnknownEdge(id))?;
        Ok(self.edges.remove(index))
    }

    /// Changes a node's label.
    pub fn rename_node(&mut self, id: NodeId, label: impl Into<String>) -> Result<(), DiagramError> {
        let node = self.node_mut(id).ok_or(DiagramError::UnknownNode(id))?;
        node.label = label.into();
        Ok(())
    }

    /// Moves a node.
    pub fn set_node_position(&mut self, id: NodeId, position: (f32, f32)) -> Result<(), DiagramError> {
        let node = self.node_mut(id).ok_or(DiagramError::UnknownNode(id))?;
        node.position = position;
        Ok(())
    }

    /// Appends a field named `field_<n>` to a schema node.
    ///
    /// # Returns
    ///
    /// The index of the new field. Nodes of other kinds are left unchanged and
    /// report [`DiagramError::UnknownField`].
    pub fn add_schema_field(&mut self, id: NodeId) -> Result<usize, DiagramError> {
        let node = self.node_mut(id).ok_or(DiagramError::UnknownNode(id))?;
        match &mut node.kind {
            NodeKind::DatabaseSchema { fields, .. } => {
                fields.push(SchemaField::new(format!("field_{}", fields.len() + 1)));
                Ok(fields.len() - 1)
            }
            _ => Err(DiagramError::UnknownField { node: id, index: 0 }),
        }
    }

    /// Sets the user-entered text of a schema field.
    pub fn set_schema_field_text(
        &mut self,
        id: NodeId,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), DiagramError> {
        let node = self.node_mut(id).ok_or(DiagramError::UnknownNode(id))?;
        match &mut node.kind {
            NodeKind::DatabaseSchema { fields, .. } => {
                let field = fields
                    .get_mut(index)
                    .ok_or(DiagramError::UnknownField { node: id, index })?;
                field.text = text.into();
                Ok(())
            }
            _ => Err(DiagramError::UnknownField { node: id, index }),
        }
    }

    /// Edges entering the node, ordered by entry handle.
    pub fn incoming(&self, id: NodeId) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges.iter().filter(|e| e.target == id).collect();
        edges.sort_by_key(|e| e.target_handle.unwrap_or(0));
        edges
    }

    /// Evaluates a calculation node from its first two inputs.
    ///
    /// Nodes that are not calculations evaluate to [`CalcOutcome::MissingInputs`].
    pub fn evaluate_calculation(&self, id: NodeId) -> Result<CalcOutcome, DiagramError> {
        let node = self.node(id).ok_or(DiagramError::UnknownNode(id))?;
        let NodeKind::Calculation { operator, .. } = node.kind else {
            return Ok(CalcOutcome::MissingInputs);
        };

        let inputs: Vec<f64> = self
            .incoming(id)
            .into_iter()
            .filter_map(|e| self.node(e.source).map(|n| n.output_value(e.source_handle)))
            .take(2)
            .collect();

        match inputs.as_slice() {
            [lhs, rhs] => Ok(operator.apply(*lhs, *rhs)),
            _ => Ok(CalcOutcome::MissingInputs),
        }
    }

    /// Refreshes the cached result of every calculation node.
    ///
    /// Runs at most one pass per node so that chained calculations settle while
    /// cycles cannot loop forever.
    ///
    /// # Returns
    ///
    /// `true` if any cached result changed.
    pub fn recompute_calculations(&mut self) -> bool {
        let ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Calculation { .. }))
            .map(|n| n.id)
            .collect();

        let mut any_changed = false;
        for _ in 0..ids.len().max(1) {
            let mut changed = false;
            for id in &ids {
                let Ok(outcome) = self.evaluate_calculation(*id) else {
                    continue;
                };
                if let Some(NodeKind::Calculation { result, .. }) =
                    self.node_mut(*id).map(|n| &mut n.kind)
                {
                    if *result != outcome {
                        *result = outcome;
                        changed = true;
                    }
                }
            }
            any_changed |= changed;
            if !changed {
                break;
            }
        }
        any_changed
    }

    /// Axis-aligned bounds of all nodes as `(min, max)`, or `None` when empty.
    pub fn bounds(&self) -> Option<((f32, f32), (f32, f32))> {
        self.nodes.iter().fold(None, |acc, node| {
            let (w, h) = node.size();
            let min = (node.position.0 - w / 2.0, node.position.1 - h / 2.0);
            let max = (node.position.0 + w / 2.0, node.position.1 + h / 2.0);
            Some(match acc {
                None => (min, max),
                Some((lo, hi)) => (
                    (lo.0.min(min.0), lo.1.min(min.1)),
                    (hi.0.max(max.0), hi.1.max(max.1)),
                ),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(id: u64, position: (f32, f32)) -> DiagramNode {
        DiagramNode::new(NodeId(id), id.to_string(), position, NodeKind::activity())
    }

    fn schema(id: u64, values: &[&str]) -> DiagramNode {
        DiagramNode::new(
            NodeId(id),
            "table",
            (0.0, 0.0),
            NodeKind::DatabaseSchema {
                table_name: "t".to_string(),
                fields: values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| SchemaField {
                        text: v.to_string(),
                        ..SchemaField::new(format!("field_{}", i + 1))
                    })
                    .collect(),
            },
        )
    }

    fn calculation(id: u64, operator: CalcOperator) -> DiagramNode {
        DiagramNode::new(
            NodeId(id),
            "calc",
            (300.0, 0.0),
            NodeKind::Calculation {
                operator,
                result: CalcOutcome::MissingInputs,
            },
        )
    }

    #[test]
    fn id_generator_is_sequential_and_per_instance() {
        let mut a = NodeIdGenerator::default();
        let mut b = NodeIdGenerator::default();

        assert_eq!(a.next_id(), NodeId(1));
        assert_eq!(a.next_id(), NodeId(2));
        assert_eq!(b.next_id(), NodeId(1));
    }

    #[test]
    fn id_generator_skips_restored_ids() {
        let mut ids = NodeIdGenerator::new(1);
        ids.reserve_past(&[activity(0, (0.0, 0.0)), activity(7, (0.0, 0.0))]);
        assert_eq!(ids.next_id(), NodeId(8));

        // Never moves backwards.
        ids.reserve_past(&[activity(2, (0.0, 0.0))]);
        assert_eq!(ids.next_id(), NodeId(9));
    }

    #[test]
    fn initial_diagram_has_one_activity() {
        let diagram = Diagram::initial();
        assert_eq!(diagram.nodes.len(), 1);
        assert_eq!(diagram.nodes[0].label, "0");
        assert_eq!(diagram.nodes[0].position, (0.0, 0.0));
        assert!(diagram.edges.is_empty());
    }

    #[test]
    fn connect_rejects_unknown_and_self_connections() {
        let mut diagram = Diagram::new();
        let a = diagram.add_node(activity(1, (0.0, 0.0)));

        assert_eq!(
            diagram.connect(a, NodeId(9), None, None),
            Err(DiagramError::UnknownNode(NodeId(9)))
        );
        assert_eq!(
            diagram.connect(NodeId(9), a, None, None),
            Err(DiagramError::UnknownNode(NodeId(9)))
        );
        assert_eq!(
            diagram.connect(a, a, None, None),
            Err(DiagramError::SelfConnection(a))
        );
        assert!(diagram.edges.is_empty());
    }

    #[test]
    fn connect_replaces_edge_into_same_target_handle() {
        let mut diagram = Diagram::new();
        let a = diagram.add_node(activity(1, (0.0, 0.0)));
        let b = diagram.add_node(activity(2, (100.0, 0.0)));
        let c = diagram.add_node(calculation(3, CalcOperator::Add));

        diagram.connect(a, c, None, Some(0)).unwrap();
        diagram.connect(b, c, None, Some(1)).unwrap();
        assert_eq!(diagram.edges.len(), 2);

        let replacement = diagram.connect(b, c, None, Some(0)).unwrap();
        assert_eq!(diagram.edges.len(), 2);
        assert!(diagram.edges.iter().all(|e| e.source == b));
        assert!(diagram.edge(replacement).is_some());
    }

    #[test]
    fn remove_node_removes_touching_edges() {
        let mut diagram = Diagram::new();
        let a = diagram.add_node(activity(1, (0.0, 0.0)));
        let b = diagram.add_node(activity(2, (100.0, 0.0)));
        let c = diagram.add_node(activity(3, (200.0, 0.0)));
        diagram.connect(a, b, None, None).unwrap();
        diagram.connect(b, c, None, None).unwrap();
        let keep = diagram.connect(a, c, None, None);
        // a -> c replaced b -> c because activities have a single entry handle
        assert!(keep.is_ok());

        let removed = diagram.remove_node(b).expect("node exists");

        assert_eq!(removed.id, b);
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].source, a);
        assert_eq!(diagram.edges[0].target, c);
        assert!(diagram.remove_node(b).is_none());
    }

    #[test]
    fn reconnect_moves_target_end() {
        let mut diagram = Diagram::new();
        let a = diagram.add_node(activity(1, (0.0, 0.0)));
        let b = diagram.add_node(activity(2, (100.0, 0.0)));
        let c = diagram.add_node(activity(3, (200.0, 0.0)));
        let edge = diagram.connect(a, b, None, None).unwrap();

        diagram.reconnect(edge, c, None).unwrap();
        assert_eq!(diagram.edge(edge).map(|e| e.target), Some(c));

        assert_eq!(
            diagram.reconnect(edge, a, None),
            Err(DiagramError::SelfConnection(a))
        );
        let missing = Uuid::new_v4();
        assert_eq!(
            diagram.reconnect(missing, c, None),
            Err(DiagramError::UnknownEdge(missing))
        );
    }

    #[test]
    fn remove_edge_reports_unknown_edge() {
        let mut diagram = Diagram::new();
        let a = diagram.add_node(activity(1, (0.0, 0.0)));
        let b = diagram.add_node(activity(2, (100.0, 0.0)));
        let edge = diagram.connect(a, b, None, None).unwrap();

        assert_eq!(diagram.remove_edge(edge).map(|e| e.id), Ok(edge));
        assert_eq!(diagram.remove_edge(edge), Err(DiagramError::UnknownEdge(edge)));
    }

    #[test]
    fn rename_and_move_nodes() {
        let mut diagram = Diagram::new();
        let a = diagram.add_node(activity(1, (0.0, 0.0)));

        diagram.rename_node(a, "Start").unwrap();
        diagram.set_node_position(a, (40.0, -20.0)).unwrap();

        let node = diagram.node(a).unwrap();
        assert_eq!(node.label, "Start");
        assert_eq!(node.position, (40.0, -20.0));
        assert_eq!(
            diagram.rename_node(NodeId(5), "x"),
            Err(DiagramError::UnknownNode(NodeId(5)))
        );
    }

    #[test]
    fn schema_fields_can_be_added_and_edited() {
        let mut diagram = Diagram::new();
        let t = diagram.add_node(schema(1, &["1"]));

        assert_eq!(diagram.add_schema_field(t), Ok(1));
        diagram.set_schema_field_text(t, 1, "42").unwrap();

        let node = diagram.node(t).unwrap();
        match &node.kind {
            NodeKind::DatabaseSchema { fields, .. } => {
                assert_eq!(fields[1].name, "field_2");
                assert_eq!(fields[1].text, "42");
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(
            diagram.set_schema_field_text(t, 5, "x"),
            Err(DiagramError::UnknownField { node: t, index: 5 })
        );
    }

    #[test]
    fn calculation_reads_schema_fields_through_handles() {
        let mut diagram = Diagram::new();
        let t = diagram.add_node(schema(1, &["6", "3", "oops"]));
        let c = diagram.add_node(calculation(2, CalcOperator::Divide));

        assert_eq!(diagram.evaluate_calculation(c), Ok(CalcOutcome::MissingInputs));

        diagram.connect(t, c, Some(0), Some(0)).unwrap();
        diagram.connect(t, c, Some(1), Some(1)).unwrap();
        assert_eq!(diagram.evaluate_calculation(c), Ok(CalcOutcome::Value(2.0)));

        diagram.connect(t, c, Some(2), Some(1)).unwrap();
        assert_eq!(diagram.evaluate_calculation(c), Ok(CalcOutcome::Infinite));
    }

    #[test]
    fn operators_apply() {
        assert_eq!(CalcOperator::Add.apply(2.0, 3.0), CalcOutcome::Value(5.0));
        assert_eq!(CalcOperator::Subtract.apply(2.0, 3.0), CalcOutcome::Value(-1.0));
        assert_eq!(CalcOperator::Multiply.apply(2.0, 3.0), CalcOutcome::Value(6.0));
        assert_eq!(CalcOperator::Divide.apply(3.0, 0.0), CalcOutcome::Infinite);
        assert_eq!(CalcOutcome::Infinite.to_string(), "∞");
    }

    #[test]
    fn non_finite_results_stay_infinite() {
        assert_eq!(CalcOperator::Add.apply(f64::INFINITY, 1.0), CalcOutcome::Infinite);
        assert_eq!(
            CalcOperator::Subtract.apply(f64::INFINITY, f64::INFINITY),
            CalcOutcome::Infinite
        );
        assert_eq!(CalcOperator::Multiply.apply(f64::MAX, 2.0), CalcOutcome::Infinite);
        assert_eq!(CalcOperator::Add.apply(f64::NAN, 1.0), CalcOutcome::Infinite);
    }

    #[test]
    fn division_by_zero_feeding_another_calculation_settles() {
        let mut diagram = Diagram::new();
        let t = diagram.add_node(schema(1, &["1", "0"]));
        let div = diagram.add_node(calculation(2, CalcOperator::Divide));
        let sub = diagram.add_node(calculation(3, CalcOperator::Subtract));

        diagram.connect(t, div, Some(0), Some(0)).unwrap();
        diagram.connect(t, div, Some(1), Some(1)).unwrap();
        diagram.connect(div, sub, None, Some(0)).unwrap();
        diagram.connect(div, sub, None, Some(1)).unwrap();

        assert!(diagram.recompute_calculations());
        assert!(!diagram.recompute_calculations());

        let result = |id| match diagram.node(id).map(|n| &n.kind) {
            Some(NodeKind::Calculation { result, .. }) => *result,
            _ => CalcOutcome::MissingInputs,
        };
        assert_eq!(result(div), CalcOutcome::Infinite);
        assert_eq!(result(sub), CalcOutcome::Infinite);
    }

    #[test]
    fn recompute_settles_chained_calculations() {
        let mut diagram = Diagram::new();
        let t = diagram.add_node(schema(1, &["2", "5"]));
        // Downstream calculation comes first so one pass is not enough.
        let outer = diagram.add_node(calculation(3, CalcOperator::Multiply));
        let inner = diagram.add_node(calculation(2, CalcOperator::Add));
        let k = diagram.add_node(schema(4, &["10"]));

        diagram.connect(t, inner, Some(0), Some(0)).unwrap();
        diagram.connect(t, inner, Some(1), Some(1)).unwrap();
        diagram.connect(inner, outer, None, Some(0)).unwrap();
        diagram.connect(k, outer, Some(0), Some(1)).unwrap();

        assert!(diagram.recompute_calculations());

        let result = |id| match diagram.node(id).map(|n| &n.kind) {
            Some(NodeKind::Calculation { result, .. }) => *result,
            _ => CalcOutcome::MissingInputs,
        };
        assert_eq!(result(inner), CalcOutcome::Value(7.0));
        assert_eq!(result(outer), CalcOutcome::Value(70.0));
        assert!(!diagram.recompute_calculations());
    }

    #[test]
    fn anchors_sit_outside_the_node_boundary() {
        let node = activity(1, (100.0, 50.0));
        assert_eq!(node.source_anchor(None), (134.0, 50.0));
        assert_eq!(node.target_anchor(None), (66.0, 50.0));
        assert!(node.contains((100.0, 79.0)));
        assert!(!node.contains((125.0, 75.0)));
    }

    #[test]
    fn schema_handles_follow_field_rows() {
        let node = schema(1, &["a", "b"]);
        let (_, h) = node.size();
        assert_eq!(h, SCHEMA_HEADER_HEIGHT + 2.0 * SCHEMA_ROW_HEIGHT);

        let first = node.source_anchor(Some(0)).1;
        let second = node.source_anchor(Some(1)).1;
        assert_eq!(second - first, SCHEMA_ROW_HEIGHT);
        assert_eq!(node.nearest_source_handle(second + 2.0), 1);
        assert_eq!(node.nearest_source_handle(first - 50.0), 0);
    }

    #[test]
    fn calculation_has_two_entry_handles() {
        let node = calculation(1, CalcOperator::Add);
        let upper = node.target_anchor(Some(0)).1;
        let lower = node.target_anchor(Some(1)).1;
        assert!(upper < lower);
        assert_eq!(node.nearest_target_handle(lower + 1.0), 1);
    }

    #[test]
    fn bounds_cover_all_nodes() {
        let mut diagram = Diagram::new();
        assert!(diagram.bounds().is_none());
        diagram.add_node(activity(1, (0.0, 0.0)));
        diagram.add_node(activity(2, (100.0, 200.0)));

        assert_eq!(diagram.bounds(), Some(((-30.0, -30.0), (130.0, 230.0))));
    }

    #[test]
    fn diagram_serializes_for_snapshots() {
        let mut diagram = Diagram::initial();
        diagram.add_node(schema(1, &["3"]));

        let json = serde_json::to_string(&diagram).unwrap();
        let restored: Diagram = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, diagram);
    }
}
