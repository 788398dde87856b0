//! Canvas document model.
//!
//! A canvas is a directed graph: nodes are ideas, annotations, images and
//! regions; edges are user-drawn connections. Region membership is not an
//! edge, it is the `parent_id` field on the child, mirroring the backend's
//! nullable foreign key.

use crate::error::ModelError;
use crate::geometry::{Bounds, Point};
use crate::id::{ConnectionId, NodeId};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

// ─── Nodes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    MasterIdea,
    SubIdea,
    Annotation,
    Image,
    Region,
}

impl NodeKind {
    pub fn is_region(self) -> bool {
        matches!(self, Self::Region)
    }

    /// Size used when a node is created without explicit dimensions.
    pub fn default_size(self) -> (f64, f64) {
        match self {
            Self::MasterIdea => (200.0, 100.0),
            Self::SubIdea => (160.0, 80.0),
            Self::Annotation => (160.0, 100.0),
            Self::Image => (200.0, 150.0),
            Self::Region => (400.0, 300.0),
        }
    }
}

/// Visual style. Only `color` is interpreted; other keys pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
}

impl Node {
    /// A bare node of `kind` at `(x, y)` with the kind's default size.
    pub fn new(id: NodeId, kind: NodeKind, x: f64, y: f64) -> Self {
        let (width, height) = kind.default_size();
        Self {
            id,
            kind,
            x,
            y,
            width,
            height,
            parent_id: None,
            content: None,
            style: None,
        }
    }

    pub fn is_region(&self) -> bool {
        self.kind.is_region()
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    pub fn set_bounds(&mut self, b: Bounds) {
        self.x = b.x;
        self.y = b.y;
        self.width = b.width;
        self.height = b.height;
    }

    pub fn apply_patch(&mut self, patch: &NodePatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(w) = patch.width {
            self.width = w;
        }
        if let Some(h) = patch.height {
            self.height = h;
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(parent) = patch.parent_id {
            self.parent_id = parent;
        }
        if let Some(style) = &patch.style {
            self.style = style.clone();
        }
    }

    /// Current values of exactly the fields `patch` would overwrite.
    ///
    /// Applying the snapshot after the patch restores the node.
    pub fn snapshot(&self, patch: &NodePatch) -> NodePatch {
        NodePatch {
            x: patch.x.map(|_| self.x),
            y: patch.y.map(|_| self.y),
            width: patch.width.map(|_| self.width),
            height: patch.height.map(|_| self.height),
            content: patch.content.as_ref().map(|_| self.content.clone()),
            parent_id: patch.parent_id.map(|_| self.parent_id),
            style: patch.style.as_ref().map(|_| self.style.clone()),
        }
    }
}

/// Partial node update, the body of `updateNode`.
///
/// Nullable fields (`content`, `parent_id`, `style`) are doubly optional:
/// `None` leaves the field alone, `Some(None)` clears it (serialized as `null`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub content: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub parent_id: Option<Option<NodeId>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable"
    )]
    pub style: Option<Option<NodeStyle>>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl NodePatch {
    pub fn position(p: Point) -> Self {
        Self {
            x: Some(p.x),
            y: Some(p.y),
            ..Self::default()
        }
    }

    pub fn bounds(b: Bounds) -> Self {
        Self {
            x: Some(b.x),
            y: Some(b.y),
            width: Some(b.width),
            height: Some(b.height),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: Option<NodeId>) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether all four geometry fields are set.
    pub fn sets_bounds(&self) -> bool {
        self.x.is_some() && self.y.is_some() && self.width.is_some() && self.height.is_some()
    }

    /// Fold a later patch into this one; fields set in `newer` win.
    pub fn merge(&mut self, newer: NodePatch) {
        if newer.x.is_some() {
            self.x = newer.x;
        }
        if newer.y.is_some() {
            self.y = newer.y;
        }
        if newer.width.is_some() {
            self.width = newer.width;
        }
        if newer.height.is_some() {
            self.height = newer.height;
        }
        if newer.content.is_some() {
            self.content = newer.content;
        }
        if newer.parent_id.is_some() {
            self.parent_id = newer.parent_id;
        }
        if newer.style.is_some() {
            self.style = newer.style;
        }
    }
}

/// Body of `addNode`. The server assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
}

impl NewNode {
    pub fn new(kind: NodeKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            x,
            y,
            width: None,
            height: None,
            content: None,
            color: None,
            parent_id: None,
        }
    }

    pub fn with_bounds(kind: NodeKind, b: Bounds) -> Self {
        Self {
            width: Some(b.width),
            height: Some(b.height),
            ..Self::new(kind, b.x, b.y)
        }
    }

    /// Materialize with a server-assigned id.
    pub fn into_node(self, id: NodeId) -> Node {
        let (dw, dh) = self.kind.default_size();
        Node {
            id,
            kind: self.kind,
            x: self.x,
            y: self.y,
            width: self.width.unwrap_or(dw),
            height: self.height.unwrap_or(dh),
            parent_id: self.parent_id,
            content: self.content,
            style: self.color.map(|color| NodeStyle {
                color: Some(color),
                ..NodeStyle::default()
            }),
        }
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

/// Directed edge between two nodes. Anchor points are derived, not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Body of `addConnection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConnection {
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl NewConnection {
    pub fn into_connection(self, id: ConnectionId) -> Connection {
        Connection {
            id,
            from_node_id: self.from_node_id,
            to_node_id: self.to_node_id,
            label: self.label,
        }
    }
}

/// Wire shape returned by `getCanvas`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Canvas {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

// ─── Document ────────────────────────────────────────────────────────────

/// Everything `remove_node` took out, enough to put it back.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub node: Node,
    /// Position in draw order at removal time.
    pub z_index: usize,
    pub connections: Vec<Connection>,
    /// Former children whose `parent_id` was cleared.
    pub orphaned: Vec<NodeId>,
}

/// In-memory canvas: nodes, connections, and draw order.
#[derive(Debug, Clone, Default)]
pub struct CanvasDocument {
    pub id: String,
    pub name: Option<String>,
    graph: StableDiGraph<Node, Connection>,
    node_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<ConnectionId, EdgeIndex>,
    /// Draw order, back to front.
    order: Vec<NodeId>,
}

impl CanvasDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Build from the wire shape. Duplicate node ids keep the last copy;
    /// connections with a missing endpoint are dropped.
    pub fn from_canvas(canvas: Canvas) -> Self {
        let mut doc = Self::new(canvas.id);
        doc.name = canvas.name;
        for node in canvas.nodes {
            if doc.insert_node(node.clone()) {
                log::warn!("canvas {}: duplicate node {}", doc.id, node.id);
            }
        }
        for conn in canvas.connections {
            let id = conn.id;
            if let Err(e) = doc.insert_connection(conn) {
                log::warn!("canvas {}: dropping connection {id}: {e}", doc.id);
            }
        }
        log::debug!(
            "loaded canvas {} ({} nodes, {} connections)",
            doc.id,
            doc.node_count(),
            doc.connection_count()
        );
        doc
    }

    pub fn to_canvas(&self) -> Canvas {
        Canvas {
            id: self.id.clone(),
            name: self.name.clone(),
            nodes: self.nodes().cloned().collect(),
            connections: self.connections().cloned().collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn connection_count(&self) -> usize {
        self.edge_index.len()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index
            .get(&id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let idx = *self.node_index.get(&id)?;
        self.graph.node_weight_mut(idx)
    }

    /// Nodes in draw order, back to front.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.node(*id))
    }

    pub fn regions(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.nodes().filter(|n| n.is_region())
    }

    /// Nodes whose `parent_id` is `region`.
    pub fn children_of(&self, region: NodeId) -> SmallVec<[NodeId; 8]> {
        self.nodes()
            .filter(|n| n.parent_id == Some(region))
            .map(|n| n.id)
            .collect()
    }

    /// Insert or replace a node. Returns `true` if a node with the same id
    /// was replaced (its draw position is kept).
    pub fn insert_node(&mut self, node: Node) -> bool {
        self.insert_node_at(node, usize::MAX)
    }

    fn insert_node_at(&mut self, node: Node, z_index: usize) -> bool {
        let id = node.id;
        if let Some(&idx) = self.node_index.get(&id) {
            self.graph[idx] = node;
            return true;
        }
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        let at = z_index.min(self.order.len());
        self.order.insert(at, id);
        false
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.edge_index
            .get(&id)
            .and_then(|&idx| self.graph.edge_weight(idx))
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        let idx = *self.edge_index.get(&id)?;
        self.graph.edge_weight_mut(idx)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.graph.edge_weights()
    }

    /// Connections touching `node` in either direction.
    pub fn connections_of(&self, node: NodeId) -> Vec<&Connection> {
        let Some(&idx) = self.node_index.get(&node) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| e.weight())
            .collect()
    }

    pub fn insert_connection(&mut self, conn: Connection) -> Result<(), ModelError> {
        if conn.from_node_id == conn.to_node_id {
            return Err(ModelError::SelfConnection(conn.id, conn.from_node_id));
        }
        let from = *self
            .node_index
            .get(&conn.from_node_id)
            .ok_or(ModelError::UnknownNode(conn.from_node_id))?;
        let to = *self
            .node_index
            .get(&conn.to_node_id)
            .ok_or(ModelError::UnknownNode(conn.to_node_id))?;
        if let Some(old) = self.edge_index.remove(&conn.id) {
            self.graph.remove_edge(old);
        }
        let id = conn.id;
        let idx = self.graph.add_edge(from, to, conn);
        self.edge_index.insert(id, idx);
        Ok(())
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        let idx = self.edge_index.remove(&id)?;
        self.graph.remove_edge(idx)
    }

    /// Remove a node with its connections. Children of a removed region are
    /// orphaned (their `parent_id` cleared), never deleted.
    pub fn remove_node(&mut self, id: NodeId) -> Option<RemovedNode> {
        let idx = *self.node_index.get(&id)?;

        let connections: Vec<Connection> = self.connections_of(id).into_iter().cloned().collect();
        for conn in &connections {
            self.edge_index.remove(&conn.id);
        }

        let orphaned: Vec<NodeId> = self.children_of(id).into_vec();
        for child in &orphaned {
            if let Some(node) = self.node_mut(*child) {
                node.parent_id = None;
            }
        }

        let node = self.graph.remove_node(idx)?;
        self.node_index.remove(&id);
        let z_index = self.order.iter().position(|n| *n == id).unwrap_or(0);
        self.order.retain(|n| *n != id);

        Some(RemovedNode {
            node,
            z_index,
            connections,
            orphaned,
        })
    }

    /// Undo a [`remove_node`](Self::remove_node). Orphans are re-adopted only
    /// if they still exist and have not been given another parent meanwhile.
    pub fn restore(&mut self, removed: RemovedNode) {
        let id = removed.node.id;
        self.insert_node_at(removed.node, removed.z_index);
        for child in removed.orphaned {
            if let Some(node) = self.node_mut(child)
                && node.parent_id.is_none()
            {
                node.parent_id = Some(id);
            }
        }
        for conn in removed.connections {
            let cid = conn.id;
            if let Err(e) = self.insert_connection(conn) {
                log::warn!("could not restore connection {cid}: {e}");
            }
        }
    }
}
