//! Editor session: the single owner of canvas editing state.
//!
//! All state changes go through [`EditorSession::apply`] as a [`Command`].
//! Applying a command mutates the local document optimistically and
//! returns the persistence work it implies as [`Effect`]s; executing those
//! effects against a backend is the controller's job. This keeps the
//! session synchronous and testable without a server.
//!
//! Persistence routes:
//!
//! - Plain moves and resizes are **queued** for coalesced autosave.
//! - Region membership changes and resize cascades are **persisted now**,
//!   each write carrying the snapshot needed to roll it back.
//! - Creations wait for the server-assigned id before touching the document.

use crate::input::InputEvent;
use crate::interaction::{FrameUpdate, Gesture, Interaction, InteractionMode, Preview};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use ideaflow_core::containment::{
    cascade_move, plan_resize_cascade, region_containing, resolve_parent,
};
use ideaflow_core::geometry::{Bounds, Point};
use ideaflow_core::{
    Canvas, CanvasDocument, Connection, ConnectionId, EditorConfig, HitTarget, NewConnection,
    NewNode, Node, NodeId, NodeKind, NodePatch, RemovedNode, Viewport, ZoomDirection,
    closest_anchors, hit_test,
};

/// A state change request. Produced by the interaction machine or issued
/// directly by the host (toolbar buttons, property panels, tests).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Move the stage by a screen-space delta.
    Pan { dx: f64, dy: f64 },
    /// One zoom step anchored at a screen-space pointer.
    Zoom {
        pointer: Point,
        direction: ZoomDirection,
    },
    ResetView,
    SetMode(InteractionMode),
    Select(Option<NodeId>),
    /// Live drag step. Regions carry their children along.
    MoveNodeBy { id: NodeId, dx: f64, dy: f64 },
    /// End of a drag that started with the node at `origin`.
    FinishDrag { id: NodeId, origin: Point },
    /// Programmatic move: a whole drag in one command.
    MoveNodeTo { id: NodeId, position: Point },
    /// Live resize step.
    ResizeNode { id: NodeId, bounds: Bounds },
    /// End of a resize that started from `original`.
    FinishResize { id: NodeId, original: Bounds },
    CreateRegion { bounds: Bounds },
    AddNode(NewNode),
    /// A library item released over the stage at a screen position.
    DropFromLibrary { kind: NodeKind, screen: Point },
    Connect { from: NodeId, to: NodeId },
    /// Content, style or other field edits, persisted immediately.
    EditNode { id: NodeId, patch: NodePatch },
    DeleteNode(NodeId),
    DeleteSelection,
    DeleteConnection(ConnectionId),
    LabelConnection {
        id: ConnectionId,
        label: Option<String>,
    },
    /// Flush queued updates now.
    Save,
    /// Abort the current gesture and deselect.
    Cancel,
}

/// One immediate node write and how to undo it locally.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeWrite {
    pub id: NodeId,
    pub patch: NodePatch,
    /// Values the patch overwrote.
    pub previous: NodePatch,
}

/// Persistence work implied by a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Coalesce into the autosave queue.
    Queue { id: NodeId, patch: NodePatch },
    /// Persist now, as one batch; roll back all failed writes.
    Persist(Vec<NodeWrite>),
    /// Create on the server, then insert the returned node.
    CreateNode(NewNode),
    /// Create on the server, then insert the returned connection.
    CreateConnection(NewConnection),
    /// Already removed locally; restore on failure.
    DeleteNode(RemovedNode),
    /// Already removed locally; restore on failure.
    DeleteConnection(Connection),
    UpdateConnection {
        id: ConnectionId,
        label: Option<String>,
        previous: Option<String>,
    },
    /// Flush the autosave queue now.
    Flush,
}

pub struct EditorSession {
    document: CanvasDocument,
    viewport: Viewport,
    mode: InteractionMode,
    selected: Option<NodeId>,
    /// Region highlighted as the drop target of the current drag.
    hover_target: Option<NodeId>,
    interaction: Interaction,
    /// Stage size in screen pixels; keyboard zoom anchors at its centre.
    stage_size: Point,
    config: EditorConfig,
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            document: CanvasDocument::default(),
            viewport: Viewport::default(),
            mode: InteractionMode::Select,
            selected: None,
            hover_target: None,
            interaction: Interaction::new(),
            stage_size: Point::ORIGIN,
            config,
        }
    }

    pub fn from_canvas(canvas: Canvas, config: EditorConfig) -> Self {
        let mut session = Self::new(config);
        session.load(canvas);
        session
    }

    /// Switch to another canvas. View, gesture, selection and mode reset.
    pub fn load(&mut self, canvas: Canvas) {
        self.document = CanvasDocument::from_canvas(canvas);
        self.viewport.reset();
        self.interaction = Interaction::new();
        self.mode = InteractionMode::Select;
        self.selected = None;
        self.hover_target = None;
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn document(&self) -> &CanvasDocument {
        &self.document
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.document.node(id)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn hover_target(&self) -> Option<NodeId> {
        self.hover_target
    }

    pub fn gesture(&self) -> &Gesture {
        self.interaction.gesture()
    }

    pub fn preview(&self) -> Option<Preview> {
        self.interaction.preview()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Overlay change to draw this animation frame, if any.
    pub fn take_frame(&mut self) -> FrameUpdate {
        self.interaction.take_frame()
    }

    pub fn set_stage_size(&mut self, width: f64, height: f64) {
        self.stage_size = Point::new(width, height);
    }

    /// Hit test at a screen position. Handle radius stays constant on screen.
    pub fn hit(&self, screen: Point) -> HitTarget {
        let at = self.viewport.to_canvas(screen);
        hit_test(&self.document, at, self.config.handle_radius / self.viewport.scale)
    }

    /// Line endpoints of a connection, recomputed from current node bounds.
    pub fn connection_endpoints(&self, id: ConnectionId) -> Option<(Point, Point)> {
        let conn = self.document.connection(id)?;
        let from = self.document.node(conn.from_node_id)?.bounds();
        let to = self.document.node(conn.to_node_id)?.bounds();
        Some(closest_anchors(&from, &to))
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Route a raw input event through the interaction machine.
    pub fn handle_input(&mut self, event: &InputEvent) -> Vec<Effect> {
        let commands = match event {
            InputEvent::PointerDown(p) | InputEvent::PointerMove(p) | InputEvent::PointerUp(p) => {
                let at = self.viewport.to_canvas(p.position());
                self.interaction
                    .handle(event, at, &self.document, self.mode, &self.config)
            }
            InputEvent::Wheel { x, y, delta_y } => vec![Command::Zoom {
                pointer: Point::new(*x, *y),
                direction: ZoomDirection::from_wheel_delta(*delta_y),
            }],
            InputEvent::Key {
                key,
                ctrl,
                shift,
                alt,
                meta,
            } => match ShortcutMap::resolve(key, *ctrl, *shift, *alt, *meta) {
                Some(action) => self.shortcut_commands(action),
                None => vec![],
            },
        };
        self.apply_all(commands)
    }

    fn shortcut_commands(&self, action: ShortcutAction) -> Vec<Command> {
        let centre = self.stage_size / 2.0;
        match action {
            ShortcutAction::ModeSelect => vec![Command::SetMode(InteractionMode::Select)],
            ShortcutAction::ModeCreateRegion => {
                vec![Command::SetMode(InteractionMode::CreateRegion)]
            }
            ShortcutAction::Delete => vec![Command::DeleteSelection],
            ShortcutAction::Cancel => vec![Command::Cancel],
            ShortcutAction::Save => vec![Command::Save],
            ShortcutAction::ZoomIn => vec![Command::Zoom {
                pointer: centre,
                direction: ZoomDirection::In,
            }],
            ShortcutAction::ZoomOut => vec![Command::Zoom {
                pointer: centre,
                direction: ZoomDirection::Out,
            }],
            ShortcutAction::ResetView => vec![Command::ResetView],
        }
    }

    /// Track a library item dragged over the stage at `screen`.
    pub fn hover_library_drag(&mut self, screen: Point) {
        let at = self.viewport.to_canvas(screen);
        self.hover_target = region_containing(&self.document, at, None);
    }

    /// Drop a library item: a new node centred on the drop point, inside the
    /// region under it (if any).
    pub fn drop_from_library(&mut self, kind: NodeKind, screen: Point) -> Vec<Effect> {
        self.apply(Command::DropFromLibrary { kind, screen })
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn apply_all(&mut self, commands: Vec<Command>) -> Vec<Effect> {
        commands.into_iter().flat_map(|c| self.apply(c)).collect()
    }

    /// Apply one command, returning the persistence work it implies.
    pub fn apply(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::Pan { dx, dy } => {
                self.viewport.pan_by(dx, dy);
                vec![]
            }
            Command::Zoom { pointer, direction } => {
                self.viewport
                    .zoom_at(pointer, direction, &self.config.zoom_limits());
                log::trace!("zoom {direction:?} -> {}", self.viewport.scale);
                vec![]
            }
            Command::ResetView => {
                self.viewport.reset();
                vec![]
            }
            Command::SetMode(mode) => {
                self.mode = mode;
                vec![]
            }
            Command::Select(id) => {
                self.selected = id.filter(|id| self.document.contains_node(*id));
                vec![]
            }
            Command::MoveNodeBy { id, dx, dy } => {
                self.move_by(id, dx, dy);
                vec![]
            }
            Command::FinishDrag { id, origin } => self.finish_drag(id, origin),
            Command::MoveNodeTo { id, position } => {
                let Some(origin) = self.document.node(id).map(|n| n.position()) else {
                    return vec![];
                };
                let d = position - origin;
                self.move_by(id, d.x, d.y);
                self.finish_drag(id, origin)
            }
            Command::ResizeNode { id, bounds } => {
                if let Some(node) = self.document.node_mut(id) {
                    node.set_bounds(bounds);
                }
                vec![]
            }
            Command::FinishResize { id, original } => self.finish_resize(id, original),
            Command::CreateRegion { bounds } => {
                log::debug!("creating region {bounds:?}");
                vec![Effect::CreateNode(NewNode::with_bounds(NodeKind::Region, bounds))]
            }
            Command::AddNode(new) => {
                if let Some(parent) = new.parent_id
                    && !self.document.node(parent).is_some_and(Node::is_region)
                {
                    log::warn!("ignoring add: parent {parent} is not a region");
                    return vec![];
                }
                vec![Effect::CreateNode(new)]
            }
            Command::DropFromLibrary { kind, screen } => {
                self.hover_target = None;
                let at = self.viewport.to_canvas(screen);
                let (w, h) = kind.default_size();
                let mut new = NewNode::new(kind, at.x - w / 2.0, at.y - h / 2.0);
                if !kind.is_region() {
                    new.parent_id = region_containing(&self.document, at, None);
                }
                self.apply(Command::AddNode(new))
            }
            Command::Connect { from, to } => {
                if from == to
                    || !self.document.contains_node(from)
                    || !self.document.contains_node(to)
                {
                    log::debug!("ignoring connection {from} -> {to}");
                    return vec![];
                }
                vec![Effect::CreateConnection(NewConnection {
                    from_node_id: from,
                    to_node_id: to,
                    label: None,
                })]
            }
            Command::EditNode { id, patch } => match self.document.node_mut(id) {
                Some(node) if !patch.is_empty() => {
                    let previous = node.snapshot(&patch);
                    node.apply_patch(&patch);
                    vec![Effect::Persist(vec![NodeWrite {
                        id,
                        patch,
                        previous,
                    }])]
                }
                _ => vec![],
            },
            Command::DeleteNode(id) => self.delete_node(id),
            Command::DeleteSelection => match self.selected {
                Some(id) => self.delete_node(id),
                None => vec![],
            },
            Command::DeleteConnection(id) => match self.document.remove_connection(id) {
                Some(conn) => vec![Effect::DeleteConnection(conn)],
                None => vec![],
            },
            Command::LabelConnection { id, label } => match self.document.connection_mut(id) {
                Some(conn) if conn.label != label => {
                    let previous = std::mem::replace(&mut conn.label, label.clone());
                    vec![Effect::UpdateConnection {
                        id,
                        label,
                        previous,
                    }]
                }
                _ => vec![],
            },
            Command::Save => vec![Effect::Flush],
            Command::Cancel => {
                let undo = self.interaction.cancel(&self.document);
                let effects = self.apply_all(undo);
                self.hover_target = None;
                self.selected = None;
                effects
            }
        }
    }

    fn move_by(&mut self, id: NodeId, dx: f64, dy: f64) {
        let Some(node) = self.document.node_mut(id) else {
            return;
        };
        node.x += dx;
        node.y += dy;
        if node.is_region() {
            for (child, position) in cascade_move(&self.document, id, dx, dy) {
                if let Some(c) = self.document.node_mut(child) {
                    c.x = position.x;
                    c.y = position.y;
                }
            }
        } else {
            self.hover_target = resolve_parent(&self.document, id);
        }
    }

    fn finish_drag(&mut self, id: NodeId, origin: Point) -> Vec<Effect> {
        self.hover_target = None;
        let Some(node) = self.document.node(id) else {
            return vec![];
        };
        let position = node.position();
        let moved = position != origin;

        if node.is_region() {
            if !moved {
                return vec![];
            }
            let mut effects = vec![Effect::Queue {
                id,
                patch: NodePatch::position(position),
            }];
            for child in self.document.children_of(id) {
                if let Some(c) = self.document.node(child) {
                    effects.push(Effect::Queue {
                        id: child,
                        patch: NodePatch::position(c.position()),
                    });
                }
            }
            log::debug!("region {id} moved with {} children", effects.len() - 1);
            return effects;
        }

        let old_parent = node.parent_id;
        let new_parent = resolve_parent(&self.document, id);
        if new_parent != old_parent {
            log::debug!("{id} re-parented {old_parent:?} -> {new_parent:?}");
            let bounds = node.bounds();
            let before = Bounds::new(origin.x, origin.y, bounds.width, bounds.height);
            if let Some(node) = self.document.node_mut(id) {
                node.parent_id = new_parent;
            }
            return vec![Effect::Persist(vec![NodeWrite {
                id,
                patch: NodePatch::bounds(bounds).with_parent(new_parent),
                previous: NodePatch::bounds(before).with_parent(old_parent),
            }])];
        }

        if moved {
            vec![Effect::Queue {
                id,
                patch: NodePatch::position(position),
            }]
        } else {
            vec![]
        }
    }

    fn finish_resize(&mut self, id: NodeId, original: Bounds) -> Vec<Effect> {
        let Some(node) = self.document.node(id) else {
            return vec![];
        };
        let bounds = node.bounds();
        if bounds == original {
            return vec![];
        }
        let is_region = node.is_region();

        let mut effects = vec![Effect::Queue {
            id,
            patch: NodePatch::bounds(bounds),
        }];
        if is_region {
            let mut writes = Vec::new();
            for (child, new_bounds) in plan_resize_cascade(&self.document, id, original) {
                if let Some(c) = self.document.node_mut(child) {
                    let previous = NodePatch::bounds(c.bounds());
                    c.set_bounds(new_bounds);
                    writes.push(NodeWrite {
                        id: child,
                        patch: NodePatch::bounds(new_bounds),
                        previous,
                    });
                }
            }
            if !writes.is_empty() {
                log::debug!("region {id} resized, reprojecting {} children", writes.len());
                effects.push(Effect::Persist(writes));
            }
        }
        effects
    }

    fn delete_node(&mut self, id: NodeId) -> Vec<Effect> {
        let Some(removed) = self.document.remove_node(id) else {
            return vec![];
        };
        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.hover_target == Some(id) {
            self.hover_target = None;
        }
        log::debug!(
            "deleted {id} ({} connections, {} orphaned)",
            removed.connections.len(),
            removed.orphaned.len()
        );
        vec![Effect::DeleteNode(removed)]
    }

    // ─── Server results and rollback ─────────────────────────────────────

    /// Insert a node the server just created, and select it.
    pub fn insert_node(&mut self, node: Node) {
        let id = node.id;
        self.document.insert_node(node);
        self.selected = Some(id);
    }

    pub fn insert_connection(&mut self, conn: Connection) {
        let id = conn.id;
        if let Err(e) = self.document.insert_connection(conn) {
            // An endpoint was deleted while the request was in flight.
            log::warn!("discarding created connection {id}: {e}");
        }
    }

    /// Revert failed immediate writes to their snapshots.
    pub fn rollback(&mut self, writes: &[NodeWrite]) {
        for write in writes {
            if let Some(node) = self.document.node_mut(write.id) {
                node.apply_patch(&write.previous);
            }
        }
    }

    pub fn restore_node(&mut self, removed: RemovedNode) {
        self.document.restore(removed);
    }

    pub fn restore_connection(&mut self, conn: Connection) {
        self.insert_connection(conn);
    }

    pub fn revert_connection_label(&mut self, id: ConnectionId, previous: Option<String>) {
        if let Some(conn) = self.document.connection_mut(id) {
            conn.label = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointerEvent;
    use pretty_assertions::assert_eq;

    fn node(id: &str, kind: NodeKind, b: Bounds) -> Node {
        let mut n = Node::new(NodeId::intern(id), kind, b.x, b.y);
        n.set_bounds(b);
        n
    }

    fn session(nodes: Vec<Node>) -> EditorSession {
        EditorSession::from_canvas(
            Canvas {
                id: "session-test".into(),
                nodes,
                ..Canvas::default()
            },
            EditorConfig::default(),
        )
    }

    #[test]
    fn loading_resets_viewport() {
        let mut s = session(vec![]);
        s.apply(Command::Pan { dx: 40.0, dy: 10.0 });
        s.apply(Command::Zoom {
            pointer: Point::ORIGIN,
            direction: ZoomDirection::In,
        });
        s.apply(Command::SetMode(InteractionMode::CreateRegion));
        s.load(Canvas::default());
        assert_eq!(s.viewport(), Viewport::default());
        assert_eq!(s.mode(), InteractionMode::Select);
    }

    #[test]
    fn wheel_zooms_at_pointer() {
        let mut s = session(vec![]);
        let fx = s.handle_input(&InputEvent::Wheel {
            x: 200.0,
            y: 100.0,
            delta_y: -120.0,
        });
        assert!(fx.is_empty());
        let vp = s.viewport();
        assert!((vp.scale - 1.1).abs() < 1e-12);
        let anchored = vp.to_canvas(Point::new(200.0, 100.0));
        assert!((anchored.x - 200.0).abs() < 1e-9 && (anchored.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn plain_drag_is_queued() {
        let id = NodeId::intern("s_plain");
        let mut s = session(vec![node(
            "s_plain",
            NodeKind::SubIdea,
            Bounds::new(0.0, 0.0, 50.0, 50.0),
        )]);
        let fx = s.apply(Command::MoveNodeTo {
            id,
            position: Point::new(30.0, 40.0),
        });
        assert_eq!(
            fx,
            vec![Effect::Queue {
                id,
                patch: NodePatch::position(Point::new(30.0, 40.0))
            }]
        );
    }

    #[test]
    fn drop_into_region_persists_immediately_with_snapshot() {
        let region = NodeId::intern("s_region");
        let id = NodeId::intern("s_joiner");
        let mut s = session(vec![
            node("s_region", NodeKind::Region, Bounds::new(100.0, 100.0, 100.0, 100.0)),
            node("s_joiner", NodeKind::SubIdea, Bounds::new(0.0, 0.0, 20.0, 20.0)),
        ]);
        let fx = s.apply(Command::MoveNodeTo {
            id,
            position: Point::new(140.0, 140.0),
        });
        assert_eq!(
            fx,
            vec![Effect::Persist(vec![NodeWrite {
                id,
                patch: NodePatch::bounds(Bounds::new(140.0, 140.0, 20.0, 20.0))
                    .with_parent(Some(region)),
                previous: NodePatch::bounds(Bounds::new(0.0, 0.0, 20.0, 20.0)).with_parent(None),
            }])]
        );
        assert_eq!(s.node(id).unwrap().parent_id, Some(region));

        // Dragging back out clears the parent.
        let fx = s.apply(Command::MoveNodeTo {
            id,
            position: Point::new(400.0, 400.0),
        });
        let Effect::Persist(writes) = &fx[0] else {
            panic!("expected Persist, got {fx:?}");
        };
        assert_eq!(writes[0].patch.parent_id, Some(None));
        assert_eq!(s.node(id).unwrap().parent_id, None);
    }

    #[test]
    fn rollback_restores_pre_drag_state() {
        let id = NodeId::intern("s_rollback");
        let mut s = session(vec![
            node("s_rb_region", NodeKind::Region, Bounds::new(100.0, 100.0, 100.0, 100.0)),
            node("s_rollback", NodeKind::SubIdea, Bounds::new(0.0, 0.0, 20.0, 20.0)),
        ]);
        let fx = s.apply(Command::MoveNodeTo {
            id,
            position: Point::new(140.0, 140.0),
        });
        let Effect::Persist(writes) = &fx[0] else {
            panic!("expected Persist");
        };
        s.rollback(writes);
        let n = s.node(id).unwrap();
        assert_eq!((n.x, n.y, n.parent_id), (0.0, 0.0, None));
    }

    #[test]
    fn region_resize_persists_children_and_queues_region() {
        let region = NodeId::intern("s_rs_region");
        let child = NodeId::intern("s_rs_child");
        let mut c = node("s_rs_child", NodeKind::SubIdea, Bounds::new(10.0, 10.0, 30.0, 20.0));
        c.parent_id = Some(region);
        let mut s = session(vec![
            node("s_rs_region", NodeKind::Region, Bounds::new(0.0, 0.0, 100.0, 100.0)),
            c,
        ]);
        let original = Bounds::new(0.0, 0.0, 100.0, 100.0);
        s.apply(Command::ResizeNode {
            id: region,
            bounds: Bounds::new(0.0, 0.0, 200.0, 100.0),
        });
        let fx = s.apply(Command::FinishResize { id: region, original });
        assert_eq!(
            fx,
            vec![
                Effect::Queue {
                    id: region,
                    patch: NodePatch::bounds(Bounds::new(0.0, 0.0, 200.0, 100.0))
                },
                Effect::Persist(vec![NodeWrite {
                    id: child,
                    patch: NodePatch::bounds(Bounds::new(20.0, 10.0, 60.0, 20.0)),
                    previous: NodePatch::bounds(Bounds::new(10.0, 10.0, 30.0, 20.0)),
                }]),
            ]
        );
    }

    #[test]
    fn escape_reverts_live_drag() {
        let id = NodeId::intern("s_escape");
        let mut s = session(vec![node(
            "s_escape",
            NodeKind::SubIdea,
            Bounds::new(0.0, 0.0, 40.0, 40.0),
        )]);
        let target = HitTarget::Node(id);
        s.handle_input(&InputEvent::PointerDown(PointerEvent::new(10.0, 10.0, target)));
        s.handle_input(&InputEvent::PointerMove(PointerEvent::new(60.0, 90.0, target)));
        assert_eq!(s.node(id).unwrap().position(), Point::new(50.0, 80.0));

        let fx = s.handle_input(&InputEvent::key("Escape"));
        assert!(fx.is_empty());
        assert_eq!(s.node(id).unwrap().position(), Point::ORIGIN);
        assert!(matches!(s.gesture(), Gesture::Idle));
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn delete_key_removes_selection() {
        let id = NodeId::intern("s_delete");
        let mut s = session(vec![node(
            "s_delete",
            NodeKind::Annotation,
            Bounds::new(0.0, 0.0, 40.0, 40.0),
        )]);
        s.apply(Command::Select(Some(id)));
        let fx = s.handle_input(&InputEvent::key("Delete"));
        assert!(matches!(&fx[..], [Effect::DeleteNode(r)] if r.node.id == id));
        assert!(s.node(id).is_none());
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn library_drop_lands_in_region_under_pointer() {
        let region = NodeId::intern("s_lib_region");
        let mut s = session(vec![node(
            "s_lib_region",
            NodeKind::Region,
            Bounds::new(0.0, 0.0, 400.0, 400.0),
        )]);
        s.apply(Command::Pan { dx: 100.0, dy: 0.0 });
        s.hover_library_drag(Point::new(300.0, 200.0));
        assert_eq!(s.hover_target(), Some(region));

        let fx = s.drop_from_library(NodeKind::SubIdea, Point::new(300.0, 200.0));
        let Effect::CreateNode(new) = &fx[0] else {
            panic!("expected CreateNode");
        };
        assert_eq!((new.x, new.y), (120.0, 160.0));
        assert_eq!(new.parent_id, Some(region));
        assert_eq!(s.hover_target(), None);
    }
}
