//! Pointer interaction state machine.
//!
//! Interprets pointer events according to the current gesture and the
//! editor's [`InteractionMode`], and translates them into [`Command`]s that
//! the session applies. The machine reads the document but never writes it.
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Idle | down on connection handle | Connecting |
//! | Idle | down on resize handle | Resizing |
//! | Idle | down on node | DraggingNode |
//! | Idle | down on empty canvas, `CreateRegion` mode | DrawingRegion |
//! | Idle | down on empty canvas, `Select` mode | Panning |
//! | any active | up | Idle |
//!
//! Moves while connecting or drawing only update a transient preview, which
//! the host picks up at most once per animation frame via
//! [`Interaction::take_frame`].

use crate::session::Command;
use crate::input::{InputEvent, PointerButton, PointerEvent};
use ideaflow_core::anchor::anchor_point;
use ideaflow_core::geometry::{Bounds, Corner, Point};
use ideaflow_core::{CanvasDocument, EditorConfig, HitTarget, NodeId};

/// What a press on empty canvas does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Select,
    CreateRegion,
}

/// The gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Dragging the stage. `last` is in screen space.
    Panning { last: Point, moved: bool },
    /// Dragging a new connection out of `source`'s handle at `anchor`.
    Connecting { source: NodeId, anchor: Point },
    /// Dragging out a new region from `start`.
    DrawingRegion { start: Point },
    /// Moving a node. `origin` is its position when the drag began.
    DraggingNode { id: NodeId, origin: Point, last: Point },
    /// Dragging one of a node's resize handles.
    Resizing {
        id: NodeId,
        corner: Corner,
        original: Bounds,
        start: Point,
    },
}

/// Transient, unpersisted overlay drawn during a gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preview {
    /// Temporary line from the source anchor to the pointer.
    Connection { from: Point, to: Point },
    /// Ghost rectangle of the region being drawn.
    Region(Bounds),
}

/// What the host should do with the overlay this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameUpdate {
    Unchanged,
    Draw(Preview),
    Clear,
}

#[derive(Debug, Default)]
pub struct Interaction {
    gesture: Gesture,
    preview: Option<Preview>,
    /// Preview changed since the last `take_frame`.
    dirty: bool,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    /// Latest preview, whether or not it has been drawn yet.
    pub fn preview(&self) -> Option<Preview> {
        self.preview
    }

    /// Collapse all preview changes since the previous frame into one update.
    pub fn take_frame(&mut self) -> FrameUpdate {
        if !self.dirty {
            return FrameUpdate::Unchanged;
        }
        self.dirty = false;
        match self.preview {
            Some(p) => FrameUpdate::Draw(p),
            None => FrameUpdate::Clear,
        }
    }

    fn set_preview(&mut self, preview: Option<Preview>) {
        if self.preview != preview {
            self.preview = preview;
            self.dirty = true;
        }
    }

    /// Abort the current gesture, returning commands that undo its live effects.
    pub fn cancel(&mut self, doc: &CanvasDocument) -> Vec<Command> {
        let gesture = std::mem::take(&mut self.gesture);
        self.set_preview(None);
        match gesture {
            Gesture::DraggingNode { id, origin, .. } => match doc.node(id) {
                Some(node) => {
                    let back = origin - node.position();
                    vec![Command::MoveNodeBy {
                        id,
                        dx: back.x,
                        dy: back.y,
                    }]
                }
                None => vec![],
            },
            Gesture::Resizing { id, original, .. } if doc.contains_node(id) => {
                vec![Command::ResizeNode {
                    id,
                    bounds: original,
                }]
            }
            _ => vec![],
        }
    }

    /// Handle a pointer event. `at` is the event position in canvas space.
    pub fn handle(
        &mut self,
        event: &InputEvent,
        at: Point,
        doc: &CanvasDocument,
        mode: InteractionMode,
        config: &EditorConfig,
    ) -> Vec<Command> {
        match event {
            InputEvent::PointerDown(p) => self.pointer_down(p, at, doc, mode),
            InputEvent::PointerMove(p) => self.pointer_move(p, at, config),
            InputEvent::PointerUp(p) => self.pointer_up(p, at, doc, config),
            _ => vec![],
        }
    }

    fn pointer_down(
        &mut self,
        p: &PointerEvent,
        at: Point,
        doc: &CanvasDocument,
        mode: InteractionMode,
    ) -> Vec<Command> {
        if !self.is_idle() {
            // A second press mid-gesture (e.g. another button) is ignored.
            return vec![];
        }
        match p.button {
            PointerButton::Secondary => return vec![],
            PointerButton::Middle => {
                self.gesture = Gesture::Panning {
                    last: p.position(),
                    moved: true,
                };
                return vec![];
            }
            PointerButton::Primary => {}
        }

        // A target the document no longer knows is treated as empty canvas.
        let target = match p.target.node() {
            Some(id) if !doc.contains_node(id) => HitTarget::Canvas,
            _ => p.target,
        };

        match target {
            HitTarget::Handle(source, anchor) => {
                let Some(node) = doc.node(source) else {
                    return vec![];
                };
                let from = anchor_point(&node.bounds(), anchor);
                self.gesture = Gesture::Connecting {
                    source,
                    anchor: from,
                };
                self.set_preview(Some(Preview::Connection { from, to: at }));
                vec![]
            }
            HitTarget::Resize(id, corner) => {
                let Some(node) = doc.node(id) else {
                    return vec![];
                };
                self.gesture = Gesture::Resizing {
                    id,
                    corner,
                    original: node.bounds(),
                    start: at,
                };
                vec![Command::Select(Some(id))]
            }
            HitTarget::Node(id) => {
                let Some(node) = doc.node(id) else {
                    return vec![];
                };
                self.gesture = Gesture::DraggingNode {
                    id,
                    origin: node.position(),
                    last: at,
                };
                vec![Command::Select(Some(id))]
            }
            HitTarget::Canvas => match mode {
                InteractionMode::CreateRegion => {
                    self.gesture = Gesture::DrawingRegion { start: at };
                    self.set_preview(Some(Preview::Region(Bounds::from_corners(at, at))));
                    vec![]
                }
                InteractionMode::Select => {
                    self.gesture = Gesture::Panning {
                        last: p.position(),
                        moved: false,
                    };
                    vec![]
                }
            },
        }
    }

    fn pointer_move(&mut self, p: &PointerEvent, at: Point, config: &EditorConfig) -> Vec<Command> {
        match &mut self.gesture {
            Gesture::Idle => vec![],
            Gesture::Panning { last, moved } => {
                let d = p.position() - *last;
                *last = p.position();
                if d == Point::ORIGIN {
                    return vec![];
                }
                *moved = true;
                vec![Command::Pan { dx: d.x, dy: d.y }]
            }
            Gesture::Connecting { anchor, .. } => {
                let from = *anchor;
                self.set_preview(Some(Preview::Connection { from, to: at }));
                vec![]
            }
            Gesture::DrawingRegion { start } => {
                let rect = Bounds::from_corners(*start, at);
                self.set_preview(Some(Preview::Region(rect)));
                vec![]
            }
            Gesture::DraggingNode { id, last, .. } => {
                let d = at - *last;
                *last = at;
                if d == Point::ORIGIN {
                    return vec![];
                }
                vec![Command::MoveNodeBy {
                    id: *id,
                    dx: d.x,
                    dy: d.y,
                }]
            }
            Gesture::Resizing {
                id,
                corner,
                original,
                start,
            } => {
                let d = at - *start;
                let bounds = original.resize_from_corner(*corner, d.x, d.y, config.min_node_size);
                vec![Command::ResizeNode { id: *id, bounds }]
            }
        }
    }

    fn pointer_up(
        &mut self,
        p: &PointerEvent,
        at: Point,
        doc: &CanvasDocument,
        config: &EditorConfig,
    ) -> Vec<Command> {
        let gesture = std::mem::take(&mut self.gesture);
        self.set_preview(None);
        match gesture {
            Gesture::Idle => vec![],
            Gesture::Panning { moved, .. } => {
                if moved {
                    vec![]
                } else {
                    // Press-release on empty canvas is a deselect-click.
                    vec![Command::Select(None)]
                }
            }
            Gesture::Connecting { source, .. } => match p.target.node() {
                Some(target) if target != source && doc.contains_node(target) => {
                    vec![Command::Connect {
                        from: source,
                        to: target,
                    }]
                }
                _ => {
                    log::trace!("connection from {source} dropped without a target");
                    vec![]
                }
            },
            Gesture::DrawingRegion { start } => {
                let rect = Bounds::from_corners(start, at);
                let mut commands = Vec::with_capacity(2);
                if rect.width > config.min_region_size && rect.height > config.min_region_size {
                    commands.push(Command::CreateRegion { bounds: rect });
                } else {
                    log::trace!("region {rect:?} below minimum size, discarded");
                }
                commands.push(Command::SetMode(InteractionMode::Select));
                commands
            }
            Gesture::DraggingNode { id, origin, .. } => vec![Command::FinishDrag { id, origin }],
            Gesture::Resizing { id, original, .. } => vec![Command::FinishResize { id, original }],
        }
    }
}
