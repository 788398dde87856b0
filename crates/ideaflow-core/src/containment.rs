//! Region membership and the cascades that keep children attached to
//! their region when it moves or resizes.
//!
//! Membership is decided by a node's centre point. Nesting is single-level:
//! regions are never assigned a parent here.

use crate::geometry::{Bounds, Point};
use crate::id::NodeId;
use crate::model::CanvasDocument;

/// Topmost region whose bounds contain `point`, skipping `exclude`.
pub fn region_containing(
    doc: &CanvasDocument,
    point: Point,
    exclude: Option<NodeId>,
) -> Option<NodeId> {
    doc.regions()
        .rev()
        .find(|r| Some(r.id) != exclude && r.bounds().contains(point))
        .map(|r| r.id)
}

/// The region a node belongs to at its current position.
///
/// Regions themselves always resolve to `None`.
pub fn resolve_parent(doc: &CanvasDocument, node: NodeId) -> Option<NodeId> {
    let n = doc.node(node)?;
    if n.is_region() {
        return None;
    }
    region_containing(doc, n.center(), Some(node))
}

/// New positions for every child of `region` after moving it by `(dx, dy)`.
pub fn cascade_move(
    doc: &CanvasDocument,
    region: NodeId,
    dx: f64,
    dy: f64,
) -> Vec<(NodeId, Point)> {
    doc.children_of(region)
        .into_iter()
        .filter_map(|id| doc.node(id).map(|n| (id, n.position() + Point::new(dx, dy))))
        .collect()
}

/// Reproject one child's bounds from a region's `old` frame into its `new` frame.
///
/// Offsets from the region origin and the child's own size scale by
/// `new / old` per axis. A degenerate old dimension scales by 1.
pub fn cascade_resize(old: Bounds, new: Bounds, child: Bounds) -> Bounds {
    let sx = if old.width > 0.0 { new.width / old.width } else { 1.0 };
    let sy = if old.height > 0.0 { new.height / old.height } else { 1.0 };
    Bounds {
        x: new.x + (child.x - old.x) * sx,
        y: new.y + (child.y - old.y) * sy,
        width: child.width * sx,
        height: child.height * sy,
    }
}

/// Child bounds after `region` was resized away from `old`.
///
/// The region's current bounds in `doc` are taken as the new frame.
pub fn plan_resize_cascade(
    doc: &CanvasDocument,
    region: NodeId,
    old: Bounds,
) -> Vec<(NodeId, Bounds)> {
    let Some(new) = doc.node(region).map(|r| r.bounds()) else {
        return Vec::new();
    };
    doc.children_of(region)
        .into_iter()
        .filter_map(|id| doc.node(id).map(|n| (id, cascade_resize(old, new, n.bounds()))))
        .collect()
}
