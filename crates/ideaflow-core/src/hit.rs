//! Hit testing: canvas point → what is under it.
//!
//! Walks nodes front-to-back. Ideas, annotations and images paint above
//! regions regardless of creation order, so they are tested first.

use crate::anchor::{Anchor, anchor_point};
use crate::geometry::{Corner, Point};
use crate::id::NodeId;
use crate::model::{CanvasDocument, Node};

/// What a pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitTarget {
    /// Empty stage.
    #[default]
    Canvas,
    /// A node's body.
    Node(NodeId),
    /// A connection handle on one of the node's edges.
    Handle(NodeId, Anchor),
    /// A resize handle on one of the node's corners.
    Resize(NodeId, Corner),
}

impl HitTarget {
    /// The node involved, if any.
    pub fn node(&self) -> Option<NodeId> {
        match *self {
            Self::Canvas => None,
            Self::Node(id) | Self::Handle(id, _) | Self::Resize(id, _) => Some(id),
        }
    }
}

const CORNERS: [Corner; 4] = [
    Corner::TopLeft,
    Corner::TopRight,
    Corner::BottomLeft,
    Corner::BottomRight,
];

/// Find the topmost target at canvas point `p`.
///
/// `handle_radius` is in canvas units; handles win over the body of the
/// same node.
pub fn hit_test(doc: &CanvasDocument, p: Point, handle_radius: f64) -> HitTarget {
    let r2 = handle_radius * handle_radius;
    let front_to_back = doc
        .nodes()
        .rev()
        .filter(|n| !n.is_region())
        .chain(doc.regions().rev());

    for node in front_to_back {
        if let Some(hit) = hit_node(node, p, r2) {
            return hit;
        }
    }
    HitTarget::Canvas
}

fn hit_node(node: &Node, p: Point, r2: f64) -> Option<HitTarget> {
    let b = node.bounds();
    if let Some(corner) = CORNERS
        .into_iter()
        .find(|c| b.corner(*c).distance_squared(p) <= r2)
    {
        return Some(HitTarget::Resize(node.id, corner));
    }
    if let Some(anchor) = Anchor::ALL
        .into_iter()
        .find(|a| anchor_point(&b, *a).distance_squared(p) <= r2)
    {
        return Some(HitTarget::Handle(node.id, anchor));
    }
    b.contains(p).then_some(HitTarget::Node(node.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;

    fn doc() -> CanvasDocument {
        let mut doc = CanvasDocument::new("hit");
        // Region created after the idea still sits below it.
        let mut idea = Node::new(NodeId::intern("hit_idea"), NodeKind::MasterIdea, 50.0, 50.0);
        idea.width = 100.0;
        idea.height = 50.0;
        doc.insert_node(idea);
        let mut region = Node::new(NodeId::intern("hit_region"), NodeKind::Region, 0.0, 0.0);
        region.width = 300.0;
        region.height = 300.0;
        doc.insert_node(region);
        doc
    }

    #[test]
    fn ideas_sit_above_regions() {
        let d = doc();
        assert_eq!(
            hit_test(&d, Point::new(100.0, 75.0), 8.0),
            HitTarget::Node(NodeId::intern("hit_idea"))
        );
        assert_eq!(
            hit_test(&d, Point::new(250.0, 250.0), 8.0),
            HitTarget::Node(NodeId::intern("hit_region"))
        );
        assert_eq!(hit_test(&d, Point::new(500.0, 500.0), 8.0), HitTarget::Canvas);
    }

    #[test]
    fn handles_win_over_body() {
        let d = doc();
        assert_eq!(
            hit_test(&d, Point::new(151.0, 75.0), 8.0),
            HitTarget::Handle(NodeId::intern("hit_idea"), Anchor::Right)
        );
        assert_eq!(
            hit_test(&d, Point::new(148.0, 98.0), 8.0),
            HitTarget::Resize(NodeId::intern("hit_idea"), Corner::BottomRight)
        );
    }
}
