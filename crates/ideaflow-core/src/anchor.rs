//! Connection anchors: edge mid-points a connection line can attach to.

use crate::geometry::{Bounds, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Top,
    Right,
    Bottom,
    Left,
}

impl Anchor {
    pub const ALL: [Anchor; 4] = [Anchor::Top, Anchor::Right, Anchor::Bottom, Anchor::Left];
}

pub fn anchor_point(b: &Bounds, anchor: Anchor) -> Point {
    match anchor {
        Anchor::Top => Point::new(b.x + b.width / 2.0, b.y),
        Anchor::Right => Point::new(b.x + b.width, b.y + b.height / 2.0),
        Anchor::Bottom => Point::new(b.x + b.width / 2.0, b.y + b.height),
        Anchor::Left => Point::new(b.x, b.y + b.height / 2.0),
    }
}

/// Endpoints of a connection line: the closest pair of anchors between
/// the two boxes. Ties go to the first pair in `Anchor::ALL` order.
pub fn closest_anchors(from: &Bounds, to: &Bounds) -> (Point, Point) {
    let mut best = (anchor_point(from, Anchor::Top), anchor_point(to, Anchor::Top));
    let mut best_d = f64::INFINITY;
    for a in Anchor::ALL {
        let pa = anchor_point(from, a);
        for b in Anchor::ALL {
            let pb = anchor_point(to, b);
            let d = pa.distance_squared(pb);
            if d < best_d {
                best_d = d;
                best = (pa, pb);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_by_side_boxes_use_facing_edges() {
        let left = Bounds::new(0.0, 0.0, 100.0, 50.0);
        let right = Bounds::new(200.0, 0.0, 100.0, 50.0);
        let (a, b) = closest_anchors(&left, &right);
        assert_eq!(a, Point::new(100.0, 25.0));
        assert_eq!(b, Point::new(200.0, 25.0));
    }

    #[test]
    fn stacked_boxes_use_bottom_and_top() {
        let upper = Bounds::new(0.0, 0.0, 100.0, 50.0);
        let lower = Bounds::new(0.0, 200.0, 100.0, 50.0);
        let (a, b) = closest_anchors(&upper, &lower);
        assert_eq!(a, anchor_point(&upper, Anchor::Bottom));
        assert_eq!(b, anchor_point(&lower, Anchor::Top));
    }
}
