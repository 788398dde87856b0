pub mod anchor;
pub mod config;
pub mod containment;
pub mod error;
pub mod geometry;
pub mod hit;
pub mod id;
pub mod model;
pub mod viewport;

pub use anchor::{Anchor, closest_anchors};
pub use config::EditorConfig;
pub use error::{ConfigError, ModelError};
pub use geometry::{Bounds, Corner, Point};
pub use hit::{HitTarget, hit_test};
pub use id::{ConnectionId, NodeId};
pub use model::*;
pub use viewport::{
    MAX_SCALE, MIN_SCALE, Viewport, ZOOM_STEP, ZoomDirection, ZoomLimits, calculate_zoom,
    to_canvas_coords,
};
