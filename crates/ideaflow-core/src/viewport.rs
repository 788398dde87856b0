//! Screen ↔ canvas coordinate transform under pan + zoom.
//!
//! The stage is drawn at `position` (screen pixels) and scaled by `scale`,
//! so a logical canvas point `c` appears on screen at `position + c * scale`.
//! All functions here are pure and total for finite inputs.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 4.0;
/// Multiplicative step applied per wheel notch.
pub const ZOOM_STEP: f64 = 1.1;

/// Direction of a single zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Wheel convention: scrolling up (negative delta) zooms in.
    pub fn from_wheel_delta(delta_y: f64) -> Self {
        if delta_y > 0.0 { Self::Out } else { Self::In }
    }
}

/// Convert a screen-space pointer into logical canvas space.
pub fn to_canvas_coords(pointer: Point, stage_position: Point, scale: f64) -> Point {
    (pointer - stage_position) / scale
}

/// Inverse of [`to_canvas_coords`].
pub fn to_screen_coords(canvas: Point, stage_position: Point, scale: f64) -> Point {
    stage_position + canvas * scale
}

/// Scale bounds and step for zooming.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min_scale: f64,
    pub max_scale: f64,
    pub step: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            step: ZOOM_STEP,
        }
    }
}

impl ZoomLimits {
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// One pointer-anchored zoom step.
    ///
    /// The canvas point under `pointer` before the step is still under
    /// `pointer` afterwards. At a bound the scale stays put exactly.
    pub fn zoom(
        &self,
        scale: f64,
        position: Point,
        pointer: Point,
        direction: ZoomDirection,
    ) -> Viewport {
        let anchor = to_canvas_coords(pointer, position, scale);
        let stepped = match direction {
            ZoomDirection::In => scale * self.step,
            ZoomDirection::Out => scale / self.step,
        };
        let new_scale = self.clamp(stepped);
        Viewport {
            scale: new_scale,
            position: pointer - anchor * new_scale,
        }
    }
}

/// Pointer-anchored zoom with the default limits.
pub fn calculate_zoom(
    scale: f64,
    position: Point,
    pointer: Point,
    direction: ZoomDirection,
) -> Viewport {
    ZoomLimits::default().zoom(scale, position, pointer, direction)
}

/// Pan + zoom state of the stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f64,
    pub position: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            position: Point::ORIGIN,
        }
    }
}

impl Viewport {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.position.x += dx;
        self.position.y += dy;
    }

    pub fn zoom_at(&mut self, pointer: Point, direction: ZoomDirection, limits: &ZoomLimits) {
        *self = limits.zoom(self.scale, self.position, pointer, direction);
    }

    pub fn to_canvas(&self, screen: Point) -> Point {
        to_canvas_coords(screen, self.position, self.scale)
    }

    pub fn to_screen(&self, canvas: Point) -> Point {
        to_screen_coords(canvas, self.position, self.scale)
    }
}
