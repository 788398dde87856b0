//! Input abstraction layer.
//!
//! Normalizes whatever the host's rendering library reports into plain
//! values so the interaction machine can be driven (and tested) without a
//! DOM or canvas renderer. Coordinates are stage-relative screen pixels.

use ideaflow_core::HitTarget;
use ideaflow_core::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

/// A pointer sample: where it is, what it is over, which button.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    pub target: HitTarget,
    pub button: PointerButton,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64, target: HitTarget) -> Self {
        Self {
            x,
            y,
            target,
            button: PointerButton::Primary,
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),

    /// Mouse wheel over the stage at `(x, y)`.
    Wheel { x: f64, y: f64, delta_y: f64 },

    /// Keyboard shortcut.
    Key {
        key: String,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    },
}

impl InputEvent {
    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    /// Extract the pointer sample, if this is a pointer event.
    pub fn pointer(&self) -> Option<&PointerEvent> {
        match self {
            Self::PointerDown(p) | Self::PointerMove(p) | Self::PointerUp(p) => Some(p),
            _ => None,
        }
    }
}
