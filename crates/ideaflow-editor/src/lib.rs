//! Interaction layer of the IdeaFlow canvas editor.
//!
//! Input events flow through the [`interaction`] state machine into
//! [`session::Command`]s; the [`session`] applies them and reports the
//! persistence work as [`session::Effect`]s, which the [`controller`]
//! executes against a [`api::CanvasApi`], coalescing moves through
//! [`autosave`].

pub mod api;
pub mod autosave;
pub mod controller;
pub mod input;
pub mod interaction;
pub mod session;
pub mod shortcuts;

pub use api::{ApiError, CanvasApi, MemoryCanvasApi};
pub use autosave::{AutosaveHandle, Autosaver, PendingQueue, SaveEvent};
pub use controller::{CanvasController, EditorError};
pub use input::{InputEvent, PointerButton, PointerEvent};
pub use interaction::{FrameUpdate, Gesture, InteractionMode, Preview};
pub use session::{Command, Effect, EditorSession, NodeWrite};
pub use shortcuts::{ShortcutAction, ShortcutMap};
