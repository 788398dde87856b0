//! Drives an [`EditorSession`] against a [`CanvasApi`].
//!
//! The session decides *what* to persist; the controller sends it. Every
//! optimistic change is undone locally when its request fails, and a failed
//! batch surfaces as a single [`EditorError`].

use crate::api::{ApiError, CanvasApi};
use crate::autosave::{AutosaveHandle, Autosaver, SaveEvent};
use crate::input::InputEvent;
use crate::session::{Command, Effect, EditorSession, NodeWrite};
use futures::future::join_all;
use ideaflow_core::{ConfigError, EditorConfig, NodeKind, Point};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("invalid editor config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to load canvas {canvas_id}: {source}")]
    Load {
        canvas_id: String,
        #[source]
        source: ApiError,
    },

    /// Some immediate writes failed and were rolled back.
    #[error("{failed} of {total} updates failed: {source}")]
    Persist {
        failed: usize,
        total: usize,
        #[source]
        source: ApiError,
    },

    #[error("failed to create: {0}")]
    Create(#[source] ApiError),

    #[error("failed to delete: {0}")]
    Delete(#[source] ApiError),

    #[error("failed to update connection: {0}")]
    UpdateConnection(#[source] ApiError),
}

pub struct CanvasController {
    api: Arc<dyn CanvasApi>,
    canvas_id: String,
    session: EditorSession,
    autosave: AutosaveHandle,
    save_events: Option<mpsc::UnboundedReceiver<SaveEvent>>,
}

impl CanvasController {
    /// Load a canvas and start autosaving it.
    pub async fn open(
        api: Arc<dyn CanvasApi>,
        canvas_id: &str,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        config.validate()?;
        let canvas = api
            .get_canvas(canvas_id)
            .await
            .map_err(|source| EditorError::Load {
                canvas_id: canvas_id.to_string(),
                source,
            })?;
        let (autosave, save_events) = Autosaver::spawn(api.clone(), config.autosave_debounce());
        log::info!("opened canvas {canvas_id}");
        Ok(Self {
            api,
            canvas_id: canvas_id.to_string(),
            session: EditorSession::from_canvas(canvas, config),
            autosave,
            save_events: Some(save_events),
        })
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    /// Local-only access, e.g. to update the stage size or library hover.
    pub fn session_mut(&mut self) -> &mut EditorSession {
        &mut self.session
    }

    /// Autosave outcomes, for the host's save indicator. Can be taken once.
    pub fn take_save_events(&mut self) -> Option<mpsc::UnboundedReceiver<SaveEvent>> {
        self.save_events.take()
    }

    pub async fn handle_input(&mut self, event: &InputEvent) -> Result<(), EditorError> {
        let effects = self.session.handle_input(event);
        self.run(effects).await
    }

    pub async fn execute(&mut self, command: Command) -> Result<(), EditorError> {
        let effects = self.session.apply(command);
        self.run(effects).await
    }

    /// Drop a library item at a screen position.
    pub async fn drop_from_library(
        &mut self,
        kind: NodeKind,
        screen: Point,
    ) -> Result<(), EditorError> {
        let effects = self.session.drop_from_library(kind, screen);
        self.run(effects).await
    }

    /// Flush pending moves now. `None` when nothing was pending.
    pub async fn save(&self) -> Option<SaveEvent> {
        self.autosave.flush().await
    }

    /// Flush what is left and stop autosaving.
    pub async fn close(self) {
        log::info!("closing canvas {}", self.canvas_id);
        self.autosave.shutdown().await;
    }

    /// Execute effects in order. Every effect runs even after a failure;
    /// the first error is returned.
    async fn run(&mut self, effects: Vec<Effect>) -> Result<(), EditorError> {
        let mut first_error = None;
        for effect in effects {
            if let Err(e) = self.run_one(effect).await {
                log::warn!("canvas {}: {e}", self.canvas_id);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn run_one(&mut self, effect: Effect) -> Result<(), EditorError> {
        match effect {
            Effect::Queue { id, patch } => {
                self.autosave.record(id, patch);
                Ok(())
            }
            Effect::Persist(writes) => self.persist(writes).await,
            Effect::Flush => {
                self.autosave.flush().await;
                Ok(())
            }
            Effect::CreateNode(new) => {
                let node = self
                    .api
                    .add_node(&self.canvas_id, new)
                    .await
                    .map_err(EditorError::Create)?;
                log::debug!("created {} ({:?})", node.id, node.kind);
                self.session.insert_node(node);
                Ok(())
            }
            Effect::CreateConnection(new) => {
                let conn = self
                    .api
                    .add_connection(&self.canvas_id, new)
                    .await
                    .map_err(EditorError::Create)?;
                self.session.insert_connection(conn);
                Ok(())
            }
            Effect::DeleteNode(removed) => {
                let id = removed.node.id;
                match self.api.delete_node(id).await {
                    Ok(()) => {
                        self.autosave.forget(id);
                        Ok(())
                    }
                    Err(e) => {
                        self.session.restore_node(removed);
                        Err(EditorError::Delete(e))
                    }
                }
            }
            Effect::DeleteConnection(conn) => match self.api.delete_connection(conn.id).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    self.session.restore_connection(conn);
                    Err(EditorError::Delete(e))
                }
            },
            Effect::UpdateConnection {
                id,
                label,
                previous,
            } => match self.api.update_connection(id, label).await {
                Ok(_) => Ok(()),
                Err(e) => {
                    self.session.revert_connection_label(id, previous);
                    Err(EditorError::UpdateConnection(e))
                }
            },
        }
    }

    /// Send immediate writes as one concurrent batch and roll back the failures.
    async fn persist(&mut self, writes: Vec<NodeWrite>) -> Result<(), EditorError> {
        for write in &writes {
            // A full geometry write supersedes whatever is queued for the node,
            // and must not race a flush already sending an older position.
            if write.patch.sets_bounds() {
                self.autosave.discard(write.id).await;
            }
        }

        let api = self.api.as_ref();
        let results = join_all(
            writes
                .iter()
                .map(|w| api.update_node(w.id, w.patch.clone())),
        )
        .await;

        let total = writes.len();
        let mut failed = Vec::new();
        let mut error = None;
        for (write, result) in writes.into_iter().zip(results) {
            if let Err(e) = result {
                failed.push(write);
                error.get_or_insert(e);
            }
        }

        match error {
            None => Ok(()),
            Some(source) => {
                self.session.rollback(&failed);
                Err(EditorError::Persist {
                    failed: failed.len(),
                    total,
                    source,
                })
            }
        }
    }
}
