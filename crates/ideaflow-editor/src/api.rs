//! Backend seam: the canvas persistence API the editor talks to.
//!
//! [`CanvasApi`] is the only way the editor reaches a server. Hosts plug in
//! an HTTP client; tests use [`MemoryCanvasApi`].

use async_trait::async_trait;
use ideaflow_core::{
    Canvas, Connection, ConnectionId, NewConnection, NewNode, Node, NodeId, NodePatch,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the same request could succeed later.
    ///
    /// Server errors (5xx) and transport failures are retryable; a missing
    /// entity or a client error never will be.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Rejected { status, .. } => *status >= 500,
            ApiError::NotFound(_) | ApiError::Decode(_) => false,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[async_trait]
pub trait CanvasApi: Send + Sync {
    async fn get_canvas(&self, canvas_id: &str) -> ApiResult<Canvas>;

    /// Create a node; the server assigns its id.
    async fn add_node(&self, canvas_id: &str, node: NewNode) -> ApiResult<Node>;

    /// Partial update. Absent patch fields are left untouched.
    async fn update_node(&self, id: NodeId, patch: NodePatch) -> ApiResult<Node>;

    async fn delete_node(&self, id: NodeId) -> ApiResult<()>;

    async fn add_connection(&self, canvas_id: &str, conn: NewConnection) -> ApiResult<Connection>;

    async fn update_connection(
        &self,
        id: ConnectionId,
        label: Option<String>,
    ) -> ApiResult<Connection>;

    async fn delete_connection(&self, id: ConnectionId) -> ApiResult<()>;
}

// ─── In-memory backend ───────────────────────────────────────────────────

/// One recorded call, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    GetCanvas(String),
    AddNode(NewNode),
    UpdateNode(NodeId, NodePatch),
    DeleteNode(NodeId),
    AddConnection(NewConnection),
    UpdateConnection(ConnectionId, Option<String>),
    DeleteConnection(ConnectionId),
}

#[derive(Default)]
struct MemoryState {
    canvases: HashMap<String, Canvas>,
    calls: Vec<ApiCall>,
    /// Nodes whose updates and deletes fail with the given error.
    failing_nodes: HashMap<NodeId, ApiError>,
    /// When set, every call fails with this error.
    outage: Option<ApiError>,
    /// Simulated round trip of `update_node`.
    latency: Duration,
}

/// In-memory [`CanvasApi`] with call recording and failure injection.
///
/// Injected node failures are sticky until [`MemoryCanvasApi::heal`].
#[derive(Default)]
pub struct MemoryCanvasApi {
    state: Mutex<MemoryState>,
}

impl MemoryCanvasApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_canvas(canvas: Canvas) -> Self {
        let api = Self::new();
        api.lock().canvases.insert(canvas.id.clone(), canvas);
        api
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every update and delete of `id` fail with `error`.
    pub fn fail_node(&self, id: NodeId, error: ApiError) {
        self.lock().failing_nodes.insert(id, error);
    }

    /// Make every call fail with `error`.
    pub fn set_outage(&self, error: Option<ApiError>) {
        self.lock().outage = error;
    }

    /// Delay every `update_node` by `latency` before it reaches the store.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        let mut state = self.lock();
        state.failing_nodes.clear();
        state.outage = None;
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Update calls recorded so far, in order.
    pub fn updates(&self) -> Vec<(NodeId, NodePatch)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ApiCall::UpdateNode(id, patch) => Some((*id, patch.clone())),
                _ => None,
            })
            .collect()
    }

    /// Server-side copy of a node.
    pub fn stored_node(&self, id: NodeId) -> Option<Node> {
        self.lock()
            .canvases
            .values()
            .flat_map(|c| c.nodes.iter())
            .find(|n| n.id == id)
            .cloned()
    }

    fn begin(&self, call: ApiCall) -> Result<std::sync::MutexGuard<'_, MemoryState>, ApiError> {
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(e) = state.outage.clone() {
            return Err(e);
        }
        Ok(state)
    }
}

impl MemoryState {
    fn canvas_mut(&mut self, canvas_id: &str) -> ApiResult<&mut Canvas> {
        self.canvases
            .get_mut(canvas_id)
            .ok_or_else(|| ApiError::NotFound(format!("canvas {canvas_id}")))
    }

    fn node_mut(&mut self, id: NodeId) -> ApiResult<&mut Node> {
        if let Some(e) = self.failing_nodes.get(&id) {
            return Err(e.clone());
        }
        self.canvases
            .values_mut()
            .flat_map(|c| c.nodes.iter_mut())
            .find(|n| n.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("node {id}")))
    }

    fn connection_mut(&mut self, id: ConnectionId) -> ApiResult<&mut Connection> {
        self.canvases
            .values_mut()
            .flat_map(|c| c.connections.iter_mut())
            .find(|c| c.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("connection {id}")))
    }
}

#[async_trait]
impl CanvasApi for MemoryCanvasApi {
    async fn get_canvas(&self, canvas_id: &str) -> ApiResult<Canvas> {
        let mut state = self.begin(ApiCall::GetCanvas(canvas_id.to_string()))?;
        state.canvas_mut(canvas_id).map(|c| c.clone())
    }

    async fn add_node(&self, canvas_id: &str, node: NewNode) -> ApiResult<Node> {
        let mut state = self.begin(ApiCall::AddNode(node.clone()))?;
        let created = node.into_node(NodeId::with_prefix("node"));
        state.canvas_mut(canvas_id)?.nodes.push(created.clone());
        Ok(created)
    }

    async fn update_node(&self, id: NodeId, patch: NodePatch) -> ApiResult<Node> {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.begin(ApiCall::UpdateNode(id, patch.clone()))?;
        let node = state.node_mut(id)?;
        node.apply_patch(&patch);
        Ok(node.clone())
    }

    async fn delete_node(&self, id: NodeId) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::DeleteNode(id))?;
        state.node_mut(id)?;
        for canvas in state.canvases.values_mut() {
            canvas.nodes.retain(|n| n.id != id);
            canvas
                .connections
                .retain(|c| c.from_node_id != id && c.to_node_id != id);
            for n in canvas.nodes.iter_mut() {
                if n.parent_id == Some(id) {
                    n.parent_id = None;
                }
            }
        }
        Ok(())
    }

    async fn add_connection(&self, canvas_id: &str, conn: NewConnection) -> ApiResult<Connection> {
        let mut state = self.begin(ApiCall::AddConnection(conn.clone()))?;
        let created = conn.into_connection(ConnectionId::with_prefix("conn"));
        state.canvas_mut(canvas_id)?.connections.push(created.clone());
        Ok(created)
    }

    async fn update_connection(
        &self,
        id: ConnectionId,
        label: Option<String>,
    ) -> ApiResult<Connection> {
        let mut state = self.begin(ApiCall::UpdateConnection(id, label.clone()))?;
        let conn = state.connection_mut(id)?;
        conn.label = label;
        Ok(conn.clone())
    }

    async fn delete_connection(&self, id: ConnectionId) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::DeleteConnection(id))?;
        state.connection_mut(id)?;
        for canvas in state.canvases.values_mut() {
            canvas.connections.retain(|c| c.id != id);
        }
        Ok(())
    }
}
