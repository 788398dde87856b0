//! Coalesced autosave of node moves and resizes.
//!
//! Writes are buffered per node in a [`PendingQueue`], newest fields winning,
//! and flushed as one concurrent batch when the debounce deadline passes,
//! when the user saves, or when the editor is torn down. All three go
//! through [`flush_batch`].
//!
//! The queue is taken before the batch is sent, so writes that arrive
//! mid-flush start a fresh queue. Entries that fail retryably are merged
//! back underneath those newer writes.

use crate::api::{ApiError, CanvasApi};
use futures::future::join_all;
use ideaflow_core::{NodeId, NodePatch};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

/// Pending writes, one merged patch per node, in first-touched order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingQueue {
    entries: Vec<(NodeId, NodePatch)>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&NodePatch> {
        self.entries.iter().find(|(n, _)| *n == id).map(|(_, p)| p)
    }

    /// Buffer a write. Fields already pending for `id` are overwritten.
    pub fn record(&mut self, id: NodeId, patch: NodePatch) {
        match self.entries.iter_mut().find(|(n, _)| *n == id) {
            Some((_, pending)) => pending.merge(patch),
            None => self.entries.push((id, patch)),
        }
    }

    /// Drain everything, leaving the queue empty.
    pub fn take(&mut self) -> Vec<(NodeId, NodePatch)> {
        std::mem::take(&mut self.entries)
    }

    /// Put failed entries back. Anything recorded since they were taken is newer
    /// and wins field by field.
    pub fn restore(&mut self, failed: Vec<(NodeId, NodePatch)>) {
        for (id, mut patch) in failed {
            match self.entries.iter_mut().find(|(n, _)| *n == id) {
                Some((_, newer)) => {
                    patch.merge(std::mem::take(newer));
                    *newer = patch;
                }
                None => self.entries.push((id, patch)),
            }
        }
    }

    /// Drop anything pending for a node that no longer exists.
    pub fn forget(&mut self, id: NodeId) {
        self.entries.retain(|(n, _)| *n != id);
    }
}

/// Result of sending one batch.
#[derive(Debug, Default)]
pub struct FlushOutcome {
    pub saved: usize,
    /// Entries that failed and may succeed later.
    pub retry: Vec<(NodeId, NodePatch)>,
    /// Entries discarded because the server can never accept them.
    pub dropped: usize,
    /// First error seen, if any call failed.
    pub error: Option<ApiError>,
}

/// Send every entry concurrently and sort the results.
pub async fn flush_batch(api: &dyn CanvasApi, entries: Vec<(NodeId, NodePatch)>) -> FlushOutcome {
    let calls = entries
        .iter()
        .map(|(id, patch)| api.update_node(*id, patch.clone()));
    let results = join_all(calls).await;

    let mut outcome = FlushOutcome::default();
    for ((id, patch), result) in entries.into_iter().zip(results) {
        match result {
            Ok(_) => outcome.saved += 1,
            Err(e) => {
                if e.is_retryable() {
                    outcome.retry.push((id, patch));
                } else {
                    log::warn!("autosave: dropping update for {id}: {e}");
                    outcome.dropped += 1;
                }
                outcome.error.get_or_insert(e);
            }
        }
    }
    outcome
}

/// Published once per flush attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    Saved { count: usize },
    /// `pending` is the queue length after failed entries were restored.
    Failed { pending: usize, error: ApiError },
}

enum Message {
    Record(NodeId, NodePatch),
    Forget(NodeId, Option<oneshot::Sender<()>>),
    Flush(oneshot::Sender<Option<SaveEvent>>),
    Shutdown(oneshot::Sender<()>),
}

/// Background task that owns the queue and the debounce deadline.
pub struct Autosaver {
    api: Arc<dyn CanvasApi>,
    queue: PendingQueue,
    debounce: Duration,
    deadline: Option<Instant>,
    rx: mpsc::UnboundedReceiver<Message>,
    events: mpsc::UnboundedSender<SaveEvent>,
}

impl Autosaver {
    /// Start the task. Returns its handle and the stream of save events.
    pub fn spawn(
        api: Arc<dyn CanvasApi>,
        debounce: Duration,
    ) -> (AutosaveHandle, mpsc::UnboundedReceiver<SaveEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let saver = Autosaver {
            api,
            queue: PendingQueue::new(),
            debounce,
            deadline: None,
            rx,
            events,
        };
        let task = tokio::spawn(saver.run());
        (AutosaveHandle { tx, task }, events_rx)
    }

    async fn run(mut self) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(Message::Record(id, patch)) => {
                        self.queue.record(id, patch);
                        self.deadline = Some(Instant::now() + self.debounce);
                    }
                    Some(Message::Forget(id, ack)) => {
                        self.queue.forget(id);
                        if let Some(ack) = ack {
                            let _ = ack.send(());
                        }
                    }
                    Some(Message::Flush(reply)) => {
                        let event = self.flush().await;
                        let _ = reply.send(event);
                    }
                    Some(Message::Shutdown(reply)) => {
                        self.flush().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        // Every handle is gone: last chance to persist.
                        if !self.queue.is_empty() {
                            log::debug!("autosave: teardown flush of {} nodes", self.queue.len());
                        }
                        self.flush().await;
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush().await;
                }
            }
        }
    }

    async fn flush(&mut self) -> Option<SaveEvent> {
        self.deadline = None;
        if self.queue.is_empty() {
            return None;
        }
        let entries = self.queue.take();
        log::debug!("autosave: flushing {} nodes", entries.len());
        let outcome = flush_batch(self.api.as_ref(), entries).await;

        let event = match outcome.error {
            None => SaveEvent::Saved {
                count: outcome.saved,
            },
            Some(error) => {
                self.queue.restore(outcome.retry);
                log::warn!(
                    "autosave: {} saved, {} dropped, {} pending: {error}",
                    outcome.saved,
                    outcome.dropped,
                    self.queue.len()
                );
                SaveEvent::Failed {
                    pending: self.queue.len(),
                    error,
                }
            }
        };
        let _ = self.events.send(event.clone());
        Some(event)
    }
}

/// Handle to a running [`Autosaver`]. Dropping it flushes what is left.
pub struct AutosaveHandle {
    tx: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    pub fn record(&self, id: NodeId, patch: NodePatch) {
        if self.tx.send(Message::Record(id, patch)).is_err() {
            log::warn!("autosave: task stopped, write to {id} lost");
        }
    }

    pub fn forget(&self, id: NodeId) {
        let _ = self.tx.send(Message::Forget(id, None));
    }

    /// Forget `id` and wait until no flush is still sending an older write
    /// for it. Flushes run inside the task, so the acknowledgement cannot
    /// overtake one in flight.
    pub async fn discard(&self, id: NodeId) {
        let (ack, rx) = oneshot::channel();
        if self.tx.send(Message::Forget(id, Some(ack))).is_ok() {
            let _ = rx.await;
        }
    }

    /// Flush now and wait for the outcome. `None` when nothing was pending.
    pub async fn flush(&self) -> Option<SaveEvent> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Message::Flush(reply)).ok()?;
        rx.await.ok().flatten()
    }

    /// Flush the remainder and stop the task.
    pub async fn shutdown(self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Message::Shutdown(reply)).is_ok() {
            let _ = rx.await;
        }
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryCanvasApi;
    use ideaflow_core::geometry::Point;
    use ideaflow_core::{Bounds, Canvas, Node, NodeKind};
    use pretty_assertions::assert_eq;

    fn at(x: f64, y: f64) -> NodePatch {
        NodePatch::position(Point::new(x, y))
    }

    fn api_with(ids: &[&str]) -> Arc<MemoryCanvasApi> {
        Arc::new(MemoryCanvasApi::with_canvas(Canvas {
            id: "autosave-test".into(),
            nodes: ids
                .iter()
                .map(|id| Node::new(NodeId::intern(id), NodeKind::SubIdea, 0.0, 0.0))
                .collect(),
            ..Canvas::default()
        }))
    }

    #[test]
    fn record_keeps_latest_fields() {
        let id = NodeId::intern("q_latest");
        let mut q = PendingQueue::new();
        q.record(id, at(1.0, 1.0));
        q.record(id, at(2.0, 2.0));
        q.record(id, at(3.0, 3.0));
        assert_eq!(q.len(), 1);
        assert_eq!(q.get(id), Some(&at(3.0, 3.0)));
    }

    #[test]
    fn restore_yields_to_newer_writes() {
        let a = NodeId::intern("q_restore_a");
        let b = NodeId::intern("q_restore_b");
        let mut q = PendingQueue::new();
        q.record(a, NodePatch::bounds(Bounds::new(0.0, 0.0, 50.0, 50.0)));
        q.record(b, at(1.0, 1.0));
        let failed = q.take();
        assert!(q.is_empty());

        q.record(a, at(9.0, 9.0));
        q.restore(failed);

        let merged = q.get(a).unwrap();
        assert_eq!((merged.x, merged.y), (Some(9.0), Some(9.0)));
        assert_eq!((merged.width, merged.height), (Some(50.0), Some(50.0)));
        assert_eq!(q.get(b), Some(&at(1.0, 1.0)));
    }

    #[test]
    fn forget_removes_entry() {
        let id = NodeId::intern("q_forget");
        let mut q = PendingQueue::new();
        q.record(id, at(1.0, 1.0));
        q.forget(id);
        assert!(q.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_writes_collapse_into_one_call() {
        let api = api_with(&["as_rapid"]);
        let id = NodeId::intern("as_rapid");
        let (handle, mut events) = Autosaver::spawn(api.clone(), Duration::from_millis(1000));

        handle.record(id, at(10.0, 0.0));
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.record(id, at(20.0, 0.0));
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.record(id, at(30.0, 0.0));
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(api.updates().is_empty(), "deadline should reset on each write");

        assert_eq!(events.recv().await, Some(SaveEvent::Saved { count: 1 }));
        assert_eq!(api.updates(), vec![(id, at(30.0, 0.0))]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_flush_keeps_entries_for_next_attempt() {
        let api = api_with(&["as_retry"]);
        let id = NodeId::intern("as_retry");
        let (handle, _events) = Autosaver::spawn(api.clone(), Duration::from_millis(1000));

        api.fail_node(id, ApiError::Network("offline".into()));
        handle.record(id, at(5.0, 5.0));
        let event = handle.flush().await;
        assert!(matches!(event, Some(SaveEvent::Failed { pending: 1, .. })));

        api.heal();
        assert_eq!(handle.flush().await, Some(SaveEvent::Saved { count: 1 }));
        assert_eq!(api.updates(), vec![(id, at(5.0, 5.0)), (id, at(5.0, 5.0))]);
        assert_eq!(handle.flush().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_nodes_are_not_retried() {
        let api = api_with(&[]);
        let (handle, _events) = Autosaver::spawn(api.clone(), Duration::from_millis(1000));

        handle.record(NodeId::intern("as_ghost"), at(1.0, 1.0));
        let event = handle.flush().await;
        assert!(matches!(
            event,
            Some(SaveEvent::Failed {
                pending: 0,
                error: ApiError::NotFound(_)
            })
        ));
        assert_eq!(handle.flush().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn one_event_per_flush_attempt() {
        let api = api_with(&["as_one_a", "as_one_b"]);
        let (handle, mut events) = Autosaver::spawn(api.clone(), Duration::from_millis(1000));
        api.set_outage(Some(ApiError::Network("down".into())));

        handle.record(NodeId::intern("as_one_a"), at(1.0, 1.0));
        handle.record(NodeId::intern("as_one_b"), at(2.0, 2.0));
        handle.flush().await;
        handle.shutdown().await;

        let mut received = Vec::new();
        while let Some(event) = events.recv().await {
            received.push(event);
        }
        // The failed flush, then the shutdown flush retrying both.
        assert_eq!(received.len(), 2);
        assert!(received.iter().all(|e| matches!(e, SaveEvent::Failed { pending: 2, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_flushes() {
        let api = api_with(&["as_teardown"]);
        let id = NodeId::intern("as_teardown");
        let (handle, mut events) = Autosaver::spawn(api.clone(), Duration::from_millis(1000));

        handle.record(id, at(7.0, 7.0));
        drop(handle);

        assert_eq!(events.recv().await, Some(SaveEvent::Saved { count: 1 }));
        assert_eq!(events.recv().await, None);
        assert_eq!(api.stored_node(id).map(|n| n.x), Some(7.0));
    }

    #[tokio::test(start_paused = true)]
    async fn write_during_flush_survives_failure() {
        let api = api_with(&["as_midflight"]);
        let id = NodeId::intern("as_midflight");
        api.set_latency(Duration::from_millis(100));
        api.fail_node(id, ApiError::Network("timeout".into()));
        let (handle, mut events) = Autosaver::spawn(api.clone(), Duration::from_millis(1000));

        handle.record(id, NodePatch::bounds(Bounds::new(0.0, 0.0, 10.0, 10.0)));
        // Deadline fires at 1000ms; the batch is still in flight at 1050ms.
        tokio::time::sleep(Duration::from_millis(1050)).await;
        handle.record(id, at(9.0, 9.0));

        assert!(matches!(
            events.recv().await,
            Some(SaveEvent::Failed { pending: 1, .. })
        ));

        api.heal();
        assert_eq!(handle.flush().await, Some(SaveEvent::Saved { count: 1 }));
        let sent = api.updates().pop().map(|(_, patch)| patch);
        assert_eq!(sent, Some(NodePatch::bounds(Bounds::new(9.0, 9.0, 10.0, 10.0))));
    }

    #[tokio::test(start_paused = true)]
    async fn discard_waits_for_batch_in_flight() {
        let api = api_with(&["as_discard"]);
        let id = NodeId::intern("as_discard");
        api.set_latency(Duration::from_millis(100));
        let (handle, _events) = Autosaver::spawn(api.clone(), Duration::from_millis(1000));

        handle.record(id, at(4.0, 4.0));
        tokio::time::sleep(Duration::from_millis(1050)).await;
        assert!(api.updates().is_empty(), "batch should still be in flight");

        handle.discard(id).await;
        assert_eq!(api.updates(), vec![(id, at(4.0, 4.0))]);
    }

    #[tokio::test(start_paused = true)]
    async fn forget_discards_pending_write() {
        let api = api_with(&["as_forgotten"]);
        let id = NodeId::intern("as_forgotten");
        let (handle, _events) = Autosaver::spawn(api.clone(), Duration::from_millis(1000));

        handle.record(id, at(3.0, 3.0));
        handle.forget(id);
        assert_eq!(handle.flush().await, None);
        assert!(api.updates().is_empty());
    }
}
