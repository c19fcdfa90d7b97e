// Optimistic action runner shared by every engagement dimension.
//
// A command knows how to apply its change locally, send it, fold the
// backend's reply in, and undo itself. The runner sequences those steps and
// publishes the item after the optimistic change and again once the call
// settles, so renderers see the pending state immediately.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::action::{EngagementAction, EngagementKind, EngagementState};
use crate::api::traits::FeedBackend;
use crate::feed::events::FeedEvent;
use crate::feed::models::FeedItem;

/// How an engagement call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Preconditions not met; nothing changed and nothing was sent.
    Skipped,
    Committed,
    /// The backend call failed and the command's rollback was applied.
    RolledBack,
    /// The backend call failed and nothing was undone.
    Failed,
}

impl Outcome {
    pub fn is_committed(self) -> bool {
        self == Outcome::Committed
    }
}

#[async_trait]
pub trait OptimisticCommand: Send + Sync {
    type Remote: Send;

    /// The kind of action this command performs against `state`.
    fn kind(&self, state: &EngagementState) -> EngagementKind;

    /// Optimistic local change, applied before the call.
    fn apply(&self, state: &mut EngagementState);

    async fn send(&self, backend: &dyn FeedBackend, item: &FeedItem) -> Result<Self::Remote>;

    /// Fold the backend's reply into the state.
    fn commit(&self, state: &mut EngagementState, remote: Self::Remote);

    /// Undo `apply` using the snapshot taken before it.
    fn rollback(&self, state: &mut EngagementState, action: &EngagementAction);

    /// False for best-effort commands whose optimistic change is kept on failure.
    fn reverts_on_failure(&self) -> bool {
        true
    }
}

/// Receives item values as the runner changes them.
#[async_trait]
pub trait ItemSink: Send + Sync {
    async fn publish(&self, item: &FeedItem);
}

/// Never waits on the feed: the task driving a controller may be the same
/// one that drains the channel.
#[async_trait]
impl ItemSink for mpsc::Sender<FeedEvent> {
    async fn publish(&self, item: &FeedItem) {
        offer(self, FeedEvent::ItemUpdated(item.clone()));
    }
}

/// Queue `event` without waiting. A full or closed channel drops it.
pub fn offer(updates: &mpsc::Sender<FeedEvent>, event: FeedEvent) {
    match updates.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!("Feed channel full, update dropped");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("Feed closed, update not delivered");
        }
    }
}

pub async fn run_optimistic<C: OptimisticCommand>(
    command: &C,
    state: &mut EngagementState,
    actor_id: &str,
    backend: &dyn FeedBackend,
    sink: Option<&dyn ItemSink>,
) -> Outcome {
    let action = EngagementAction::begin(command.kind(state), state, actor_id);

    command.apply(state);
    if let Some(sink) = sink {
        sink.publish(&state.item).await;
    }

    let outcome = match command.send(backend, &state.item).await {
        Ok(remote) => {
            command.commit(state, remote);
            debug!(kind = %action.kind, id = %action.target_id, "Engagement committed");
            Outcome::Committed
        }
        Err(e) => {
            warn!(
                kind = %action.kind,
                id = %action.target_id,
                actor = %action.actor_id,
                error = %e,
                "Engagement call failed"
            );
            if command.reverts_on_failure() {
                command.rollback(state, &action);
                Outcome::RolledBack
            } else {
                Outcome::Failed
            }
        }
    };

    if let Some(sink) = sink {
        sink.publish(&state.item).await;
    }
    outcome
}
