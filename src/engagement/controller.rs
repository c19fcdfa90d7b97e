// Engagement controller: one per feed item.
//
// Owns the item's mutable engagement state and drives every user action
// through the optimistic runner. The controller never touches the feed list
// directly: it sends the new item value (or a removal) over the
// aggregator's event channel and the aggregator substitutes it by id.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::action::{EngagementState, Flags};
use super::commands::{
    AddComment, CounterRollback, IncrementView, Repost, RepostKind, ToggleLike,
};
use super::optimistic::{offer, run_optimistic, ItemSink, OptimisticCommand, Outcome};
use crate::api::traits::FeedBackend;
use crate::feed::events::FeedEvent;
use crate::feed::models::{Comment, FeedItem, NewComment, NewRepost};
use crate::session::Session;

pub struct EngagementController {
    state: EngagementState,
    session: Session,
    backend: Arc<dyn FeedBackend>,
    updates: Option<mpsc::Sender<FeedEvent>>,
    counter_rollback: CounterRollback,
    deleted: bool,
}

impl EngagementController {
    /// Controller for `item` acting as `session`.
    pub fn new(item: FeedItem, session: Session, backend: Arc<dyn FeedBackend>) -> Self {
        Self {
            state: EngagementState::new(item, &session.user_id),
            session,
            backend,
            updates: None,
            counter_rollback: CounterRollback::default(),
            deleted: false,
        }
    }

    /// Publish every state change to the aggregator's event channel.
    pub fn with_updates(mut self, updates: mpsc::Sender<FeedEvent>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn with_counter_rollback(mut self, policy: CounterRollback) -> Self {
        self.counter_rollback = policy;
        self
    }

    pub fn item(&self) -> &FeedItem {
        &self.state.item
    }

    pub fn state(&self) -> &EngagementState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn flags(&self) -> Flags {
        self.state.flags
    }

    pub fn is_liked(&self) -> bool {
        self.session.is_signed_in() && self.state.engagement().is_liked_by(&self.session.user_id)
    }

    /// True once a recast by this session has been confirmed. Callers gate
    /// on it: the controller does not prevent a second submission.
    pub fn reposted(&self) -> bool {
        self.state.flags.reposted.is_active()
    }

    /// True once a recite by this session has been confirmed.
    pub fn recited(&self) -> bool {
        self.state.flags.recited.is_active()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.state.comments
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Advisory only; the backend enforces ownership.
    pub fn is_owner(&self) -> bool {
        self.session.is_signed_in() && self.state.item.author().id == self.session.user_id
    }

    /// Toggle the session's like. A committed like also counts as a view.
    pub async fn toggle_like(&mut self) -> Outcome {
        if !self.session.is_signed_in() {
            return Outcome::Skipped;
        }
        let command = ToggleLike {
            actor_id: self.session.user_id.clone(),
        };
        self.engage(&command).await
    }

    /// Plain repost. Increments `recastCount` by one before the call resolves.
    pub async fn recast(&mut self) -> Outcome {
        self.repost(RepostKind::Recast, String::new()).await
    }

    /// Quote repost. An empty quote is allowed.
    pub async fn recite(&mut self, quote: &str) -> Outcome {
        self.repost(RepostKind::Recite, quote.to_string()).await
    }

    async fn repost(&mut self, kind: RepostKind, quote: String) -> Outcome {
        if !self.session.is_signed_in() {
            return Outcome::Skipped;
        }
        let (original_post_id, original) = self.state.item.origin();
        let command = Repost {
            kind,
            request: NewRepost {
                user_id: self.session.user_id.clone(),
                author: self.session.as_author(),
                original_post_id,
                original,
                level: self.state.item.body().level.clone(),
                quote,
            },
            counter_rollback: self.counter_rollback,
        };
        self.engage(&command).await
    }

    /// Fire-and-forget view count. Always permitted; a failure is logged and
    /// the local count is kept.
    pub async fn increment_view(&mut self) -> Outcome {
        self.run(&IncrementView).await
    }

    /// Delete the item. Only attempted for the item's author; on success the
    /// aggregator is told to drop the row, on failure the item stays.
    pub async fn delete_post(&mut self) -> Outcome {
        if !self.is_owner() {
            debug!(id = self.state.item.id(), "Delete skipped, not the author");
            return Outcome::Skipped;
        }

        let id = self.state.item.id().to_string();
        match self.backend.delete_post(&id, &self.session.user_id).await {
            Ok(()) => {
                info!(id = %id, "Post deleted");
                self.deleted = true;
                if let Some(updates) = &self.updates {
                    offer(updates, FeedEvent::ItemRemoved(id));
                }
                Outcome::Committed
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Delete failed");
                Outcome::Failed
            }
        }
    }

    /// Fetch the item's comments. A failed fetch yields an empty list.
    pub async fn load_comments(&mut self) -> &[Comment] {
        let id = self.state.item.id().to_string();
        match self.backend.fetch_comments(&id).await {
            Ok(comments) => {
                let fetched = comments.len() as u64;
                self.state.comments = comments;
                let engagement = self.state.engagement_mut();
                if fetched > engagement.comments_count {
                    engagement.comments_count = fetched;
                    self.publish().await;
                }
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to fetch comments");
                self.state.comments.clear();
            }
        }
        &self.state.comments
    }

    /// Post a comment as the session. Blank text is ignored.
    pub async fn add_comment(&mut self, text: &str, image: Option<String>) -> Outcome {
        let text = text.trim();
        if !self.session.is_signed_in() || text.is_empty() {
            return Outcome::Skipped;
        }
        let command = AddComment {
            request: NewComment {
                text: text.to_string(),
                user_id: self.session.user_id.clone(),
                user_name: self.session.user_name().to_string(),
                image,
            },
        };
        self.engage(&command).await
    }

    /// Run a user engagement; every committed engagement also counts as a view.
    async fn engage<C: OptimisticCommand>(&mut self, command: &C) -> Outcome {
        let outcome = self.run(command).await;
        if outcome.is_committed() {
            self.increment_view().await;
        }
        outcome
    }

    async fn run<C: OptimisticCommand>(&mut self, command: &C) -> Outcome {
        let sink = self.updates.as_ref().map(|tx| tx as &dyn ItemSink);
        run_optimistic(
            command,
            &mut self.state,
            &self.session.user_id,
            self.backend.as_ref(),
            sink,
        )
        .await
    }

    async fn publish(&self) {
        if let Some(updates) = &self.updates {
            updates.publish(&self.state.item).await;
        }
    }
}
