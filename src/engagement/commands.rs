// Command objects, one per engagement dimension.

use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use super::action::{EngagementAction, EngagementKind, EngagementState, FlagState};
use super::optimistic::OptimisticCommand;
use crate::api::traits::{FeedBackend, LikeState, ViewCount};
use crate::feed::models::{Comment, FeedItem, NewComment, NewRepost};

/// What a failed recast/recite reverts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CounterRollback {
    /// Revert both the flag and the optimistic counter increment.
    #[default]
    Consistent,
    /// Revert only the flag; the counter keeps its optimistic increment.
    FlagOnly,
}

impl FromStr for CounterRollback {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "consistent" | "both" => Ok(CounterRollback::Consistent),
            "flag-only" | "flag_only" | "flag" => Ok(CounterRollback::FlagOnly),
            other => anyhow::bail!("Unknown counter rollback policy: {other}"),
        }
    }
}

/// Flip one actor's membership in the likes set.
pub struct ToggleLike {
    pub actor_id: String,
}

#[async_trait]
impl OptimisticCommand for ToggleLike {
    type Remote = LikeState;

    fn kind(&self, state: &EngagementState) -> EngagementKind {
        if state.engagement().is_liked_by(&self.actor_id) {
            EngagementKind::Unlike
        } else {
            EngagementKind::Like
        }
    }

    fn apply(&self, state: &mut EngagementState) {
        let likes = &mut state.engagement_mut().likes;
        if !likes.remove(&self.actor_id) {
            likes.insert(self.actor_id.clone());
        }
        state.flags.liked = FlagState::Pending;
    }

    async fn send(&self, backend: &dyn FeedBackend, item: &FeedItem) -> Result<LikeState> {
        backend.toggle_like(item.id(), &self.actor_id).await
    }

    fn commit(&self, state: &mut EngagementState, remote: LikeState) {
        if let Some(likes) = remote.likes {
            state.engagement_mut().likes = likes;
        }
        let liked = state.engagement().is_liked_by(&self.actor_id);
        state.flags.liked = FlagState::from_bool(liked);
    }

    fn rollback(&self, state: &mut EngagementState, action: &EngagementAction) {
        state.engagement_mut().likes = action.snapshot.engagement.likes.clone();
        state.flags.liked = action.snapshot.flags.liked;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepostKind {
    Recast,
    Recite,
}

/// Reply folded in after a successful repost.
pub struct RepostReceipt {
    pub record_id: String,
    /// Updated counter from the counter endpoint, when that call succeeded.
    pub count: Option<u64>,
}

/// Submit a recast or recite and bump the matching counter.
pub struct Repost {
    pub kind: RepostKind,
    pub request: NewRepost,
    pub counter_rollback: CounterRollback,
}

impl Repost {
    fn counter<'a>(&self, state: &'a mut EngagementState) -> &'a mut u64 {
        let engagement = state.engagement_mut();
        match self.kind {
            RepostKind::Recast => &mut engagement.recast_count,
            RepostKind::Recite => &mut engagement.recite_count,
        }
    }

    fn flag<'a>(&self, state: &'a mut EngagementState) -> &'a mut FlagState {
        match self.kind {
            RepostKind::Recast => &mut state.flags.reposted,
            RepostKind::Recite => &mut state.flags.recited,
        }
    }
}

#[async_trait]
impl OptimisticCommand for Repost {
    type Remote = RepostReceipt;

    fn kind(&self, _state: &EngagementState) -> EngagementKind {
        match self.kind {
            RepostKind::Recast => EngagementKind::Recast,
            RepostKind::Recite => EngagementKind::Recite,
        }
    }

    fn apply(&self, state: &mut EngagementState) {
        *self.counter(state) += 1;
        *self.flag(state) = FlagState::Pending;
    }

    async fn send(&self, backend: &dyn FeedBackend, _item: &FeedItem) -> Result<RepostReceipt> {
        let origin = &self.request.original_post_id;

        // The record is what matters; the counter bump is best-effort once
        // the record exists.
        let (record_id, counter) = match self.kind {
            RepostKind::Recast => {
                let record = backend.create_recast(&self.request).await?;
                (record.body.id, backend.increment_recast_count(origin).await)
            }
            RepostKind::Recite => {
                let record = backend.create_recite(&self.request).await?;
                (record.body.id, backend.increment_recite_count(origin).await)
            }
        };

        let count = match counter {
            Ok(value) => value.count,
            Err(e) => {
                warn!(post_id = %origin, error = %e, "Repost counter bump failed");
                None
            }
        };
        Ok(RepostReceipt { record_id, count })
    }

    fn commit(&self, state: &mut EngagementState, remote: RepostReceipt) {
        if let Some(count) = remote.count {
            let counter = self.counter(state);
            *counter = (*counter).max(count);
        }
        *self.flag(state) = FlagState::Active;
    }

    fn rollback(&self, state: &mut EngagementState, action: &EngagementAction) {
        let previous = match self.kind {
            RepostKind::Recast => action.snapshot.flags.reposted,
            RepostKind::Recite => action.snapshot.flags.recited,
        };
        *self.flag(state) = previous;

        if self.counter_rollback == CounterRollback::Consistent {
            let snapshot = &action.snapshot.engagement;
            let previous = match self.kind {
                RepostKind::Recast => snapshot.recast_count,
                RepostKind::Recite => snapshot.recite_count,
            };
            *self.counter(state) = previous;
        }
    }
}

/// Count a view. Best-effort: never rolled back.
pub struct IncrementView;

#[async_trait]
impl OptimisticCommand for IncrementView {
    type Remote = ViewCount;

    fn kind(&self, _state: &EngagementState) -> EngagementKind {
        EngagementKind::View
    }

    fn apply(&self, state: &mut EngagementState) {
        state.engagement_mut().views += 1;
    }

    async fn send(&self, backend: &dyn FeedBackend, item: &FeedItem) -> Result<ViewCount> {
        backend.increment_view(item.id()).await
    }

    fn commit(&self, state: &mut EngagementState, remote: ViewCount) {
        if let Some(views) = remote.views {
            let engagement = state.engagement_mut();
            engagement.views = engagement.views.max(views);
        }
    }

    fn rollback(&self, _state: &mut EngagementState, _action: &EngagementAction) {}

    fn reverts_on_failure(&self) -> bool {
        false
    }
}

/// Post a comment, bumping the comment count up front.
pub struct AddComment {
    pub request: NewComment,
}

#[async_trait]
impl OptimisticCommand for AddComment {
    type Remote = Comment;

    fn kind(&self, _state: &EngagementState) -> EngagementKind {
        EngagementKind::Comment
    }

    fn apply(&self, state: &mut EngagementState) {
        state.engagement_mut().comments_count += 1;
    }

    async fn send(&self, backend: &dyn FeedBackend, item: &FeedItem) -> Result<Comment> {
        backend.post_comment(item.id(), &self.request).await
    }

    fn commit(&self, state: &mut EngagementState, remote: Comment) {
        state.comments.push(remote);
    }

    fn rollback(&self, state: &mut EngagementState, action: &EngagementAction) {
        state.engagement_mut().comments_count = action.snapshot.engagement.comments_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_rollback_parses_env_spellings() {
        assert_eq!(
            "consistent".parse::<CounterRollback>().unwrap(),
            CounterRollback::Consistent
        );
        assert_eq!(
            "Flag-Only".parse::<CounterRollback>().unwrap(),
            CounterRollback::FlagOnly
        );
        assert!("sometimes".parse::<CounterRollback>().is_err());
    }
}
