// Engagement state and the value object describing one in-flight mutation.

use chrono::{DateTime, Utc};

use crate::feed::models::{Comment, Engagement, FeedItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngagementKind {
    Like,
    Unlike,
    Recast,
    Recite,
    View,
    Comment,
}

impl std::fmt::Display for EngagementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngagementKind::Like => "like",
            EngagementKind::Unlike => "unlike",
            EngagementKind::Recast => "recast",
            EngagementKind::Recite => "recite",
            EngagementKind::View => "view",
            EngagementKind::Comment => "comment",
        };
        f.write_str(name)
    }
}

/// One boolean engagement dimension: `Inactive -> Pending -> Active|Inactive`.
/// `Pending` only lasts while the remote call is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlagState {
    #[default]
    Inactive,
    Pending,
    Active,
}

impl FlagState {
    pub fn from_bool(active: bool) -> Self {
        if active {
            FlagState::Active
        } else {
            FlagState::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == FlagState::Active
    }

    pub fn is_pending(self) -> bool {
        self == FlagState::Pending
    }
}

/// Per-viewer flags. `liked` is reversible; `reposted` and `recited` only
/// ever move towards `Active` (there is no un-repost).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub liked: FlagState,
    pub reposted: FlagState,
    pub recited: FlagState,
}

/// Everything an engagement controller owns for its item.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementState {
    pub item: FeedItem,
    pub flags: Flags,
    pub comments: Vec<Comment>,
}

impl EngagementState {
    pub fn new(item: FeedItem, viewer_id: &str) -> Self {
        let liked = !viewer_id.is_empty() && item.engagement().is_liked_by(viewer_id);
        Self {
            item,
            flags: Flags {
                liked: FlagState::from_bool(liked),
                ..Flags::default()
            },
            comments: Vec::new(),
        }
    }

    pub fn engagement(&self) -> &Engagement {
        self.item.engagement()
    }

    pub fn engagement_mut(&mut self) -> &mut Engagement {
        self.item.engagement_mut()
    }
}

/// The parts of the state a rollback may restore.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementSnapshot {
    pub engagement: Engagement,
    pub flags: Flags,
}

/// One optimistic mutation in flight: what, on which item, by whom, and
/// the state to restore if the backend rejects it.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementAction {
    pub kind: EngagementKind,
    pub target_id: String,
    pub snapshot: EngagementSnapshot,
    pub actor_id: String,
    pub started_at: DateTime<Utc>,
}

impl EngagementAction {
    /// Capture the snapshot. Must be called before the optimistic change.
    pub fn begin(kind: EngagementKind, state: &EngagementState, actor_id: &str) -> Self {
        Self {
            kind,
            target_id: state.item.id().to_string(),
            snapshot: EngagementSnapshot {
                engagement: state.engagement().clone(),
                flags: state.flags,
            },
            actor_id: actor_id.to_string(),
            started_at: Utc::now(),
        }
    }
}
