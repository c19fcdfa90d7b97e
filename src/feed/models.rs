// Feed data model for posts, recites (quote-reposts) and recasts (plain reposts).
//
// Field names follow the backend's JSON (Mongo-style `_id`, a `user` object
// for the author). Aliases accept the cleaner spelling too, so fixtures and
// alternate deployments deserialize the same way.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic/organizational scope used to filter the feed and key the
/// real-time room, e.g. `{ "type": "county", "value": "Nairobi" }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Level {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

impl Level {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Both halves must be non-empty before the level can be fetched or joined.
    pub fn is_valid(&self) -> bool {
        !self.kind.trim().is_empty() && !self.value.trim().is_empty()
    }

    /// Real-time room name for this level.
    pub fn room(&self) -> String {
        format!("level-{}-{}", self.kind, self.value)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Author as denormalized onto every post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "firstName", alias = "name", default)]
    pub display_name: String,
    #[serde(rename = "nickName", alias = "handle", default)]
    pub handle: String,
    #[serde(rename = "image", alias = "avatar", default)]
    pub avatar: Option<String>,
}

/// Mutable engagement state carried by every feed item.
///
/// `likes` is a set keyed by user id: membership, not a count. The counters
/// only ever grow on the client, except when an optimistic increment is
/// explicitly rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    #[serde(default)]
    pub likes: BTreeSet<String>,
    #[serde(default)]
    pub recast_count: u64,
    #[serde(default)]
    pub recite_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub views: u64,
}

impl Engagement {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.contains(user_id)
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }
}

/// Marks a row that was moved to the top of the feed by a live recast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BumpMark {
    pub recast_id: String,
    pub user_id: String,
    pub user_name: String,
    pub at: DateTime<Utc>,
}

/// Fields shared by all three item kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBody {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "user", alias = "author")]
    pub author: Author,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub media: Vec<String>,
    #[serde(default)]
    pub level: Level,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub engagement: Engagement,
    /// Client-side only; never sent to or read from the backend.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub bumped_by: Option<BumpMark>,
}

/// Snapshot of the origin post copied onto a recast or recite at creation
/// time, so the repost renders even if the origin is gone or never fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginSnapshot {
    #[serde(rename = "originalAuthor", default)]
    pub author: Author,
    #[serde(rename = "originalCaption", default)]
    pub caption: String,
    #[serde(rename = "originalMedia", default)]
    pub media: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(flatten)]
    pub body: PostBody,
}

/// A quote-repost. Always renders as its own card, even with an empty quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recite {
    #[serde(flatten)]
    pub body: PostBody,
    pub original_post_id: String,
    #[serde(flatten)]
    pub original: OriginSnapshot,
    #[serde(default)]
    pub quote: String,
}

/// A plain repost. Bumps its original when the original is already listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recast {
    #[serde(flatten)]
    pub body: PostBody,
    pub original_post_id: String,
    #[serde(flatten)]
    pub original: OriginSnapshot,
}

/// One row of the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeedItem {
    Post(Post),
    Recite(Recite),
    Recast(Recast),
}

impl FeedItem {
    pub fn body(&self) -> &PostBody {
        match self {
            FeedItem::Post(p) => &p.body,
            FeedItem::Recite(r) => &r.body,
            FeedItem::Recast(r) => &r.body,
        }
    }

    pub fn body_mut(&mut self) -> &mut PostBody {
        match self {
            FeedItem::Post(p) => &mut p.body,
            FeedItem::Recite(r) => &mut r.body,
            FeedItem::Recast(r) => &mut r.body,
        }
    }

    pub fn id(&self) -> &str {
        &self.body().id
    }

    pub fn author(&self) -> &Author {
        &self.body().author
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.body().created_at
    }

    pub fn engagement(&self) -> &Engagement {
        &self.body().engagement
    }

    pub fn engagement_mut(&mut self) -> &mut Engagement {
        &mut self.body_mut().engagement
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FeedItem::Post(_) => "post",
            FeedItem::Recite(_) => "recite",
            FeedItem::Recast(_) => "recast",
        }
    }

    /// Id of the post this item reposts, if it is a repost.
    pub fn original_post_id(&self) -> Option<&str> {
        match self {
            FeedItem::Post(_) => None,
            FeedItem::Recite(r) => Some(&r.original_post_id),
            FeedItem::Recast(r) => Some(&r.original_post_id),
        }
    }

    /// The post a new recast/recite of this row should point at, with its
    /// denormalized copy.
    ///
    /// Posts and recites are origins in their own right. A recast is only a
    /// bump, so reposting it reposts the underlying original.
    pub fn origin(&self) -> (String, OriginSnapshot) {
        match self {
            FeedItem::Recast(r) => (r.original_post_id.clone(), r.original.clone()),
            other => {
                let body = other.body();
                (
                    body.id.clone(),
                    OriginSnapshot {
                        author: body.author.clone(),
                        caption: body.caption.clone(),
                        media: body.media.clone(),
                    },
                )
            }
        }
    }
}

impl From<Post> for FeedItem {
    fn from(p: Post) -> Self {
        FeedItem::Post(p)
    }
}

impl From<Recite> for FeedItem {
    fn from(r: Recite) -> Self {
        FeedItem::Recite(r)
    }
}

impl From<Recast> for FeedItem {
    fn from(r: Recast) -> Self {
        FeedItem::Recast(r)
    }
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /comments/{postId}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub text: String,
    pub user_id: String,
    pub user_name: String,
    pub image: Option<String>,
}

/// Body of `POST /recasts` and `POST /recites`. Recasts always send an
/// empty quote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRepost {
    pub user_id: String,
    #[serde(rename = "user")]
    pub author: Author,
    pub original_post_id: String,
    #[serde(flatten)]
    pub original: OriginSnapshot,
    pub level: Level,
    pub quote: String,
}

/// Backend user record, as returned by `GET /users/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id", default)]
    pub record_id: String,
    /// Identity-provider id; the value every mutation call carries as `userId`.
    #[serde(default)]
    pub clerk_id: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub nick_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub constituency: Option<String>,
    #[serde(default)]
    pub ward: Option<String>,
}
