// Backend trait: the async seam between the feed core and the REST API.
//
// Implementors: CastApiClient (reqwest over HTTP). Tests plug in an
// in-memory backend, so the aggregator and controllers never know whether
// they are talking to the network.

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::feed::models::{
    Comment, Level, NewComment, NewRepost, Post, Recast, Recite, UserProfile,
};

/// Response of `POST /posts/{id}/like`. The backend returns the updated
/// post; only the likes array matters here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LikeState {
    #[serde(default)]
    pub likes: Option<BTreeSet<String>>,
}

/// Response of `POST /posts/{id}/view`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewCount {
    #[serde(default)]
    pub views: Option<u64>,
}

/// Response of the recast/recite counter endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CounterValue {
    #[serde(default, alias = "recastCount", alias = "reciteCount")]
    pub count: Option<u64>,
}

#[async_trait]
pub trait FeedBackend: Send + Sync {
    // --- Feed reads ---

    async fn fetch_posts(&self, level: &Level) -> Result<Vec<Post>>;

    async fn fetch_recites(&self, level: &Level) -> Result<Vec<Recite>>;

    async fn fetch_recasts(&self, level: &Level) -> Result<Vec<Recast>>;

    // --- Engagement ---

    /// Toggle `user_id`'s like on a post. The backend flips membership.
    async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<LikeState>;

    async fn increment_view(&self, post_id: &str) -> Result<ViewCount>;

    async fn increment_recast_count(&self, post_id: &str) -> Result<CounterValue>;

    async fn increment_recite_count(&self, post_id: &str) -> Result<CounterValue>;

    async fn create_recast(&self, request: &NewRepost) -> Result<Recast>;

    async fn create_recite(&self, request: &NewRepost) -> Result<Recite>;

    /// Delete a post. Ownership is enforced by the backend.
    async fn delete_post(&self, post_id: &str, user_id: &str) -> Result<()>;

    // --- Comments ---

    async fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>>;

    async fn post_comment(&self, post_id: &str, comment: &NewComment) -> Result<Comment>;

    // --- Users ---

    /// Look up a user record. `Ok(None)` when the backend has no record yet.
    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>>;
}
