// Shared fixtures: an in-memory backend and a room channel that records
// joins and leaves. No network access anywhere.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use castfeed::api::traits::{CounterValue, FeedBackend, LikeState, ViewCount};
use castfeed::feed::models::{
    Author, Comment, Engagement, FeedItem, Level, NewComment, NewRepost, OriginSnapshot, Post,
    PostBody, Recast, Recite, UserProfile,
};
use castfeed::realtime::RoomChannel;

// ============================================================
// Fixtures
// ============================================================

pub fn at(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + ts, 0).unwrap()
}

pub fn nairobi() -> Level {
    Level::new("county", "Nairobi")
}

pub fn author(id: &str) -> Author {
    Author {
        id: id.to_string(),
        display_name: format!("{id} name"),
        handle: id.to_string(),
        avatar: None,
    }
}

pub fn body(id: &str, author_id: &str, ts: i64) -> PostBody {
    PostBody {
        id: id.to_string(),
        author: author(author_id),
        caption: format!("caption of {id}"),
        media: vec![format!("https://media.test/{id}.jpg")],
        level: nairobi(),
        created_at: at(ts),
        engagement: Engagement::default(),
        bumped_by: None,
    }
}

pub fn post(id: &str, ts: i64) -> Post {
    Post {
        body: body(id, "author", ts),
    }
}

pub fn post_by(id: &str, author_id: &str, ts: i64) -> Post {
    Post {
        body: body(id, author_id, ts),
    }
}

fn origin_of(original_id: &str) -> OriginSnapshot {
    OriginSnapshot {
        author: author("author"),
        caption: format!("caption of {original_id}"),
        media: vec![format!("https://media.test/{original_id}.jpg")],
    }
}

pub fn recite(id: &str, original_id: &str, ts: i64, quote: &str) -> Recite {
    Recite {
        body: body(id, "reciter", ts),
        original_post_id: original_id.to_string(),
        original: origin_of(original_id),
        quote: quote.to_string(),
    }
}

pub fn recast(id: &str, original_id: &str, ts: i64) -> Recast {
    Recast {
        body: body(id, "recaster", ts),
        original_post_id: original_id.to_string(),
        original: origin_of(original_id),
    }
}

pub fn post_item(id: &str, ts: i64) -> FeedItem {
    FeedItem::Post(post(id, ts))
}

pub fn ids(items: &[FeedItem]) -> Vec<&str> {
    items.iter().map(|item| item.id()).collect()
}

// ============================================================
// In-memory backend
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    FetchPosts,
    FetchRecites,
    FetchRecasts,
    Like,
    View,
    RecastCount,
    ReciteCount,
    CreateRecast,
    CreateRecite,
    Delete,
    FetchComments,
    PostComment,
    FetchUser,
}

#[derive(Default)]
struct ServerState {
    posts: Vec<Post>,
    recites: Vec<Recite>,
    recasts: Vec<Recast>,
    likes: HashMap<String, BTreeSet<String>>,
    views: HashMap<String, u64>,
    recast_counts: HashMap<String, u64>,
    recite_counts: HashMap<String, u64>,
    comments: HashMap<String, Vec<Comment>>,
    users: HashMap<String, UserProfile>,
    created_recasts: Vec<NewRepost>,
    created_recites: Vec<NewRepost>,
    deleted: Vec<(String, String)>,
    next_id: u64,
}

/// Backend that keeps server-side state in memory. Each operation can be
/// switched to fail; every call is recorded in order.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<ServerState>,
    failing: Mutex<HashSet<Op>>,
    calls: Mutex<Vec<Op>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(self, posts: Vec<Post>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for p in &posts {
                state
                    .likes
                    .insert(p.body.id.clone(), p.body.engagement.likes.clone());
            }
            state.posts = posts;
        }
        self
    }

    pub fn with_recites(self, recites: Vec<Recite>) -> Self {
        self.state.lock().unwrap().recites = recites;
        self
    }

    pub fn with_recasts(self, recasts: Vec<Recast>) -> Self {
        self.state.lock().unwrap().recasts = recasts;
        self
    }

    pub fn with_user(self, user_id: &str, profile: UserProfile) -> Self {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(user_id.to_string(), profile);
        self
    }

    pub fn with_comments(self, post_id: &str, comments: Vec<Comment>) -> Self {
        self.state
            .lock()
            .unwrap()
            .comments
            .insert(post_id.to_string(), comments);
        self
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn calls(&self) -> Vec<Op> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    pub fn server_likes(&self, post_id: &str) -> BTreeSet<String> {
        self.state
            .lock()
            .unwrap()
            .likes
            .get(post_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn server_views(&self, post_id: &str) -> u64 {
        self.state
            .lock()
            .unwrap()
            .views
            .get(post_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn created_recasts(&self) -> Vec<NewRepost> {
        self.state.lock().unwrap().created_recasts.clone()
    }

    pub fn created_recites(&self) -> Vec<NewRepost> {
        self.state.lock().unwrap().created_recites.clone()
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().deleted.clone()
    }

    fn enter(&self, op: Op) -> Result<()> {
        self.calls.lock().unwrap().push(op);
        if self.failing.lock().unwrap().contains(&op) {
            anyhow::bail!("simulated {op:?} failure");
        }
        Ok(())
    }

    fn repost_record(state: &mut ServerState, request: &NewRepost, prefix: &str) -> PostBody {
        state.next_id += 1;
        PostBody {
            id: format!("{prefix}-{}", state.next_id),
            author: request.author.clone(),
            caption: String::new(),
            media: Vec::new(),
            level: request.level.clone(),
            created_at: at(10_000 + state.next_id as i64),
            engagement: Engagement::default(),
            bumped_by: None,
        }
    }
}

#[async_trait]
impl FeedBackend for MockBackend {
    async fn fetch_posts(&self, level: &Level) -> Result<Vec<Post>> {
        self.enter(Op::FetchPosts)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .posts
            .iter()
            .filter(|p| &p.body.level == level)
            .cloned()
            .collect())
    }

    async fn fetch_recites(&self, level: &Level) -> Result<Vec<Recite>> {
        self.enter(Op::FetchRecites)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .recites
            .iter()
            .filter(|r| &r.body.level == level)
            .cloned()
            .collect())
    }

    async fn fetch_recasts(&self, level: &Level) -> Result<Vec<Recast>> {
        self.enter(Op::FetchRecasts)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .recasts
            .iter()
            .filter(|r| &r.body.level == level)
            .cloned()
            .collect())
    }

    async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<LikeState> {
        self.enter(Op::Like)?;
        let mut state = self.state.lock().unwrap();
        let likes = state.likes.entry(post_id.to_string()).or_default();
        if !likes.remove(user_id) {
            likes.insert(user_id.to_string());
        }
        Ok(LikeState {
            likes: Some(likes.clone()),
        })
    }

    async fn increment_view(&self, post_id: &str) -> Result<ViewCount> {
        self.enter(Op::View)?;
        let mut state = self.state.lock().unwrap();
        let views = state.views.entry(post_id.to_string()).or_default();
        *views += 1;
        Ok(ViewCount { views: Some(*views) })
    }

    async fn increment_recast_count(&self, post_id: &str) -> Result<CounterValue> {
        self.enter(Op::RecastCount)?;
        let mut state = self.state.lock().unwrap();
        let count = state.recast_counts.entry(post_id.to_string()).or_default();
        *count += 1;
        Ok(CounterValue { count: Some(*count) })
    }

    async fn increment_recite_count(&self, post_id: &str) -> Result<CounterValue> {
        self.enter(Op::ReciteCount)?;
        let mut state = self.state.lock().unwrap();
        let count = state.recite_counts.entry(post_id.to_string()).or_default();
        *count += 1;
        Ok(CounterValue { count: Some(*count) })
    }

    async fn create_recast(&self, request: &NewRepost) -> Result<Recast> {
        self.enter(Op::CreateRecast)?;
        let mut state = self.state.lock().unwrap();
        let body = Self::repost_record(&mut state, request, "recast");
        state.created_recasts.push(request.clone());
        Ok(Recast {
            body,
            original_post_id: request.original_post_id.clone(),
            original: request.original.clone(),
        })
    }

    async fn create_recite(&self, request: &NewRepost) -> Result<Recite> {
        self.enter(Op::CreateRecite)?;
        let mut state = self.state.lock().unwrap();
        let body = Self::repost_record(&mut state, request, "recite");
        state.created_recites.push(request.clone());
        Ok(Recite {
            body,
            original_post_id: request.original_post_id.clone(),
            original: request.original.clone(),
            quote: request.quote.clone(),
        })
    }

    async fn delete_post(&self, post_id: &str, user_id: &str) -> Result<()> {
        self.enter(Op::Delete)?;
        let mut state = self.state.lock().unwrap();
        state.posts.retain(|p| p.body.id != post_id);
        state
            .deleted
            .push((post_id.to_string(), user_id.to_string()));
        Ok(())
    }

    async fn fetch_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        self.enter(Op::FetchComments)?;
        let state = self.state.lock().unwrap();
        Ok(state.comments.get(post_id).cloned().unwrap_or_default())
    }

    async fn post_comment(&self, post_id: &str, comment: &NewComment) -> Result<Comment> {
        self.enter(Op::PostComment)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = Comment {
            id: format!("comment-{}", state.next_id),
            text: comment.text.clone(),
            user_id: comment.user_id.clone(),
            user_name: comment.user_name.clone(),
            image: comment.image.clone(),
            created_at: Some(at(20_000)),
        };
        state
            .comments
            .entry(post_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.enter(Op::FetchUser)?;
        Ok(self.state.lock().unwrap().users.get(user_id).cloned())
    }
}

// ============================================================
// Recording room channel
// ============================================================

#[derive(Default)]
pub struct RecordingChannel {
    log: Mutex<Vec<String>>,
    fail_join: Mutex<bool>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn fail_joins(&self) {
        *self.fail_join.lock().unwrap() = true;
    }
}

#[async_trait]
impl RoomChannel for RecordingChannel {
    async fn join(&self, room: &str) -> Result<()> {
        if *self.fail_join.lock().unwrap() {
            anyhow::bail!("simulated join failure");
        }
        self.log.lock().unwrap().push(format!("join:{room}"));
        Ok(())
    }

    async fn leave(&self, room: &str) -> Result<()> {
        self.log.lock().unwrap().push(format!("leave:{room}"));
        Ok(())
    }
}
