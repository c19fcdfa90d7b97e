// Feed aggregator: the ordered, deduplicated list for one level.
//
// Full refreshes replace the list wholesale from three concurrent source
// fetches. Live updates go through `reduce`, a pure function over the list,
// so every merge rule is testable without a socket.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::events::{FeedEvent, RemoteEvent};
use super::merge::{bump_target, contains_id, merge_sources, move_to_front, position_of};
use super::models::{BumpMark, FeedItem, Level, Recast};
use crate::api::traits::FeedBackend;
use crate::realtime::RoomChannel;

/// Bounded capacity of the channel feeding the reducer.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Create the channel every producer (socket, controllers) sends into.
pub fn event_channel() -> (mpsc::Sender<FeedEvent>, mpsc::Receiver<FeedEvent>) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Posts,
    Recites,
    Recasts,
}

impl std::fmt::Display for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeedSource::Posts => "posts",
            FeedSource::Recites => "recites",
            FeedSource::Recasts => "recasts",
        };
        f.write_str(name)
    }
}

/// Outcome of the last full refresh. An empty list is ambiguous on its own;
/// the status tells "nothing posted yet" apart from "couldn't load".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// Nothing loaded yet.
    Idle,
    Ready,
    /// Some sources failed and were treated as empty.
    Degraded { failed: Vec<FeedSource> },
    /// Every source failed.
    Unavailable,
}

/// Apply one event to the list.
///
/// - `newPost`/`newRecite`: prepended unless the id is already listed.
/// - `newRecast`: bumps the row representing its original to the front, or
///   is inserted as a standalone row when the original isn't listed.
/// - `deletePost` / local removal: drops every row with that id.
/// - `ItemUpdated`: substitutes by id, keeping position and bump marker.
pub fn reduce(mut items: Vec<FeedItem>, event: &FeedEvent) -> Vec<FeedItem> {
    match event {
        FeedEvent::Remote(RemoteEvent::NewPost(post)) => {
            prepend_unique(&mut items, FeedItem::Post(post.clone()));
        }
        FeedEvent::Remote(RemoteEvent::NewRecite(recite)) => {
            prepend_unique(&mut items, FeedItem::Recite(recite.clone()));
        }
        FeedEvent::Remote(RemoteEvent::NewRecast(recast)) => {
            apply_recast(&mut items, recast);
        }
        FeedEvent::Remote(RemoteEvent::DeletePost(id)) | FeedEvent::ItemRemoved(id) => {
            items.retain(|item| item.id() != id);
        }
        FeedEvent::ItemUpdated(updated) => substitute(&mut items, updated),
    }
    items
}

fn prepend_unique(items: &mut Vec<FeedItem>, item: FeedItem) {
    if contains_id(items, item.id()) {
        debug!(id = item.id(), "Ignoring duplicate delivery");
        return;
    }
    items.insert(0, item);
}

/// True if `recast_id` is already listed as a row or as the mark of a row it bumped.
fn recast_seen(items: &[FeedItem], recast_id: &str) -> bool {
    contains_id(items, recast_id)
        || items.iter().any(|item| {
            item.body()
                .bumped_by
                .as_ref()
                .is_some_and(|mark| mark.recast_id == recast_id)
        })
}

fn apply_recast(items: &mut Vec<FeedItem>, recast: &Recast) {
    if recast_seen(items, &recast.body.id) {
        debug!(id = %recast.body.id, "Ignoring duplicate recast delivery");
        return;
    }

    match bump_target(items, &recast.original_post_id) {
        Some(index) => {
            items[index].body_mut().bumped_by = Some(BumpMark {
                recast_id: recast.body.id.clone(),
                user_id: recast.body.author.id.clone(),
                user_name: recast.body.author.handle.clone(),
                at: recast.body.created_at,
            });
            move_to_front(items, index);
        }
        None => items.insert(0, FeedItem::Recast(recast.clone())),
    }
}

fn substitute(items: &mut [FeedItem], updated: &FeedItem) {
    match position_of(items, updated.id()) {
        Some(index) => {
            let mark = items[index].body().bumped_by.clone();
            let mut replacement = updated.clone();
            replacement.body_mut().bumped_by = mark;
            items[index] = replacement;
        }
        // Deleted while the controller's call was in flight.
        None => debug!(id = updated.id(), "Dropping update for unlisted item"),
    }
}

pub struct FeedAggregator {
    backend: Arc<dyn FeedBackend>,
    channel: Arc<dyn RoomChannel>,
    level: Option<Level>,
    room: Option<String>,
    items: Vec<FeedItem>,
    status: FeedStatus,
    closed: bool,
}

impl FeedAggregator {
    pub fn new(backend: Arc<dyn FeedBackend>, channel: Arc<dyn RoomChannel>) -> Self {
        Self {
            backend,
            channel,
            level: None,
            room: None,
            items: Vec::new(),
            status: FeedStatus::Idle,
            closed: false,
        }
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&FeedItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    /// Room currently joined, if any.
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn backend(&self) -> Arc<dyn FeedBackend> {
        Arc::clone(&self.backend)
    }

    /// Full refresh: fetch posts, recites and recasts for `level` concurrently
    /// and replace the list with their newest-first merge.
    ///
    /// An invalid level leaves the previous list untouched. A failing source
    /// counts as empty; the others still render.
    pub async fn load_feed(&mut self, level: &Level) -> &[FeedItem] {
        if !level.is_valid() {
            debug!(level = %level, "Ignoring load for incomplete level");
            return &self.items;
        }
        if self.closed {
            return &self.items;
        }

        let (posts, recites, recasts) = tokio::join!(
            self.backend.fetch_posts(level),
            self.backend.fetch_recites(level),
            self.backend.fetch_recasts(level),
        );

        let mut failed = Vec::new();
        let posts = source_or_empty(posts, FeedSource::Posts, &mut failed);
        let recites = source_or_empty(recites, FeedSource::Recites, &mut failed);
        let recasts = source_or_empty(recasts, FeedSource::Recasts, &mut failed);

        self.items = merge_sources([
            posts.into_iter().map(FeedItem::from).collect(),
            recites.into_iter().map(FeedItem::from).collect(),
            recasts.into_iter().map(FeedItem::from).collect::<Vec<_>>(),
        ]);
        self.level = Some(level.clone());
        self.status = match failed.len() {
            0 => FeedStatus::Ready,
            3 => FeedStatus::Unavailable,
            _ => FeedStatus::Degraded { failed },
        };

        info!(level = %level, items = self.items.len(), status = ?self.status, "Feed loaded");
        &self.items
    }

    /// Reload the current level (pull-to-refresh, screen focus).
    pub async fn refresh(&mut self) -> &[FeedItem] {
        match self.level.clone() {
            Some(level) => self.load_feed(&level).await,
            None => &self.items,
        }
    }

    /// Switch to `level`: leave the previous room, join the new one, and run
    /// a full refresh. Joining and fetching proceed concurrently; both have
    /// finished when this returns.
    ///
    /// The feed is loaded even if joining fails; the error is returned so the
    /// caller knows the feed is not live.
    pub async fn set_level(&mut self, level: Level) -> Result<()> {
        if self.closed {
            anyhow::bail!("Feed is closed");
        }
        if !level.is_valid() {
            debug!(level = %level, "Ignoring switch to incomplete level");
            return Ok(());
        }

        if let Some(previous) = self.room.take() {
            if let Err(e) = self.channel.leave(&previous).await {
                warn!(room = %previous, error = %e, "Failed to leave room");
            }
        }

        let room = level.room();
        let channel = Arc::clone(&self.channel);
        let (joined, _) = tokio::join!(channel.join(&room), self.load_feed(&level));
        joined?;
        self.room = Some(room);
        Ok(())
    }

    /// Apply one event. Returns false if the aggregator is closed and the
    /// event was dropped.
    pub fn apply(&mut self, event: &FeedEvent) -> bool {
        if self.closed {
            return false;
        }
        self.items = reduce(std::mem::take(&mut self.items), event);
        true
    }

    pub fn on_remote_event(&mut self, event: RemoteEvent) -> bool {
        self.apply(&FeedEvent::Remote(event))
    }

    /// Drain `events` into the list, calling `render` after each applied
    /// event. Returns when every sender is gone or the aggregator is closed.
    ///
    /// A closed aggregator also closes `events`, so producers still holding a
    /// sender see their sends fail instead of filling the buffer.
    pub async fn run<F>(&mut self, events: &mut mpsc::Receiver<FeedEvent>, mut render: F)
    where
        F: FnMut(&FeedEvent, &[FeedItem]),
    {
        while let Some(event) = events.recv().await {
            if !self.apply(&event) {
                events.close();
                break;
            }
            render(&event, &self.items);
        }
    }

    /// Leave the room and stop applying events. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(room) = self.room.take() {
            self.channel.leave(&room).await?;
        }
        Ok(())
    }
}

fn source_or_empty<T>(result: Result<Vec<T>>, source: FeedSource, failed: &mut Vec<FeedSource>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!(source = %source, error = %e, "Feed source failed, treating as empty");
            failed.push(source);
            Vec::new()
        }
    }
}
