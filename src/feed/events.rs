// Events consumed by the feed reducer.
//
// `RemoteEvent` is what the real-time channel pushes; `FeedEvent` wraps it
// together with the substitutions engagement controllers send back, so a
// single bounded channel carries everything the aggregator applies.

use anyhow::{Context, Result};
use serde_json::Value;

use super::models::{FeedItem, Post, Recast, Recite};

pub const NEW_POST: &str = "newPost";
pub const NEW_RECITE: &str = "newRecite";
pub const NEW_RECAST: &str = "newRecast";
pub const DELETE_POST: &str = "deletePost";

/// A push notification from the level's room.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    NewPost(Post),
    NewRecite(Recite),
    NewRecast(Recast),
    DeletePost(String),
}

impl RemoteEvent {
    /// Decode a named socket event and its payload.
    ///
    /// Returns `Ok(None)` for event names the feed does not handle, and an
    /// error when a known event carries a payload that doesn't decode.
    pub fn from_socket(name: &str, payload: Value) -> Result<Option<Self>> {
        let event = match name {
            NEW_POST => RemoteEvent::NewPost(
                serde_json::from_value(payload).context("Invalid newPost payload")?,
            ),
            NEW_RECITE => RemoteEvent::NewRecite(
                serde_json::from_value(payload).context("Invalid newRecite payload")?,
            ),
            NEW_RECAST => RemoteEvent::NewRecast(
                serde_json::from_value(payload).context("Invalid newRecast payload")?,
            ),
            DELETE_POST => RemoteEvent::DeletePost(deleted_id(&payload)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn name(&self) -> &'static str {
        match self {
            RemoteEvent::NewPost(_) => NEW_POST,
            RemoteEvent::NewRecite(_) => NEW_RECITE,
            RemoteEvent::NewRecast(_) => NEW_RECAST,
            RemoteEvent::DeletePost(_) => DELETE_POST,
        }
    }

    /// Id of the item the event creates or deletes.
    pub fn item_id(&self) -> &str {
        match self {
            RemoteEvent::NewPost(p) => &p.body.id,
            RemoteEvent::NewRecite(r) => &r.body.id,
            RemoteEvent::NewRecast(r) => &r.body.id,
            RemoteEvent::DeletePost(id) => id,
        }
    }
}

// The backend emits the bare id string; older builds sent the deleted document.
fn deleted_id(payload: &Value) -> Result<String> {
    match payload {
        Value::String(id) => Ok(id.clone()),
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("deletePost payload has no id"),
        other => anyhow::bail!("Unexpected deletePost payload: {other}"),
    }
}

/// Input to the feed reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Pushed from the real-time channel.
    Remote(RemoteEvent),
    /// A controller produced a new value for an item; substitute it by id.
    ItemUpdated(FeedItem),
    /// A controller's delete call succeeded.
    ItemRemoved(String),
}

impl From<RemoteEvent> for FeedEvent {
    fn from(event: RemoteEvent) -> Self {
        FeedEvent::Remote(event)
    }
}
