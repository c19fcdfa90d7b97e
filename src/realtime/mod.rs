// Real-time channel: room-scoped push events for the live feed.
//
// The feed subscribes to one room per level. `RoomChannel` is the seam the
// aggregator uses to join and leave rooms; events themselves flow into the
// aggregator's bounded `FeedEvent` channel, fed by whichever transport
// implements the trait (SocketChannel for the live server).

pub mod packet;
pub mod socket;

use anyhow::Result;
use async_trait::async_trait;

pub const JOIN_ROOM: &str = "joinRoom";
pub const LEAVE_ROOM: &str = "leaveRoom";

#[async_trait]
pub trait RoomChannel: Send + Sync {
    /// Start receiving events for `room`.
    async fn join(&self, room: &str) -> Result<()>;

    /// Stop receiving events for `room`.
    async fn leave(&self, room: &str) -> Result<()>;
}

/// A channel that never delivers anything. Used for one-shot reads where no
/// live updates are wanted.
pub struct DetachedChannel;

#[async_trait]
impl RoomChannel for DetachedChannel {
    async fn join(&self, _room: &str) -> Result<()> {
        Ok(())
    }

    async fn leave(&self, _room: &str) -> Result<()> {
        Ok(())
    }
}
