// Websocket transport for the live feed.
//
// Speaks Socket.IO over a raw websocket: waits for the engine handshake,
// connects the default namespace, then a background task answers pings,
// writes queued emits, and decodes pushed events into the aggregator's
// bounded channel. Dropping the channel's sender side (or the aggregator's
// receiver) shuts the task down.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use super::packet::{self, EnginePacket, SocketPacket};
use super::{RoomChannel, JOIN_ROOM, LEAVE_ROOM};
use crate::feed::events::{FeedEvent, RemoteEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the Socket.IO websocket endpoint for a server origin.
///
/// `https://host` becomes `wss://host/socket.io/?EIO=4&transport=websocket`.
pub fn socket_url(origin: &str) -> Result<Url> {
    let mut url = Url::parse(origin).with_context(|| format!("Invalid socket URL: {origin}"))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => anyhow::bail!("Unsupported socket URL scheme: {other}"),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("Cannot use scheme {scheme} for {origin}"))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

pub struct SocketChannel {
    outgoing: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl SocketChannel {
    /// Connect to the real-time server and start forwarding events to `sink`.
    pub async fn connect(origin: &str, sink: mpsc::Sender<FeedEvent>) -> Result<Self> {
        let url = socket_url(origin)?;
        debug!(url = %url, "Connecting real-time channel");

        let (ws, _response) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Websocket connect to {url} failed"))?;
        let (mut write, mut read) = ws.split();

        let handshake = await_handshake(&mut read).await?;
        debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "Engine handshake");

        write
            .send(Message::Text(packet::encode(&EnginePacket::Message(
                SocketPacket::connect(),
            ))))
            .await
            .context("Failed to send namespace connect")?;
        await_namespace(&mut write, &mut read).await?;
        info!("Real-time channel connected");

        let (outgoing, queued) = mpsc::unbounded_channel();
        let task = tokio::spawn(pump(write, read, queued, sink));

        Ok(Self { outgoing, task })
    }

    fn emit(&self, name: &str, args: Vec<Value>) -> Result<()> {
        self.outgoing
            .send(packet::emit_frame(name, args))
            .map_err(|_| anyhow::anyhow!("Real-time channel is closed"))
    }

    /// Leave the namespace, close the websocket, and wait for the pump to stop.
    pub async fn disconnect(self) -> Result<()> {
        let frame = packet::encode(&EnginePacket::Message(SocketPacket::disconnect()));
        if self.outgoing.send(frame).is_err() {
            debug!("Real-time pump already stopped, skipping disconnect frame");
        }
        drop(self.outgoing);
        self.task.await.context("Real-time task panicked")?;
        Ok(())
    }
}

#[async_trait]
impl RoomChannel for SocketChannel {
    async fn join(&self, room: &str) -> Result<()> {
        debug!(room = room, "Joining room");
        self.emit(JOIN_ROOM, vec![json!(room)])
    }

    async fn leave(&self, room: &str) -> Result<()> {
        debug!(room = room, "Leaving room");
        self.emit(LEAVE_ROOM, vec![json!(room)])
    }
}

async fn next_text(read: &mut SplitStream<WsStream>) -> Result<String> {
    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text),
            Some(Ok(Message::Close(_))) | None => {
                anyhow::bail!("Real-time server closed the connection")
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e).context("Websocket read failed"),
        }
    }
}

async fn await_handshake(read: &mut SplitStream<WsStream>) -> Result<packet::Handshake> {
    loop {
        let text = next_text(read).await?;
        match packet::decode(&text)? {
            EnginePacket::Open(handshake) => return Ok(handshake),
            other => debug!(packet = ?other, "Ignoring packet before handshake"),
        }
    }
}

async fn await_namespace(
    write: &mut SplitSink<WsStream, Message>,
    read: &mut SplitStream<WsStream>,
) -> Result<()> {
    loop {
        let text = next_text(read).await?;
        match packet::decode(&text)? {
            EnginePacket::Message(SocketPacket::Connect { .. }) => return Ok(()),
            EnginePacket::Message(SocketPacket::ConnectError { data, .. }) => {
                anyhow::bail!("Real-time server refused connection: {data:?}")
            }
            EnginePacket::Ping(data) => {
                write
                    .send(Message::Text(packet::encode(&EnginePacket::Pong(data))))
                    .await
                    .context("Failed to answer ping")?;
            }
            other => debug!(packet = ?other, "Ignoring packet before namespace connect"),
        }
    }
}

async fn pump(
    mut write: SplitSink<WsStream, Message>,
    mut read: SplitStream<WsStream>,
    mut queued: mpsc::UnboundedReceiver<String>,
    sink: mpsc::Sender<FeedEvent>,
) {
    loop {
        tokio::select! {
            frame = queued.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = write.send(Message::Text(frame)).await {
                        warn!(error = %e, "Real-time write failed");
                        break;
                    }
                }
                None => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Websocket close frame not sent");
                    }
                    break;
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if !handle_frame(&text, &mut write, &sink).await {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Real-time server closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "Real-time read failed");
                    break;
                }
            },
        }
    }
    debug!("Real-time pump stopped");
}

/// Handle one inbound frame. Returns false when the pump should stop.
async fn handle_frame(
    text: &str,
    write: &mut SplitSink<WsStream, Message>,
    sink: &mpsc::Sender<FeedEvent>,
) -> bool {
    let packet = match packet::decode(text) {
        Ok(packet) => packet,
        Err(e) => {
            warn!(error = %e, "Undecodable real-time frame");
            return true;
        }
    };

    match packet {
        EnginePacket::Ping(data) => {
            let pong = packet::encode(&EnginePacket::Pong(data));
            write.send(Message::Text(pong)).await.is_ok()
        }
        EnginePacket::Close | EnginePacket::Message(SocketPacket::Disconnect { .. }) => false,
        EnginePacket::Message(SocketPacket::Event { name, args, .. }) => {
            let payload = args.into_iter().next().unwrap_or(Value::Null);
            match RemoteEvent::from_socket(&name, payload) {
                Ok(Some(event)) => {
                    debug!(event = event.name(), id = event.item_id(), "Pushed event");
                    // A closed receiver means the feed was torn down.
                    sink.send(FeedEvent::Remote(event)).await.is_ok()
                }
                Ok(None) => {
                    debug!(event = %name, "Ignoring unhandled event");
                    true
                }
                Err(e) => {
                    warn!(event = %name, error = %e, "Dropping malformed event");
                    true
                }
            }
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_origin_maps_to_wss_endpoint() {
        let url = socket_url("https://cast.example").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://cast.example/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn http_origin_maps_to_ws_endpoint() {
        let url = socket_url("http://localhost:3000").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:3000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        assert!(socket_url("ftp://cast.example").is_err());
    }
}
