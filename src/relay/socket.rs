//! Persistent connection to the relay
//!
//! A WebSocket carrying the same generic payload shape as the HTTP path,
//! with assistant replies streamed back as chunk frames. Connection events
//! are forwarded as typed [`RelayEvent`]s over a channel, in arrival
//! order, so consumers never install ambient callbacks.

use crate::core::error::{AssistantError, Result};
use crate::relay::protocol::{RelayConnectionState, RelayEvent, RpcPayload};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Owner of the persistent connection lifecycle
///
/// Reconnection is a hard reset: connecting while a session exists drops
/// the previous session entirely (pending sends included); nothing is
/// migrated.
pub struct RelaySocket {
    state: RelayConnectionState,
    outbound: Option<UnboundedSender<String>>,
}

impl Default for RelaySocket {
    fn default() -> Self {
        Self::new()
    }
}

impl RelaySocket {
    pub fn new() -> Self {
        Self {
            state: RelayConnectionState::Disconnected,
            outbound: None,
        }
    }

    pub fn state(&self) -> RelayConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == RelayConnectionState::Connected
    }

    /// Open the connection and return the event stream
    ///
    /// The first event delivered is `Opened`; afterwards every inbound
    /// frame arrives as `Frame` in the order the transport delivered it,
    /// terminated by `Closed` (possibly preceded by `Error`).
    pub async fn connect(&mut self, url: &str) -> Result<UnboundedReceiver<RelayEvent>> {
        // Hard reset of any prior session
        self.disconnect();

        self.state = RelayConnectionState::Connecting;
        tracing::info!(url, "connecting to relay");

        let (stream, _) = match connect_async(url).await {
            Ok(ok) => ok,
            Err(e) => {
                self.state = RelayConnectionState::Error;
                return Err(AssistantError::ConnectionError(e.to_string()));
            }
        };

        let (mut write, mut read) = stream.split();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

        // Write loop: ends when the sender side is dropped (disconnect)
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text)).await {
                    tracing::warn!("relay send failed: {}", e);
                    break;
                }
            }
            let _ = write.send(Message::Close(None)).await;
        });

        // Read loop: forwards frames in arrival order, then signals close
        let events = event_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if events.send(RelayEvent::Frame(text)).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Binary(bytes)) => {
                        if events
                            .send(RelayEvent::Frame(binary_frame_text(bytes)))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {} // ping/pong handled by the library
                    Err(e) => {
                        let _ = events.send(RelayEvent::Error(e.to_string()));
                        break;
                    }
                }
            }
            let _ = events.send(RelayEvent::Closed);
        });

        let _ = event_tx.send(RelayEvent::Opened);
        self.outbound = Some(outbound_tx);
        self.state = RelayConnectionState::Connected;
        Ok(event_rx)
    }

    /// Send a generic payload as a single message frame
    ///
    /// Sending while not connected is an error, never a silent drop.
    pub fn send(&self, payload: &RpcPayload) -> Result<()> {
        let sender = match (&self.outbound, self.state) {
            (Some(sender), RelayConnectionState::Connected) => sender,
            _ => return Err(AssistantError::NotConnected),
        };
        let text = serde_json::to_string(payload)?;
        sender
            .send(text)
            .map_err(|_| AssistantError::NotConnected)?;
        Ok(())
    }

    /// Drop the current session, if any
    pub fn disconnect(&mut self) {
        if self.outbound.take().is_some() {
            tracing::info!("relay connection dropped");
        }
        self.state = RelayConnectionState::Disconnected;
    }

    /// Record that the connection closed or errored from the remote side
    ///
    /// Called by the event consumer when it observes `Closed`/`Error`; the
    /// caller is responsible for resetting any stream buffers it owns.
    pub fn mark_closed(&mut self, errored: bool) {
        self.outbound = None;
        self.state = if errored {
            RelayConnectionState::Error
        } else {
            RelayConnectionState::Disconnected
        };
    }
}

/// Text of a binary frame, lossily decoded when not valid UTF-8
///
/// Inbound data is never dropped; a mangled frame still reaches the
/// consumer, which keeps unparseable payloads verbatim anyway.
fn binary_frame_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
