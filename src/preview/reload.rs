use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::pipeline::notice;

const CHANNEL_CAPACITY: usize = 16;

/// Something that can tell browsers to reload.
#[async_trait]
pub trait Reload: Send + Sync + 'static {
    async fn reload(&self);
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    Reload,
}

/// Fans reload messages out to every connected browser session.
#[derive(Clone, Debug)]
pub struct ReloadHandle {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHandle {
    pub fn new() -> ReloadHandle {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        ReloadHandle { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    #[cfg(test)]
    pub fn session_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Sends a reload to every session. Returns how many sessions got it.
    pub fn broadcast(&self) -> usize {
        // An error just means nobody is connected
        self.sender.send(ReloadMessage::Reload).unwrap_or_default()
    }
}

impl Default for ReloadHandle {
    fn default() -> Self {
        ReloadHandle::new()
    }
}

#[async_trait]
impl Reload for ReloadHandle {
    async fn reload(&self) {
        notice("Reloading Browser Preview.");
        let sessions = self.broadcast();
        tracing::debug!(sessions, "Sent reload");
    }
}

pub(super) async fn reload_socket(
    ws: WebSocketUpgrade,
    State(handle): State<ReloadHandle>,
) -> Response {
    let receiver = handle.subscribe();
    ws.on_upgrade(move |socket| run_session(socket, receiver))
}

async fn run_session(mut socket: WebSocket, mut receiver: broadcast::Receiver<ReloadMessage>) {
    tracing::debug!("Browser connected");

    loop {
        tokio::select! {
            incoming = socket.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("Browser connection failed: {e}");
                    break;
                }
            },
            message = receiver.recv() => match message {
                Ok(message) => {
                    let payload = match serde_json::to_string(&message) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::error!("Couldn't encode reload message: {e}");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Browser session lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!("Browser disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_format() {
        assert_eq!(
            serde_json::to_string(&ReloadMessage::Reload).unwrap(),
            r#"{"type":"reload"}"#
        );
    }

    #[tokio::test]
    async fn test_reload_reaches_every_session() {
        let handle = ReloadHandle::new();
        let mut first = handle.subscribe();
        let mut second = handle.subscribe();

        handle.reload().await;

        assert_eq!(first.recv().await.unwrap(), ReloadMessage::Reload);
        assert_eq!(second.recv().await.unwrap(), ReloadMessage::Reload);
    }

    #[tokio::test]
    async fn test_reload_without_sessions_is_fine() {
        let handle = ReloadHandle::new();

        assert_eq!(handle.session_count(), 0);
        assert_eq!(handle.broadcast(), 0);
    }
}
