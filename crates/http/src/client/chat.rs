//! Direct messaging over REST
//!
//! New messages are discovered by polling; there is no push channel.

use super::poll::{CHAT_POLL_INTERVAL, Poller};
use super::{ApiRequest, ClientError, PeerzaClient};
use crate::types::{Conversation, Message, NewMessage, OkResponse};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

impl PeerzaClient {
    /// Conversations with friends and anyone messaged, most recent first
    pub async fn conversations(&self) -> Result<Vec<Conversation>, ClientError> {
        self.execute(ApiRequest::get("/chats/")).await
    }

    /// Full history with a peer in chronological order
    pub async fn messages(&self, peer_id: i64) -> Result<Vec<Message>, ClientError> {
        self.execute(ApiRequest::get(format!("/chats/{peer_id}/messages/")))
            .await
    }

    pub async fn send_message(
        &self,
        peer_id: i64,
        content: impl Into<String>,
    ) -> Result<Message, ClientError> {
        let content = content.into();
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::InvalidInput("message content required".into()));
        }

        let req = ApiRequest::post(format!("/chats/{peer_id}/send/")).json(&NewMessage {
            content: content.to_string(),
        })?;
        self.execute(req).await
    }

    /// Mark everything the peer sent as read
    pub async fn mark_chat_read(&self, peer_id: i64) -> Result<OkResponse, ClientError> {
        self.execute(ApiRequest::post(format!("/chats/{peer_id}/read/")))
            .await
    }

    /// Poll the history with a peer until `cancel` fires or the session ends
    pub fn poll_messages(
        &self,
        peer_id: i64,
        interval: Option<Duration>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Result<Vec<Message>, ClientError>> {
        let client = self.clone();
        Poller::new(interval.unwrap_or(CHAT_POLL_INTERVAL), cancel).spawn(move || {
            let client = client.clone();
            async move { client.messages(peer_id).await }
        })
    }
}
