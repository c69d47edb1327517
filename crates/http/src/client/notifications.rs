//! Notification methods

use super::poll::{NOTIFICATION_POLL_INTERVAL, Poller};
use super::{ApiRequest, ClientError, PeerzaClient};
use crate::types::{Notification, OkResponse};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

impl PeerzaClient {
    /// Unread notifications, newest first
    pub async fn notifications(&self) -> Result<Vec<Notification>, ClientError> {
        self.execute(ApiRequest::get("/notifications/")).await
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<OkResponse, ClientError> {
        self.execute(ApiRequest::post(format!("/notifications/mark-read/{id}/")))
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<OkResponse, ClientError> {
        self.execute(ApiRequest::post("/notifications/mark-read-all/"))
            .await
    }

    /// Poll unread notifications until `cancel` fires or the session ends
    pub fn poll_notifications(
        &self,
        interval: Option<Duration>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Result<Vec<Notification>, ClientError>> {
        let client = self.clone();
        Poller::new(interval.unwrap_or(NOTIFICATION_POLL_INTERVAL), cancel).spawn(move || {
            let client = client.clone();
            async move { client.notifications().await }
        })
    }
}
