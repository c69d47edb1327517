//! Periodic re-fetching for views that have no push channel

use super::ClientError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default refresh rate of an open chat
pub const CHAT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default refresh rate of the notification list
pub const NOTIFICATION_POLL_INTERVAL: Duration = Duration::from_secs(8);

const CHANNEL_CAPACITY: usize = 8;

/// Runs a fetch on a fixed interval and forwards every result.
///
/// The first fetch happens immediately. Each fetch is awaited before the next
/// tick, so a slow server never causes overlapping requests from one poller;
/// ticks missed meanwhile are skipped. The poller stops when its token is
/// cancelled, when the receiver is dropped, or right after forwarding a
/// session-expired error.
pub struct Poller {
    interval: Duration,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(interval: Duration, cancel: CancellationToken) -> Self {
        Self { interval, cancel }
    }

    pub fn spawn<T, F, Fut>(self, mut fetch: F) -> mpsc::Receiver<Result<T, ClientError>>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let Self { interval, cancel } = self;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    result = fetch() => result,
                };

                let expired = matches!(&result, Err(err) if err.is_session_expired());
                if tx.send(result).await.is_err() {
                    debug!("Poll receiver dropped");
                    break;
                }
                if expired {
                    debug!("Session expired, stopping poller");
                    break;
                }
            }

            debug!("Poller stopped");
        });

        rx
    }
}
