//! Realtime subscription handler.
//!
//! Exactly one subscription is open per mounted view. A background task
//! forwards feed events into the view's channel; it never touches view
//! state itself. Lifecycle:
//!
//! `Unsubscribed → Subscribing → Subscribed → Unsubscribed`
//!
//! The final transition is terminal: closing the view, a stream error, or
//! the stream simply ending all land in `Unsubscribed`, and there is no
//! reconnect. Once a subscription is down, updates stop for the lifetime of
//! the view.

use std::sync::{Arc, RwLock};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::{ChangeStream, ChatBackend};
use crate::error::Result;
use crate::message::FeedEvent;

/// Where the subscription is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Not (or no longer) receiving events. Terminal once reached after open.
    Unsubscribed,
    /// Opening the change stream.
    Subscribing,
    /// Receiving events.
    Subscribed,
}

/// A live change-stream subscription tied to one view.
#[derive(Debug)]
pub struct Subscription {
    state: Arc<RwLock<SubscriptionState>>,
    token: CancellationToken,
    // Kept so the forwarding task is owned by the subscription it serves.
    _task: JoinHandle<()>,
}

impl Subscription {
    /// Open the backend's change stream and start forwarding into `sender`.
    pub async fn open(
        backend: &Arc<dyn ChatBackend>,
        sender: mpsc::UnboundedSender<FeedEvent>,
    ) -> Result<Self> {
        let state = Arc::new(RwLock::new(SubscriptionState::Subscribing));

        let stream = match backend.subscribe().await {
            Ok(stream) => stream,
            Err(err) => {
                *state.write().unwrap() = SubscriptionState::Unsubscribed;
                return Err(err);
            }
        };
        *state.write().unwrap() = SubscriptionState::Subscribed;
        info!(name: "subscription.opened", "change stream subscribed");

        let token = CancellationToken::new();
        let task = tokio::spawn(forward(
            stream,
            sender,
            token.clone(),
            Arc::clone(&state),
        ));

        Ok(Self {
            state,
            token,
            _task: task,
        })
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        *self.state.read().unwrap()
    }

    /// Stop forwarding. Idempotent.
    pub fn close(&self) {
        self.token.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // A dropped view must never leave a live subscription behind.
        self.token.cancel();
    }
}

/// Forwarding loop: pushes stream items into the view's channel until the
/// view cancels, the receiver is gone, or the stream ends.
async fn forward(
    mut stream: ChangeStream,
    sender: mpsc::UnboundedSender<FeedEvent>,
    token: CancellationToken,
    state: Arc<RwLock<SubscriptionState>>,
) {
    loop {
        tokio::select! {
            () = token.cancelled() => {
                debug!(name: "subscription.closed", reason = "view", "subscription closed by view");
                break;
            }
            item = stream.next() => match item {
                Some(FeedEvent::Closed) | None => {
                    debug!(name: "subscription.closed", reason = "stream", "change stream ended");
                    let _ = sender.send(FeedEvent::Closed);
                    break;
                }
                Some(event) => {
                    if sender.send(event).is_err() {
                        // Receiver dropped: the view is gone.
                        break;
                    }
                }
            }
        }
    }
    *state.write().unwrap() = SubscriptionState::Unsubscribed;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChangeEvent, Message};
    use chrono::{TimeZone, Utc};

    fn insert_event(id: i64) -> FeedEvent {
        FeedEvent::Change(ChangeEvent::Insert {
            new: Message {
                id,
                author: "A".to_string(),
                body: "hi".to_string(),
                created_at: Utc.timestamp_opt(1_756_000_000, 0).unwrap(),
            },
        })
    }

    #[tokio::test]
    async fn test_forward_delivers_then_closes_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(SubscriptionState::Subscribed));
        let stream: ChangeStream =
            Box::pin(futures::stream::iter(vec![insert_event(1), insert_event(2)]));

        forward(stream, tx, CancellationToken::new(), Arc::clone(&state)).await;

        assert_eq!(rx.recv().await, Some(insert_event(1)));
        assert_eq!(rx.recv().await, Some(insert_event(2)));
        assert_eq!(rx.recv().await, Some(FeedEvent::Closed));
        assert_eq!(rx.recv().await, None);
        assert_eq!(*state.read().unwrap(), SubscriptionState::Unsubscribed);
    }

    #[tokio::test]
    async fn test_cancel_stops_forwarding_without_closed_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(SubscriptionState::Subscribed));
        let stream: ChangeStream = Box::pin(futures::stream::pending());

        let token = CancellationToken::new();
        token.cancel();
        forward(stream, tx, token, Arc::clone(&state)).await;

        assert_eq!(rx.recv().await, None);
        assert_eq!(*state.read().unwrap(), SubscriptionState::Unsubscribed);
    }

    #[tokio::test]
    async fn test_stream_level_closed_is_forwarded_and_terminal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(SubscriptionState::Subscribed));
        let stream: ChangeStream =
            Box::pin(futures::stream::iter(vec![insert_event(1), FeedEvent::Closed]));

        forward(stream, tx, CancellationToken::new(), Arc::clone(&state)).await;

        assert_eq!(rx.recv().await, Some(insert_event(1)));
        assert_eq!(rx.recv().await, Some(FeedEvent::Closed));
        assert_eq!(rx.recv().await, None);
    }
}
