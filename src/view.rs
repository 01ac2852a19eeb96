//! The chat view: single owner and single writer of all client-side state.
//!
//! A mounted view holds the message store, the composer, and one open
//! subscription. The caller's task drives it: await [`ChatView::next_event`],
//! hand the result to [`ChatView::apply`], and call the composer/submit
//! operations in between. The subscription task never mutates view state —
//! it only feeds the event channel — so no locking is needed here.
//!
//! Sends are eventually consistent: a successful [`ChatView::submit`] does
//! not touch the list. The new row arrives like everyone else's, through the
//! change stream.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::backend::ChatBackend;
use crate::composer::Composer;
use crate::error::Result;
use crate::message::{ChangeEvent, FeedEvent, Message, MessageId, NewMessage, SortKey};
use crate::store::MessageStore;
use crate::subscription::{Subscription, SubscriptionState};

/// Fallback sender label when none is configured.
pub const DEFAULT_AUTHOR: &str = "anonymous";

/// Per-view settings.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Sender label attached to outgoing messages. Empty/whitespace falls
    /// back to [`DEFAULT_AUTHOR`].
    pub author: String,
    /// Ordering column for the message list.
    pub sort_key: SortKey,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
            sort_key: SortKey::Id,
        }
    }
}

/// A mounted single-room chat view.
#[derive(Debug)]
pub struct ChatView {
    backend: Arc<dyn ChatBackend>,
    store: MessageStore,
    composer: Composer,
    subscription: Option<Subscription>,
    events: mpsc::UnboundedReceiver<FeedEvent>,
    author: String,
    last_error: Option<String>,
    closed: bool,
}

impl ChatView {
    /// Mount the view: open the subscription, then run the initial bulk load.
    ///
    /// The subscription is opened first so no row committed during the load
    /// can fall between fetch and subscribe; the store's idempotent insert
    /// guard absorbs any overlap. Fails only if the subscription cannot be
    /// opened — without it the view would silently never update.
    pub async fn mount(backend: Arc<dyn ChatBackend>, options: ViewOptions) -> Result<Self> {
        let author = {
            let trimmed = options.author.trim();
            if trimmed.is_empty() {
                DEFAULT_AUTHOR.to_string()
            } else {
                trimmed.to_string()
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = Subscription::open(&backend, tx).await?;

        let mut view = Self {
            backend,
            store: MessageStore::new(options.sort_key),
            composer: Composer::new(),
            subscription: Some(subscription),
            events: rx,
            author,
            last_error: None,
            closed: false,
        };
        view.refresh().await;
        Ok(view)
    }

    /// Messages currently visible, in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    /// Current draft text.
    #[must_use]
    pub fn draft(&self) -> &str {
        self.composer.draft()
    }

    /// Local-only typing indicator.
    #[must_use]
    pub fn is_composing(&self) -> bool {
        self.composer.is_composing()
    }

    /// Sender label attached to outgoing messages.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Last remote failure, if any, for inline display.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn subscription_state(&self) -> SubscriptionState {
        self.subscription
            .as_ref()
            .map_or(SubscriptionState::Unsubscribed, Subscription::state)
    }

    /// Await the next feed event. Returns `None` once the view is closed or
    /// the channel has drained after the subscription ended.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        if self.closed {
            return None;
        }
        self.events.recv().await
    }

    /// Apply one feed event to the store. No-op on a closed view: events
    /// from in-flight continuations must never mutate a dismounted view.
    pub async fn apply(&mut self, event: FeedEvent) {
        if self.closed {
            return;
        }
        match event {
            FeedEvent::Change(ChangeEvent::Insert { new }) => self.store.apply_insert(new),
            FeedEvent::Change(ChangeEvent::Update { new }) => self.store.apply_update(new),
            FeedEvent::Change(ChangeEvent::Delete { old }) => self.store.apply_delete(old.id),
            FeedEvent::Resync => self.refresh().await,
            FeedEvent::Closed => {
                warn!(name: "view.feed.closed", "live updates stopped; remount to resume");
                self.last_error = Some("live updates stopped".to_string());
            }
        }
    }

    /// Set the draft text and raise the composing flag.
    pub fn update_draft(&mut self, text: impl Into<String>) {
        if self.closed {
            return;
        }
        self.composer.update_draft(text);
    }

    /// Send the current draft, if it trims to something non-empty.
    ///
    /// Returns `Ok(true)` when exactly one insert was issued and confirmed,
    /// `Ok(false)` when the draft was not sendable (no write issued, draft
    /// unchanged). On failure the draft is retained and the error recorded
    /// for inline display.
    pub async fn submit(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        let body = match self.composer.submission() {
            Some(body) => body.to_string(),
            None => return Ok(false),
        };

        let message = NewMessage {
            author: self.author.clone(),
            body,
        };
        match self.backend.insert(&message).await {
            Ok(()) => {
                // The list itself updates when the change event arrives.
                self.composer.clear();
                self.last_error = None;
                Ok(true)
            }
            Err(err) => {
                error!(name: "composer.submit.failed", error = %err, "send failed, draft retained");
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Delete one of the user's own messages.
    ///
    /// Gated on authorship: no write is issued unless the store holds `id`
    /// and its author matches this view's label. Returns whether a delete
    /// was issued; the visible removal lands via the change stream.
    pub async fn delete(&mut self, id: MessageId) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        let owned = self.store.get(id).is_some_and(|m| m.author == self.author);
        if !owned {
            debug!(name: "view.delete.refused", id, "not present or not own message");
            return Ok(false);
        }

        match self.backend.delete(id).await {
            Ok(()) => Ok(true),
            Err(err) => {
                error!(name: "view.delete.failed", id, error = %err, "delete failed");
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Re-run the bulk load. On failure: log, leave the list untouched,
    /// clear the loading flag, record the error. Never retried.
    pub async fn refresh(&mut self) {
        if self.closed {
            return;
        }
        self.store.begin_load();
        match self.backend.fetch_all(self.store.sort_key()).await {
            Ok(rows) => {
                self.store.replace_all(rows);
            }
            Err(err) => {
                error!(name: "store.load.failed", error = %err, "bulk fetch failed");
                self.store.end_load();
                self.last_error = Some(err.to_string());
            }
        }
    }

    /// Dismount: cancel the subscription and refuse all further mutation.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.close();
        }
        self.events.close();
        self.closed = true;
    }
}

impl Drop for ChatView {
    fn drop(&mut self) {
        self.close();
    }
}
