//! Remote data source contract.
//!
//! The chat page consumes the backend as an opaque service: bulk read,
//! row insert, row delete, and a long-lived change-notification stream.
//! [`postgres::PostgresBackend`] is the production implementation; tests use
//! in-memory fakes.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::message::{FeedEvent, Message, MessageId, NewMessage, SortKey};

pub mod postgres;

/// Long-lived stream of feed events, delivered until dropped.
pub type ChangeStream = Pin<Box<dyn Stream<Item = FeedEvent> + Send>>;

/// The remote message table, as seen by the client.
///
/// One configured backend handle exists per process lifetime, shared as
/// `Arc<dyn ChatBackend>` by whatever owns the subscription.
#[async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    /// Select all rows, ordered ascending by the chosen column.
    async fn fetch_all(&self, sort: SortKey) -> Result<Vec<Message>>;

    /// Insert one row. The server assigns identifier and timestamp; the
    /// created row is not returned — it reaches the client through the
    /// change stream.
    async fn insert(&self, message: &NewMessage) -> Result<()>;

    /// Delete one row by identifier.
    async fn delete(&self, id: MessageId) -> Result<()>;

    /// Open the change-notification stream for the message table.
    ///
    /// The stream yields [`FeedEvent::Change`] for each decodable row
    /// change, [`FeedEvent::Resync`] when a payload cannot be decoded, and
    /// ends after [`FeedEvent::Closed`] if the underlying channel breaks.
    async fn subscribe(&self) -> Result<ChangeStream>;
}
