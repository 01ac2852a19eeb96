//! roomsync: a single-room chat client over a relational backend.
//!
//! The client owns an in-memory, ordered list of messages and keeps it
//! synchronized with a remote `messages` table via an initial bulk fetch
//! plus a long-lived change-notification subscription (Postgres
//! `LISTEN`/`NOTIFY` fed by a row trigger). Sends are eventually
//! consistent: a successful insert reaches the visible list through the
//! change stream, not through the insert's return value.
//!
//! # Modules
//!
//! - [`message`]: the message model and change-event envelopes
//! - [`store`]: the in-memory message list and its apply operations
//! - [`composer`]: draft text and the submit gate
//! - [`backend`]: the remote data source contract and its Postgres impl
//! - [`subscription`]: the change-stream lifecycle
//! - [`view`]: the mounted chat view tying the above together

pub mod backend;
pub mod composer;
pub mod config;
pub mod error;
pub mod message;
pub mod store;
pub mod subscription;
pub mod view;

pub use backend::{ChatBackend, postgres::PostgresBackend};
pub use composer::Composer;
pub use error::ChatError;
pub use message::{ChangeEvent, FeedEvent, Message, MessageId, NewMessage, SortKey};
pub use store::MessageStore;
pub use subscription::{Subscription, SubscriptionState};
pub use view::{ChatView, ViewOptions};
