//! Message model and the change-event envelopes that flow from the backend.
//!
//! [`ChangeEvent`] mirrors the wire payload emitted by the backend's row
//! trigger: an op tag plus the new and/or old row image. [`FeedEvent`] is the
//! in-process wrapper the subscription hands to the view, which also covers
//! the two non-row outcomes (undecodable payload, stream closure).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned message identifier (`BIGSERIAL`).
pub type MessageId = i64;

/// One chat entry, as stored in the `messages` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique, monotonic by insertion order.
    pub id: MessageId,
    /// Sender label (free text).
    pub author: String,
    /// Message text.
    pub body: String,
    /// Server-assigned creation time, used for ordering and display only.
    pub created_at: DateTime<Utc>,
}

/// Insert payload. The server assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub author: String,
    pub body: String,
}

/// Column the message list is ordered by (always ascending).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Insertion order.
    #[default]
    Id,
    /// Timestamp order.
    CreatedAt,
}

impl SortKey {
    /// Parse a configured sort key; anything unrecognized falls back to id.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "created_at" => Self::CreatedAt,
            _ => Self::Id,
        }
    }
}

/// A row-level change delivered by the notification channel.
///
/// Tag values match `TG_OP` in the notify trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op")]
pub enum ChangeEvent {
    /// A row was inserted; carries the new row image.
    #[serde(rename = "INSERT")]
    Insert { new: Message },

    /// A row was updated in place; carries the new row image.
    #[serde(rename = "UPDATE")]
    Update { new: Message },

    /// A row was deleted; carries the old row image.
    #[serde(rename = "DELETE")]
    Delete { old: Message },
}

/// What the subscription hands to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A decoded row change to apply incrementally.
    Change(ChangeEvent),

    /// A notification arrived but its payload could not be decoded; the
    /// store can only recover with a full reload.
    Resync,

    /// The change stream ended or failed. No further updates will arrive
    /// for the lifetime of this view.
    Closed,
}
