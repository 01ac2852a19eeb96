//! Message List Store: the in-memory mirror of the `messages` table.
//!
//! The store is a cache of the remote table, maintained incrementally from
//! row-change events after an initial bulk load. It is owned exclusively by
//! the view and mutated only through the methods here; every mutation is a
//! pure function of the previous list state.

use tracing::debug;

use crate::message::{Message, MessageId, SortKey};

/// Ordered list of messages plus the load-in-progress flag.
#[derive(Debug)]
pub struct MessageStore {
    messages: Vec<Message>,
    sort_key: SortKey,
    loading: bool,
}

impl MessageStore {
    /// Create an empty store ordered by `sort_key`.
    #[must_use]
    pub fn new(sort_key: SortKey) -> Self {
        Self {
            messages: Vec::new(),
            sort_key,
            loading: false,
        }
    }

    /// Current list contents, in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a bulk load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The configured ordering column.
    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Mark a bulk load as started.
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    /// Mark a bulk load as finished without touching the list (failure path).
    pub fn end_load(&mut self) {
        self.loading = false;
    }

    /// Look up a message by identifier.
    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Replace the whole list with freshly fetched rows, sorted ascending by
    /// the configured key. Sorting happens here so the invariant holds no
    /// matter what order the remote read returned. Clears the loading flag.
    pub fn replace_all(&mut self, mut rows: Vec<Message>) {
        match self.sort_key {
            SortKey::Id => rows.sort_by_key(|m| m.id),
            SortKey::CreatedAt => rows.sort_by_key(|m| (m.created_at, m.id)),
        }
        debug!(name: "store.loaded", count = rows.len(), "message list replaced");
        self.messages = rows;
        self.loading = false;
    }

    /// Apply an insert event: append, unless the identifier is already
    /// present (duplicate deliveries are no-ops).
    pub fn apply_insert(&mut self, msg: Message) {
        if self.get(msg.id).is_some() {
            debug!(name: "store.insert.duplicate", id = msg.id, "ignoring duplicate insert event");
            return;
        }
        self.messages.push(msg);
    }

    /// Apply an update event: replace the matching entry in place. No-op if
    /// the identifier is not present.
    pub fn apply_update(&mut self, msg: Message) {
        if let Some(slot) = self.messages.iter_mut().find(|m| m.id == msg.id) {
            *slot = msg;
        }
    }

    /// Apply a delete event: remove the matching entry. No-op if absent.
    pub fn apply_delete(&mut self, id: MessageId) {
        if let Some(pos) = self.messages.iter().position(|m| m.id == id) {
            self.messages.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(id: MessageId, author: &str, body: &str, secs: i64) -> Message {
        Message {
            id,
            author: author.to_string(),
            body: body.to_string(),
            created_at: Utc.timestamp_opt(1_756_000_000 + secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_insert_then_delete_roundtrip() {
        let mut store = MessageStore::new(SortKey::Id);

        store.apply_insert(msg(1, "A", "hi", 0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].id, 1);

        store.apply_delete(1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_insert_is_idempotent() {
        let mut store = MessageStore::new(SortKey::Id);

        for _ in 0..3 {
            store.apply_insert(msg(1, "A", "hi", 0));
        }
        store.apply_insert(msg(2, "B", "yo", 1));

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_distinct_inserts_all_land() {
        let mut store = MessageStore::new(SortKey::Id);

        for id in 1..=5 {
            store.apply_insert(msg(id, "A", "hi", id));
        }
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_double_delete_is_noop() {
        let mut store = MessageStore::new(SortKey::Id);
        store.apply_insert(msg(1, "A", "hi", 0));

        store.apply_delete(1);
        store.apply_delete(1);

        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_all_sorts_by_id() {
        let mut store = MessageStore::new(SortKey::Id);

        store.replace_all(vec![
            msg(3, "C", "three", 2),
            msg(1, "A", "one", 0),
            msg(2, "B", "two", 1),
        ]);

        let ids: Vec<_> = store.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_replace_all_sorts_by_timestamp() {
        let mut store = MessageStore::new(SortKey::CreatedAt);

        store.replace_all(vec![
            msg(1, "A", "late", 30),
            msg(2, "B", "early", 10),
            msg(3, "C", "middle", 20),
        ]);

        let ids: Vec<_> = store.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_replace_all_clears_loading() {
        let mut store = MessageStore::new(SortKey::Id);
        store.begin_load();
        assert!(store.is_loading());

        store.replace_all(Vec::new());
        assert!(!store.is_loading());
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut store = MessageStore::new(SortKey::Id);
        store.apply_insert(msg(1, "A", "hi", 0));
        store.apply_insert(msg(2, "B", "yo", 1));

        store.apply_update(msg(1, "A", "edited", 0));

        assert_eq!(store.messages()[0].body, "edited");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_update_of_absent_id_is_noop() {
        let mut store = MessageStore::new(SortKey::Id);
        store.apply_update(msg(9, "A", "ghost", 0));
        assert!(store.is_empty());
    }
}
