//! In-memory projection of tracked announcements and their responses.
//!
//! The three tables (announcement -> thread, announcement -> responders,
//! (announcement, user) -> companion record) live behind one lock so no reader can
//! observe them disagreeing. Long operations on a single (announcement, user) key are
//! serialized through [`KeyLocks`] instead, which never blocks unrelated keys.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serenity::model::id::{MessageId, UserId};
use tokio::sync::{OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use super::model::{Announcement, ResponseStatus};

pub type ResponseKey = (MessageId, UserId);

/// The cached thread message that represents one active response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanionRecord {
    pub message_id: MessageId,
    pub status: ResponseStatus,
}

/// Plain tables. Built off to the side by the rebuilder, then swapped in whole.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StoreTables {
    announcements: HashMap<MessageId, Announcement>,
    responders: HashMap<MessageId, HashSet<UserId>>,
    companions: HashMap<ResponseKey, CompanionRecord>,
}

impl StoreTables {
    pub fn insert_announcement(&mut self, announcement: Announcement) {
        let key = announcement.message_id;
        self.remove_announcement(key);
        self.announcements.insert(key, announcement);
        self.responders.insert(key, HashSet::new());
    }

    /// Returns false (and changes nothing) if the announcement is not tracked.
    pub fn insert_response(
        &mut self,
        message_id: MessageId,
        user_id: UserId,
        record: CompanionRecord,
    ) -> bool {
        let Some(users) = self.responders.get_mut(&message_id) else {
            return false;
        };
        users.insert(user_id);
        self.companions.insert((message_id, user_id), record);
        true
    }

    pub fn remove_response(
        &mut self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Option<CompanionRecord> {
        if let Some(users) = self.responders.get_mut(&message_id) {
            users.remove(&user_id);
        }
        self.companions.remove(&(message_id, user_id))
    }

    pub fn remove_announcement(&mut self, message_id: MessageId) -> Option<Announcement> {
        self.responders.remove(&message_id);
        self.companions.retain(|(msg, _), _| *msg != message_id);
        self.announcements.remove(&message_id)
    }

    pub fn announcement(&self, message_id: MessageId) -> Option<&Announcement> {
        self.announcements.get(&message_id)
    }

    pub fn responders(&self, message_id: MessageId) -> Option<&HashSet<UserId>> {
        self.responders.get(&message_id)
    }

    pub fn companion(&self, message_id: MessageId, user_id: UserId) -> Option<CompanionRecord> {
        self.companions.get(&(message_id, user_id)).copied()
    }

    pub fn announcements(&self) -> impl Iterator<Item = &Announcement> {
        self.announcements.values()
    }

    pub fn len(&self) -> usize {
        self.announcements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.announcements.is_empty()
    }

    pub fn response_count(&self) -> usize {
        self.companions.len()
    }

    /// Every responder has a companion record and vice versa, and nothing refers to an
    /// untracked announcement.
    pub fn is_consistent(&self) -> bool {
        let keys_match = self
            .announcements
            .keys()
            .all(|k| self.responders.contains_key(k))
            && self.responders.len() == self.announcements.len();
        let responders_backed = self.responders.iter().all(|(msg, users)| {
            users
                .iter()
                .all(|user| self.companions.contains_key(&(*msg, *user)))
        });
        let companions_backed = self.companions.keys().all(|(msg, user)| {
            self.responders
                .get(msg)
                .is_some_and(|users| users.contains(user))
        });
        keys_match && responders_backed && companions_backed
    }
}

/// Lazily created per-key async mutexes, plus one gate per announcement that status
/// updates share and closing takes exclusively. A key entry is pruned once nobody holds
/// or waits on it, so two waiters never end up on different locks.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<ResponseKey, Arc<tokio::sync::Mutex<()>>>>,
    gates: Mutex<HashMap<MessageId, Arc<RwLock<()>>>>,
}

impl KeyLocks {
    pub async fn acquire(&self, key: ResponseKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drops the guard and forgets the key if no other task holds a handle to its lock.
    pub fn release(&self, key: ResponseKey, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(&key)
            && Arc::strong_count(lock) == 1
        {
            locks.remove(&key);
        }
    }

    fn gate(&self, message_id: MessageId) -> Arc<RwLock<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        gates.entry(message_id).or_default().clone()
    }

    /// Shared access to an announcement; many users update it at once.
    pub async fn enter(&self, message_id: MessageId) -> OwnedRwLockReadGuard<()> {
        self.gate(message_id).read_owned().await
    }

    /// Exclusive access; waits for in-flight updates and holds new ones off.
    pub async fn enter_exclusive(&self, message_id: MessageId) -> OwnedRwLockWriteGuard<()> {
        self.gate(message_id).write_owned().await
    }

    pub fn forget_announcement(&self, message_id: MessageId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|(msg, _), _| *msg != message_id);
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        gates.remove(&message_id);
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared, concurrency-safe store. Cheap to share as `Arc<ZkouskaStore>`.
#[derive(Debug, Default)]
pub struct ZkouskaStore {
    tables: RwLock<StoreTables>,
    key_locks: KeyLocks,
    ready: AtomicBool,
}

impl ZkouskaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// False until the startup rebuild has finished (successfully or not).
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub async fn lock_key(&self, message_id: MessageId, user_id: UserId) -> OwnedMutexGuard<()> {
        self.key_locks.acquire((message_id, user_id)).await
    }

    pub fn release_key(
        &self,
        message_id: MessageId,
        user_id: UserId,
        guard: OwnedMutexGuard<()>,
    ) {
        self.key_locks.release((message_id, user_id), guard);
    }

    /// Held by status updates for their whole read-call-commit sequence.
    pub async fn enter_announcement(&self, message_id: MessageId) -> OwnedRwLockReadGuard<()> {
        self.key_locks.enter(message_id).await
    }

    /// Held by closing so no status update runs against an archived thread.
    pub async fn lock_announcement(&self, message_id: MessageId) -> OwnedRwLockWriteGuard<()> {
        self.key_locks.enter_exclusive(message_id).await
    }

    /// Number of (announcement, user) locks currently kept.
    pub fn key_lock_count(&self) -> usize {
        self.key_locks.len()
    }

    pub async fn announcement(&self, message_id: MessageId) -> Option<Announcement> {
        self.tables.read().await.announcement(message_id).cloned()
    }

    pub async fn responders(&self, message_id: MessageId) -> Option<HashSet<UserId>> {
        self.tables.read().await.responders(message_id).cloned()
    }

    pub async fn companion(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Option<CompanionRecord> {
        self.tables.read().await.companion(message_id, user_id)
    }

    pub async fn register(&self, announcement: Announcement) {
        self.tables.write().await.insert_announcement(announcement);
    }

    /// Adds the responder and caches the companion message in one step.
    pub async fn record_response(
        &self,
        message_id: MessageId,
        user_id: UserId,
        record: CompanionRecord,
    ) -> bool {
        self.tables
            .write()
            .await
            .insert_response(message_id, user_id, record)
    }

    pub async fn clear_response(
        &self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Option<CompanionRecord> {
        self.tables.write().await.remove_response(message_id, user_id)
    }

    /// Drops the announcement and every response attached to it.
    pub async fn close(&self, message_id: MessageId) -> Option<Announcement> {
        let removed = self.tables.write().await.remove_announcement(message_id);
        self.key_locks.forget_announcement(message_id);
        removed
    }

    /// Swaps in fully built tables as a unit.
    pub async fn replace_all(&self, tables: StoreTables) {
        *self.tables.write().await = tables;
    }

    pub async fn snapshot(&self) -> StoreTables {
        self.tables.read().await.clone()
    }
}
