use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::model::{QrRecord, RecordId, UserId, UserProfile};
use super::store::{RecordStore, StoreError};

/// In-memory RecordStore for tests and throwaway sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    profiles: Arc<Mutex<HashMap<UserId, UserProfile>>>,
    records: Arc<Mutex<HashMap<RecordId, QrRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn profiles(&self) -> MutexGuard<'_, HashMap<UserId, UserProfile>> {
        self.profiles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn records(&self) -> MutexGuard<'_, HashMap<RecordId, QrRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryStore {
    async fn get_profile(&self, user: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles().get(&user).cloned())
    }

    async fn insert_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.profiles().insert(profile.id, profile);
        Ok(())
    }

    async fn update_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        match self.profiles().get_mut(&profile.id) {
            Some(slot) => {
                *slot = profile;
                Ok(())
            }
            None => Err(StoreError::ProfileNotFound(profile.id)),
        }
    }

    async fn list_records(&self, user: UserId) -> Result<Vec<QrRecord>, StoreError> {
        Ok(self
            .records()
            .values()
            .filter(|r| r.user_id == user)
            .cloned()
            .collect())
    }

    async fn insert_record(&self, record: QrRecord) -> Result<(), StoreError> {
        self.records().insert(record.id, record);
        Ok(())
    }

    async fn update_record(&self, record: QrRecord) -> Result<(), StoreError> {
        match self.records().get_mut(&record.id) {
            Some(slot) if slot.user_id == record.user_id => {
                *slot = record;
                Ok(())
            }
            _ => Err(StoreError::RecordNotFound(record.id)),
        }
    }

    async fn delete_record(&self, user: UserId, id: RecordId) -> Result<bool, StoreError> {
        let mut records = self.records();
        if records.get(&id).is_some_and(|r| r.user_id == user) {
            records.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}
