use std::path::PathBuf;

use thiserror::Error;

use super::model::{QrRecord, RecordId, UserId, UserProfile};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    RecordNotFound(RecordId),
    #[error("profile {0} not found")]
    ProfileNotFound(UserId),
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt data in '{path}': {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistence backend for profiles and records.
///
/// Every call is scoped to one user. A record is only visible through its owner's id.
pub trait RecordStore {
    fn get_profile(
        &self,
        user: UserId,
    ) -> impl std::future::Future<Output = Result<Option<UserProfile>, StoreError>>;
    fn insert_profile(
        &self,
        profile: UserProfile,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;
    /// Fails with [`StoreError::ProfileNotFound`] when there is nothing to update.
    fn update_profile(
        &self,
        profile: UserProfile,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;

    /// All records owned by `user`, in no particular order.
    fn list_records(
        &self,
        user: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<QrRecord>, StoreError>>;
    fn insert_record(
        &self,
        record: QrRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;
    /// Replaces the stored record with the same id and owner.
    ///
    /// Fails with [`StoreError::RecordNotFound`] when there is none.
    fn update_record(
        &self,
        record: QrRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>>;
    /// Returns whether a record was removed.
    fn delete_record(
        &self,
        user: UserId,
        id: RecordId,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>>;
}
