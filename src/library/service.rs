use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::model::{QrRecord, RecordDraft, RecordId, UserProfile};
use super::store::{RecordStore, StoreError};
use crate::auth::AuthUser;

/// Library failures. `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("QR code not found")]
    NotFound(RecordId),
    #[error("{0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The confirmation was declined; the store was not touched.
    Cancelled,
    NotFound,
}

/// Create, read, update and delete of saved records, scoped to one user per call.
#[derive(Clone, Debug)]
pub struct LibraryService<S> {
    store: S,
}

impl<S: RecordStore> LibraryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The user's records, newest first.
    pub async fn list(&self, user: &AuthUser) -> Result<Vec<QrRecord>, LibraryError> {
        let mut records = self.store.list_records(user.id).await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    pub async fn get(&self, user: &AuthUser, id: RecordId) -> Result<QrRecord, LibraryError> {
        self.store
            .list_records(user.id)
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(LibraryError::NotFound(id))
    }

    /// Saves a new record, creating the user's profile first if there is none.
    pub async fn create(&self, user: &AuthUser, draft: RecordDraft) -> Result<QrRecord, LibraryError> {
        self.profile(user).await?;
        let now = Utc::now();
        let record = QrRecord {
            id: Uuid::new_v4(),
            user_id: user.id,
            title: draft.title,
            content: draft.content,
            style: draft.style,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_record(record.clone()).await?;
        info!(id = %record.id, kind = %record.kind(), "record created");
        Ok(record)
    }

    /// Overwrites title, content and style of an existing record.
    ///
    /// Nothing from the stored version survives except id, owner and creation time. There is no
    /// version check: the last write wins.
    pub async fn update(
        &self,
        user: &AuthUser,
        id: RecordId,
        draft: RecordDraft,
    ) -> Result<QrRecord, LibraryError> {
        let existing = self.get(user, id).await?;
        let record = QrRecord {
            title: draft.title,
            content: draft.content,
            style: draft.style,
            updated_at: Utc::now(),
            ..existing
        };
        self.store.update_record(record.clone()).await.map_err(|e| match e {
            StoreError::RecordNotFound(id) => LibraryError::NotFound(id),
            other => LibraryError::Store(other),
        })?;
        info!(id = %record.id, kind = %record.kind(), "record updated");
        Ok(record)
    }

    /// Deletes a record once `confirm` agrees.
    ///
    /// `confirm` sees the record about to go and is not asked at all when the id is unknown.
    pub async fn delete<F>(&self, user: &AuthUser, id: RecordId, confirm: F) -> Result<DeleteOutcome, LibraryError>
    where
        F: FnOnce(&QrRecord) -> bool,
    {
        let record = match self.get(user, id).await {
            Ok(record) => record,
            Err(LibraryError::NotFound(_)) => return Ok(DeleteOutcome::NotFound),
            Err(e) => return Err(e),
        };
        if !confirm(&record) {
            return Ok(DeleteOutcome::Cancelled);
        }
        if !self.store.delete_record(user.id, id).await? {
            warn!(%id, "record vanished before delete");
            return Ok(DeleteOutcome::NotFound);
        }
        info!(%id, "record deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// The user's profile, created with the default username on first access.
    pub async fn profile(&self, user: &AuthUser) -> Result<UserProfile, LibraryError> {
        if let Some(profile) = self.store.get_profile(user.id).await? {
            return Ok(profile);
        }
        let profile = UserProfile {
            id: user.id,
            username: Some(UserProfile::default_username(Some(&user.email))),
            avatar_url: None,
            created_at: Utc::now(),
        };
        self.store.insert_profile(profile.clone()).await?;
        info!(user = %user.id, "profile created");
        Ok(profile)
    }

    pub async fn rename(&self, user: &AuthUser, username: &str) -> Result<UserProfile, LibraryError> {
        let mut profile = self.profile(user).await?;
        profile.username = Some(username.to_string());
        self.store.update_profile(profile.clone()).await?;
        info!(user = %user.id, "profile renamed");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MemoryStore;
    use crate::payload::{QrContent, TextData, UrlData};
    use crate::style::{ErrorCorrection, QrStyle};

    fn user(email: &str) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: email.into(),
        }
    }

    fn draft(text: &str) -> RecordDraft {
        RecordDraft::new(QrContent::Text(TextData { value: text.into() }))
    }

    #[tokio::test]
    async fn test_create_lazily_creates_profile() {
        let service = LibraryService::new(MemoryStore::new());
        let jane = user("jane@example.com");
        assert!(service.store().get_profile(jane.id).await.unwrap().is_none());

        service.create(&jane, draft("a")).await.unwrap();
        let profile = service.store().get_profile(jane.id).await.unwrap().unwrap();
        assert_eq!(profile.username.as_deref(), Some("jane"));

        // A second save keeps the existing profile.
        service.rename(&jane, "Jane D").await.unwrap();
        service.create(&jane, draft("b")).await.unwrap();
        assert_eq!(service.profile(&jane).await.unwrap().username.as_deref(), Some("Jane D"));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let service = LibraryService::new(MemoryStore::new());
        let jane = user("jane@example.com");
        let first = service.create(&jane, draft("first")).await.unwrap();
        let second = service.create(&jane, draft("second")).await.unwrap();
        // Force distinct timestamps.
        let older = QrRecord {
            created_at: second.created_at - chrono::Duration::seconds(60),
            ..first.clone()
        };
        service.store().update_record(older).await.unwrap();

        let ids: Vec<_> = service.list(&jane).await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_update_overwrites_everything_sent() {
        let service = LibraryService::new(MemoryStore::new());
        let jane = user("jane@example.com");
        let styled = QrStyle {
            error_correction: ErrorCorrection::H,
            logo_url: Some("logo.png".into()),
            ..QrStyle::default()
        };
        let created = service
            .create(&jane, draft("old").with_title("Old").with_style(styled))
            .await
            .unwrap();

        let replacement = RecordDraft::new(QrContent::Url(UrlData { value: "example.com".into() }));
        let updated = service.update(&jane, created.id, replacement.clone()).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.title, None);
        assert_eq!(updated.content, replacement.content);
        assert_eq!(updated.style, QrStyle::default());
        assert_eq!(service.get(&jane, created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_of_foreign_record_is_not_found() {
        let service = LibraryService::new(MemoryStore::new());
        let jane = user("jane@example.com");
        let mallory = user("mallory@example.com");
        let rec = service.create(&jane, draft("mine")).await.unwrap();

        assert!(matches!(
            service.update(&mallory, rec.id, draft("yours")).await,
            Err(LibraryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_outcomes() {
        let service = LibraryService::new(MemoryStore::new());
        let jane = user("jane@example.com");
        let rec = service.create(&jane, draft("bye")).await.unwrap();

        let outcome = service.delete(&jane, rec.id, |_| false).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert_eq!(service.list(&jane).await.unwrap().len(), 1);

        let outcome = service.delete(&jane, rec.id, |r| r.id == rec.id).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(service.list(&jane).await.unwrap().is_empty());

        let outcome = service
            .delete(&jane, rec.id, |_| panic!("not asked for a missing record"))
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::NotFound);
    }
}
