//! # Filesystem-backed record store
//!
//! [`FileStore`] keeps one JSON document per user, so a user's library survives restarts of the
//! command-line front end.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── profiles/
//! │   └── <user_id>.json     # UserProfile
//! └── records/
//!     ├── <user_id>.json     # array of record rows
//!     └── <user_id>.lock     # held while the array is rewritten
//! ```
//!
//! Writes go to a sibling temp file first and are renamed into place, so a crash mid-write leaves
//! the previous document intact. Record mutations hold an exclusive lock on the user's `.lock`
//! file for the whole read-modify-write, so concurrent processes saving different records never
//! drop each other's rows.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::model::{QrRecord, RecordId, UserId, UserProfile};
use super::store::{RecordStore, StoreError};

#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn profile_path(&self, user: UserId) -> PathBuf {
        self.base.join("profiles").join(format!("{user}.json"))
    }

    fn records_path(&self, user: UserId) -> PathBuf {
        self.base.join("records").join(format!("{user}.json"))
    }

    /// Blocks until this process holds the user's record lock. Dropping the file releases it.
    fn lock_records(&self, user: UserId) -> Result<File, StoreError> {
        let path = self.base.join("records").join(format!("{user}.lock"));
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(self.base.join("records")).map_err(io_err)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(io_err)?;
        file.lock_exclusive().map_err(io_err)?;
        Ok(file)
    }

    fn load_records(&self, user: UserId) -> Result<Vec<QrRecord>, StoreError> {
        Ok(read_json(&self.records_path(user))?.unwrap_or_default())
    }

    fn save_records(&self, user: UserId, records: &[QrRecord]) -> Result<(), StoreError> {
        write_json(&self.records_path(user), &records)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    debug!(path = %path.display(), "wrote store document");
    Ok(())
}

impl RecordStore for FileStore {
    async fn get_profile(&self, user: UserId) -> Result<Option<UserProfile>, StoreError> {
        read_json(&self.profile_path(user))
    }

    async fn insert_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        write_json(&self.profile_path(profile.id), &profile)
    }

    async fn update_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        let path = self.profile_path(profile.id);
        if read_json::<UserProfile>(&path)?.is_none() {
            return Err(StoreError::ProfileNotFound(profile.id));
        }
        write_json(&path, &profile)
    }

    async fn list_records(&self, user: UserId) -> Result<Vec<QrRecord>, StoreError> {
        self.load_records(user)
    }

    async fn insert_record(&self, record: QrRecord) -> Result<(), StoreError> {
        let user = record.user_id;
        let _lock = self.lock_records(user)?;
        let mut records = self.load_records(user)?;
        records.push(record);
        self.save_records(user, &records)
    }

    async fn update_record(&self, record: QrRecord) -> Result<(), StoreError> {
        let user = record.user_id;
        let _lock = self.lock_records(user)?;
        let mut records = self.load_records(user)?;
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(StoreError::RecordNotFound(record.id))?;
        *slot = record;
        self.save_records(user, &records)
    }

    async fn delete_record(&self, user: UserId, id: RecordId) -> Result<bool, StoreError> {
        let _lock = self.lock_records(user)?;
        let mut records = self.load_records(user)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save_records(user, &records)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{QrContent, UrlData};
    use crate::style::QrStyle;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(user: UserId, url: &str) -> QrRecord {
        let now = Utc::now();
        QrRecord {
            id: Uuid::new_v4(),
            user_id: user,
            title: Some("Site".into()),
            content: QrContent::Url(UrlData { value: url.into() }),
            style: QrStyle::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let user = Uuid::new_v4();
        let rec = record(user, "example.com");

        FileStore::new(dir.path()).insert_record(rec.clone()).await.unwrap();

        // Re-open from the same directory
        let reopened = FileStore::new(dir.path());
        assert_eq!(reopened.list_records(user).await.unwrap(), vec![rec.clone()]);

        let mut changed = rec.clone();
        changed.content = QrContent::Url(UrlData { value: "https://other.example".into() });
        reopened.update_record(changed.clone()).await.unwrap();
        assert_eq!(reopened.list_records(user).await.unwrap(), vec![changed]);

        assert!(reopened.delete_record(user, rec.id).await.unwrap());
        assert!(!reopened.delete_record(user, rec.id).await.unwrap());
        assert!(reopened.list_records(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let user = Uuid::new_v4();

        assert!(store.get_profile(user).await.unwrap().is_none());
        assert!(store.list_records(user).await.unwrap().is_empty());
        assert!(matches!(
            store.update_record(record(user, "x")).await,
            Err(StoreError::RecordNotFound(_))
        ));
        let profile = UserProfile {
            id: user,
            username: None,
            avatar_url: None,
            created_at: Utc::now(),
        };
        assert!(matches!(
            store.update_profile(profile).await,
            Err(StoreError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_inserts_keep_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let user = Uuid::new_v4();

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let base = dir.path().to_path_buf();
                std::thread::spawn(move || {
                    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                    let store = FileStore::new(base);
                    for j in 0..5 {
                        let rec = record(user, &format!("site-{i}-{j}.example"));
                        rt.block_on(store.insert_record(rec)).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let records = rt.block_on(FileStore::new(dir.path()).list_records(user)).unwrap();
        assert_eq!(records.len(), 40);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let user = Uuid::new_v4();
        let path = dir.path().join("records").join(format!("{user}.json"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            store.list_records(user).await,
            Err(StoreError::Corrupt { .. })
        ));
    }
}
