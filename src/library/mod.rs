//! The personal QR library: saved records, profiles and their persistence.

mod file_store;
mod memory;
mod model;
mod service;
mod store;

pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use model::{QrRecord, RecordDraft, RecordId, RecordRow, UserId, UserProfile};
pub use service::{DeleteOutcome, LibraryError, LibraryService};
pub use store::{RecordStore, StoreError};
