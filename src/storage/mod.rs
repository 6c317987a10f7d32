//! Local persistence: transcript reading, the session record cache, and the
//! breadcrumb note document.
//!
//! Most users should interact through [`Retrace`](crate::Retrace) instead.

pub mod file_lock;
pub mod note_store;
pub mod record_store;
pub mod transcript;

pub use file_lock::FileLock;
pub use note_store::{NoteDocument, NoteStore};
pub use record_store::SessionRecordStore;
