//! Profile entries and the session that owns them

pub mod entry;
pub mod session;
pub mod store;

pub use entry::{Entry, EntryKind};
pub use session::{AuditRecord, ProfileSession, DEFAULT_HISTORY_LIMIT};
pub use store::{load_entries_from_file, write_entries_to_file};
