pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::UpsertSink;
