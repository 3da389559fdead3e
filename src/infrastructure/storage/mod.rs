pub mod connection_pool;
pub mod error;
pub mod memory_store;
pub mod sqlite_store;

pub use connection_pool::ConnectionPool;
pub use error::StorageError;
pub use memory_store::MemoryKeyValueStore;
pub use sqlite_store::SqliteKeyValueStore;
