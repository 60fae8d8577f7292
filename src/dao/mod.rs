/// Discussion state storage and retrieval operations.
pub mod discussion_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
