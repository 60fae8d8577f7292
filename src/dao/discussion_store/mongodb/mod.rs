mod connection;
mod error;
mod models;

/// Connection settings for the backend.
pub mod config;
/// MongoDB-backed [`DiscussionStore`](crate::dao::discussion_store::DiscussionStore).
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoDiscussionStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
