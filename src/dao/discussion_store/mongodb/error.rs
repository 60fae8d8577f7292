use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for MongoDB backend operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failure cases of the MongoDB backend, one variant per operation so log
/// lines identify what was being attempted.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection URI could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// The offending URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The client could not be constructed from its options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The initial ping never succeeded within the retry budget.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Number of attempts made.
        attempts: u32,
        /// Driver error from the last attempt.
        #[source]
        source: MongoError,
    },
    /// A periodic health ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Index creation failed at startup.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Index key description.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Upserting a discussion document failed.
    #[error("failed to save discussion `{id}`")]
    SaveDiscussion {
        /// Discussion primary key.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Loading a discussion document failed.
    #[error("failed to load discussion `{id}`")]
    LoadDiscussion {
        /// Discussion primary key.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Listing discussion documents failed.
    #[error("failed to list discussions")]
    ListDiscussions {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Upserting a message document failed.
    #[error("failed to save message `{id}`")]
    SaveMessage {
        /// Message primary key.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Listing the messages of a discussion failed.
    #[error("failed to list messages of discussion `{discussion_id}`")]
    ListMessages {
        /// Discussion the messages belong to.
        discussion_id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
