pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{DiscussionEntity, DiscussionListItemEntity, MessageEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for discussions and their messages.
///
/// Writes are whole-document upserts: the in-memory room is authoritative and
/// the backend mirrors its latest snapshot.
pub trait DiscussionStore: Send + Sync {
    fn save_discussion(&self, discussion: DiscussionEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    fn find_discussion(&self, id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<DiscussionEntity>>>;
    fn list_discussions(&self) -> BoxFuture<'static, StorageResult<Vec<DiscussionListItemEntity>>>;
    fn save_message(&self, message: MessageEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn list_messages(
        &self,
        discussion_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MessageEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
