use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    discussion_store::DiscussionStore,
    models::{DiscussionEntity, DiscussionListItemEntity, MessageEntity},
    storage::StorageResult,
};

/// Process-local store used when no database backend is configured and as a
/// stand-in for the real backend in tests. Never reports itself unavailable.
#[derive(Clone, Default)]
pub struct MemoryDiscussionStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    discussions: HashMap<Uuid, DiscussionEntity>,
    messages: HashMap<Uuid, HashMap<Uuid, MessageEntity>>,
}

impl MemoryDiscussionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiscussionStore for MemoryDiscussionStore {
    fn save_discussion(
        &self,
        discussion: DiscussionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            state.discussions.insert(discussion.id, discussion);
            Ok(())
        })
    }

    fn find_discussion(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<DiscussionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let state = inner.read().await;
            Ok(state.discussions.get(&id).cloned())
        })
    }

    fn list_discussions(&self) -> BoxFuture<'static, StorageResult<Vec<DiscussionListItemEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let state = inner.read().await;
            let mut items: Vec<DiscussionListItemEntity> = state
                .discussions
                .values()
                .cloned()
                .map(Into::into)
                .collect();
            // Newest first, matching what the lobby shows.
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(items)
        })
    }

    fn save_message(&self, message: MessageEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.write().await;
            state
                .messages
                .entry(message.discussion_id)
                .or_default()
                .insert(message.id, message);
            Ok(())
        })
    }

    fn list_messages(
        &self,
        discussion_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MessageEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let state = inner.read().await;
            let mut messages: Vec<MessageEntity> = state
                .messages
                .get(&discussion_id)
                .map(|by_id| by_id.values().cloned().collect())
                .unwrap_or_default();
            messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
            Ok(messages)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
