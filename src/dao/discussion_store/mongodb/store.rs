use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoDiscussionDocument, MongoMessageDocument, doc_id, uuid_as_binary},
};
use crate::dao::{
    discussion_store::DiscussionStore,
    models::{DiscussionEntity, DiscussionListItemEntity, MessageEntity},
    storage::StorageResult,
};

const DISCUSSION_COLLECTION_NAME: &str = "discussions";
const MESSAGE_COLLECTION_NAME: &str = "messages";

/// MongoDB-backed implementation of [`DiscussionStore`].
#[derive(Clone)]
pub struct MongoDiscussionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoDiscussionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // Listings sort on creation time, newest first.
        let discussions =
            database.collection::<mongodb::bson::Document>(DISCUSSION_COLLECTION_NAME);
        let created_index = mongodb::IndexModel::builder()
            .keys(doc! {"created_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("discussion_created_at_idx".to_owned()))
                    .build(),
            )
            .build();

        discussions
            .create_index(created_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: DISCUSSION_COLLECTION_NAME,
                index: "created_at",
                source,
            })?;

        // Message history is always fetched per discussion in send order.
        let messages = database.collection::<MongoMessageDocument>(MESSAGE_COLLECTION_NAME);
        let message_index = mongodb::IndexModel::builder()
            .keys(doc! {"discussion_id": 1, "sent_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("message_discussion_idx".to_owned()))
                    .build(),
            )
            .build();

        messages
            .create_index(message_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MESSAGE_COLLECTION_NAME,
                index: "discussion_id,sent_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection(&self) -> Collection<MongoDiscussionDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoDiscussionDocument>(DISCUSSION_COLLECTION_NAME)
    }

    async fn message_collection(&self) -> Collection<MongoMessageDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoMessageDocument>(MESSAGE_COLLECTION_NAME)
    }

    async fn save_discussion(&self, discussion: DiscussionEntity) -> MongoResult<()> {
        let id = discussion.id;
        let document: MongoDiscussionDocument = discussion.into();
        let collection = self.collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveDiscussion { id, source })?;

        Ok(())
    }

    async fn find_discussion(&self, id: Uuid) -> MongoResult<Option<DiscussionEntity>> {
        let collection = self.collection().await;

        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadDiscussion { id, source })?;

        Ok(document.map(Into::into))
    }

    async fn list_discussions(&self) -> MongoResult<Vec<DiscussionListItemEntity>> {
        let collection = self.collection().await;

        let documents: Vec<MongoDiscussionDocument> = collection
            .find(doc! {})
            .sort(doc! {"created_at": -1})
            .await
            .map_err(|source| MongoDaoError::ListDiscussions { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListDiscussions { source })?;

        Ok(documents
            .into_iter()
            .map(|document| {
                let entity: DiscussionEntity = document.into();
                entity.into()
            })
            .collect())
    }

    async fn save_message(&self, message: MessageEntity) -> MongoResult<()> {
        let id = message.id;
        let document: MongoMessageDocument = message.into();
        let collection = self.message_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveMessage { id, source })?;

        Ok(())
    }

    async fn list_messages(&self, discussion_id: Uuid) -> MongoResult<Vec<MessageEntity>> {
        let collection = self.message_collection().await;

        let documents: Vec<MongoMessageDocument> = collection
            .find(doc! { "discussion_id": uuid_as_binary(discussion_id) })
            .sort(doc! {"sent_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListMessages {
                discussion_id,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListMessages {
                discussion_id,
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl DiscussionStore for MongoDiscussionStore {
    fn save_discussion(
        &self,
        discussion: DiscussionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_discussion(discussion).await.map_err(Into::into) })
    }

    fn find_discussion(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<DiscussionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_discussion(id).await.map_err(Into::into) })
    }

    fn list_discussions(&self) -> BoxFuture<'static, StorageResult<Vec<DiscussionListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_discussions().await.map_err(Into::into) })
    }

    fn save_message(&self, message: MessageEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_message(message).await.map_err(Into::into) })
    }

    fn list_messages(
        &self,
        discussion_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MessageEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_messages(discussion_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
