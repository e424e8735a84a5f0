use std::{sync::Arc, time::Duration};

use async_stream::stream;
use futures::{TryStreamExt, future::BoxFuture, stream::BoxStream};
use mongodb::{
    Collection, Database,
    bson::{DateTime, Document, doc, serialize_to_bson as to_bson},
    options::IndexOptions,
};
use tokio::{sync::RwLock, time::sleep};
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoCycleDocument, MongoLibraryMovieDocument, MongoSharedMovieDocument},
};
use crate::dao::{
    models::{CycleEntity, LibraryMovieEntity, SharedMovieEntity},
    night_store::{CycleUpdate, NightStore},
    storage::{StorageError, StorageResult},
};

const CYCLE_COLLECTION_NAME: &str = "daily_cycles";
const LIBRARY_COLLECTION_NAME: &str = "library_movies";
const SHARED_COLLECTION_NAME: &str = "shared_movies";

/// How often the watch stream re-reads a cycle document. The store has
/// no push channel, so subscriptions are polled snapshots deduplicated
/// against the last delivered state.
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

#[derive(Clone)]
pub struct MongoNightStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.database.write().await;
        *guard = database;
        Ok(())
    }
}

impl MongoNightStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                database: RwLock::new(database),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.library_collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"owner": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("library_owner_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: LIBRARY_COLLECTION_NAME,
                index: "owner",
                source,
            })?;

        Ok(())
    }

    async fn cycle_collection(&self) -> Collection<MongoCycleDocument> {
        let guard = self.inner.database.read().await;
        guard.collection::<MongoCycleDocument>(CYCLE_COLLECTION_NAME)
    }

    async fn library_collection(&self) -> Collection<MongoLibraryMovieDocument> {
        let guard = self.inner.database.read().await;
        guard.collection::<MongoLibraryMovieDocument>(LIBRARY_COLLECTION_NAME)
    }

    async fn shared_collection(&self) -> Collection<MongoSharedMovieDocument> {
        let guard = self.inner.database.read().await;
        guard.collection::<MongoSharedMovieDocument>(SHARED_COLLECTION_NAME)
    }

    async fn find_cycle_inner(&self, id: &str) -> MongoResult<Option<CycleEntity>> {
        let collection = self.cycle_collection().await;
        let document = collection
            .find_one(doc! {"_id": id})
            .await
            .map_err(|source| MongoDaoError::LoadCycle {
                id: id.to_owned(),
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn create_cycle_inner(&self, cycle: CycleEntity) -> MongoResult<CycleEntity> {
        if let Some(existing) = self.find_cycle_inner(&cycle.id).await? {
            return Ok(existing);
        }

        let id = cycle.id.clone();
        let document: MongoCycleDocument = cycle.clone().into();
        let collection = self.cycle_collection().await;
        match collection.insert_one(&document).await {
            Ok(_) => Ok(cycle),
            // A racing participant may have inserted the same date key
            // between the lookup and the insert; their version wins.
            Err(source) => match self.find_cycle_inner(&id).await? {
                Some(existing) => Ok(existing),
                None => Err(MongoDaoError::SaveCycle { id, source }),
            },
        }
    }

    async fn apply_cycle_update_inner(
        &self,
        id: &str,
        update: CycleUpdate,
    ) -> StorageResult<bool> {
        let (filter, update_doc, conditional) = build_cycle_update(id, update)?;
        let collection = self.cycle_collection().await;
        let result = collection
            .update_one(filter, update_doc)
            .await
            .map_err(|source| MongoDaoError::UpdateCycle {
                id: id.to_owned(),
                source,
            })?;

        if conditional {
            Ok(result.matched_count > 0)
        } else if result.matched_count == 0 {
            Err(StorageError::missing(id))
        } else {
            Ok(true)
        }
    }
}

/// Translate a typed partial update into a MongoDB filter and `$set`
/// document. Per-user writes use dotted field paths so they only touch
/// the caller's own map entry; status advances add the expected source
/// status to the filter, making the write conditional.
fn build_cycle_update(
    id: &str,
    update: CycleUpdate,
) -> MongoResult<(Document, Document, bool)> {
    let mut filter = doc! {"_id": id};

    let (set, conditional) = match update {
        CycleUpdate::SetDecision {
            user_id,
            interested,
        } => (doc! { format!("decisions.{user_id}"): interested }, false),
        CycleUpdate::SetNominations { user_id, movie_ids } => {
            let value = to_bson(&movie_ids).map_err(|source| MongoDaoError::Encode {
                context: "nominations",
                source,
            })?;
            (doc! { format!("nominations.{user_id}"): value }, false)
        }
        CycleUpdate::SetVote { user_id, vote } => {
            let value = to_bson(&vote).map_err(|source| MongoDaoError::Encode {
                context: "vote",
                source,
            })?;
            (doc! { format!("votes.{user_id}"): value }, false)
        }
        CycleUpdate::SetScheduleSettings { settings } => {
            let value = to_bson(&settings).map_err(|source| MongoDaoError::Encode {
                context: "schedule_settings",
                source,
            })?;
            (doc! { "schedule_settings": value }, false)
        }
        CycleUpdate::AdvanceStatus {
            from,
            to,
            winner,
            reveal_ends_at,
        } => {
            let from = to_bson(&from).map_err(|source| MongoDaoError::Encode {
                context: "status",
                source,
            })?;
            let mut set = doc! {
                "current_status": to_bson(&to).map_err(|source| MongoDaoError::Encode {
                    context: "status",
                    source,
                })?,
            };
            if let Some(winner) = winner {
                let value = to_bson(&winner).map_err(|source| MongoDaoError::Encode {
                    context: "winning_movie",
                    source,
                })?;
                set.insert("winning_movie", value);
            }
            if let Some(deadline) = reveal_ends_at {
                set.insert("reveal_ends_at", DateTime::from_system_time(deadline));
            }
            filter.insert("current_status", from);
            (set, true)
        }
    };

    Ok((filter, doc! {"$set": set}, conditional))
}

impl NightStore for MongoNightStore {
    fn find_cycle(&self, id: &str) -> BoxFuture<'static, StorageResult<Option<CycleEntity>>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { store.find_cycle_inner(&id).await.map_err(Into::into) })
    }

    fn create_cycle(&self, cycle: CycleEntity) -> BoxFuture<'static, StorageResult<CycleEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_cycle_inner(cycle).await.map_err(Into::into) })
    }

    fn apply_cycle_update(
        &self,
        id: &str,
        update: CycleUpdate,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { store.apply_cycle_update_inner(&id, update).await })
    }

    fn delete_cycle(&self, id: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let collection = store.cycle_collection().await;
            let result = collection
                .delete_one(doc! {"_id": id.as_str()})
                .await
                .map_err(|source| MongoDaoError::DeleteCycle { id, source })?;
            Ok(result.deleted_count > 0)
        })
    }

    fn watch_cycle(
        &self,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<BoxStream<'static, CycleEntity>>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let snapshots = stream! {
                let mut last: Option<CycleEntity> = None;
                loop {
                    match store.find_cycle_inner(&id).await {
                        Ok(Some(cycle)) => {
                            if last.as_ref() != Some(&cycle) {
                                last = Some(cycle.clone());
                                yield cycle;
                            }
                        }
                        Ok(None) => {
                            last = None;
                        }
                        Err(err) => {
                            warn!(cycle_id = %id, error = %err, "cycle poll failed");
                        }
                    }
                    sleep(WATCH_POLL_INTERVAL).await;
                }; // semicolon makes the macro body's tail type `()` instead of `!`
            };
            Ok(Box::pin(snapshots) as BoxStream<'static, CycleEntity>)
        })
    }

    fn find_library_movie(
        &self,
        owner: &str,
        movie_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<LibraryMovieEntity>>> {
        let store = self.clone();
        let owner = owner.to_owned();
        Box::pin(async move {
            let collection = store.library_collection().await;
            let document = collection
                .find_one(doc! {"_id": movie_id.to_string(), "owner": owner})
                .await
                .map_err(|source| MongoDaoError::LoadMovie {
                    id: movie_id,
                    source,
                })?;
            match document {
                Some(document) => Ok(Some(document.try_into()?)),
                None => Ok(None),
            }
        })
    }

    fn list_library(
        &self,
        owner: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<LibraryMovieEntity>>> {
        let store = self.clone();
        let owner = owner.to_owned();
        Box::pin(async move {
            let collection = store.library_collection().await;
            let documents: Vec<MongoLibraryMovieDocument> = collection
                .find(doc! {"owner": owner.as_str()})
                .await
                .map_err(|source| MongoDaoError::ListLibrary {
                    owner: owner.clone(),
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::ListLibrary {
                    owner: owner.clone(),
                    source,
                })?;

            documents
                .into_iter()
                .map(|document| document.try_into().map_err(StorageError::from))
                .collect()
        })
    }

    fn save_library_movie(
        &self,
        movie: LibraryMovieEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = movie.id;
            let document: MongoLibraryMovieDocument = movie.into();
            let collection = store.library_collection().await;
            collection
                .replace_one(doc! {"_id": id.to_string()}, &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::SaveMovie { id, source })?;
            Ok(())
        })
    }

    fn delete_library_movie(
        &self,
        owner: &str,
        movie_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let owner = owner.to_owned();
        Box::pin(async move {
            let collection = store.library_collection().await;
            let result = collection
                .delete_one(doc! {"_id": movie_id.to_string(), "owner": owner})
                .await
                .map_err(|source| MongoDaoError::DeleteMovie {
                    id: movie_id,
                    source,
                })?;
            Ok(result.deleted_count > 0)
        })
    }

    fn find_shared_movie(
        &self,
        movie_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SharedMovieEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let collection = store.shared_collection().await;
            let document = collection
                .find_one(doc! {"_id": movie_id.to_string()})
                .await
                .map_err(|source| MongoDaoError::LoadMovie {
                    id: movie_id,
                    source,
                })?;
            match document {
                Some(document) => Ok(Some(document.try_into()?)),
                None => Ok(None),
            }
        })
    }

    fn list_shared_movies(&self) -> BoxFuture<'static, StorageResult<Vec<SharedMovieEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let collection = store.shared_collection().await;
            let documents: Vec<MongoSharedMovieDocument> = collection
                .find(doc! {})
                .await
                .map_err(|source| MongoDaoError::ListShared { source })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::ListShared { source })?;

            documents
                .into_iter()
                .map(|document| document.try_into().map_err(StorageError::from))
                .collect()
        })
    }

    fn save_shared_movie(
        &self,
        movie: SharedMovieEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = movie.id;
            let document: MongoSharedMovieDocument = movie.into();
            let collection = store.shared_collection().await;
            collection
                .replace_one(doc! {"_id": id.to_string()}, &document)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::SaveMovie { id, source })?;
            Ok(())
        })
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
