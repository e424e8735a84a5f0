use std::sync::Arc;

use async_stream::stream;
use dashmap::{DashMap, mapref::entry::Entry};
use futures::{future::BoxFuture, stream::BoxStream};
use indexmap::IndexMap;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use super::{CycleUpdate, NightStore};
use crate::dao::{
    models::{CycleEntity, LibraryMovieEntity, SharedMovieEntity},
    storage::{StorageError, StorageResult},
};

const WATCH_CHANNEL_CAPACITY: usize = 32;

/// In-memory store backend.
///
/// Subscriptions are fanned out through one broadcast channel per
/// cycle document; a subscriber that lags catches up from the latest
/// state instead of replaying missed snapshots, matching the
/// at-least-once delivery the engine expects.
#[derive(Clone, Default)]
pub struct MemoryNightStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cycles: DashMap<String, CycleEntity>,
    watchers: DashMap<String, broadcast::Sender<CycleEntity>>,
    libraries: DashMap<String, IndexMap<Uuid, LibraryMovieEntity>>,
    shared: DashMap<Uuid, SharedMovieEntity>,
}

impl MemoryNightStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, id: &str) -> broadcast::Sender<CycleEntity> {
        self.inner
            .watchers
            .entry(id.to_owned())
            .or_insert_with(|| broadcast::channel(WATCH_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn notify(&self, cycle: &CycleEntity) {
        if let Some(sender) = self.inner.watchers.get(&cycle.id) {
            let _ = sender.send(cycle.clone());
        }
    }
}

impl NightStore for MemoryNightStore {
    fn find_cycle(&self, id: &str) -> BoxFuture<'static, StorageResult<Option<CycleEntity>>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { Ok(store.inner.cycles.get(&id).map(|entry| entry.value().clone())) })
    }

    fn create_cycle(&self, cycle: CycleEntity) -> BoxFuture<'static, StorageResult<CycleEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let stored = match store.inner.cycles.entry(cycle.id.clone()) {
                Entry::Occupied(existing) => existing.get().clone(),
                Entry::Vacant(slot) => {
                    slot.insert(cycle.clone());
                    store.notify(&cycle);
                    cycle
                }
            };
            Ok(stored)
        })
    }

    fn apply_cycle_update(
        &self,
        id: &str,
        update: CycleUpdate,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let Some(mut entry) = store.inner.cycles.get_mut(&id) else {
                return Err(StorageError::missing(id));
            };
            let applied = update.apply_to(&mut entry);
            let snapshot = applied.then(|| entry.clone());
            drop(entry);

            if let Some(cycle) = snapshot {
                store.notify(&cycle);
            }
            Ok(applied)
        })
    }

    fn delete_cycle(&self, id: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { Ok(store.inner.cycles.remove(&id).is_some()) })
    }

    fn watch_cycle(
        &self,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<BoxStream<'static, CycleEntity>>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let mut receiver = store.sender_for(&id).subscribe();
            let initial = store.inner.cycles.get(&id).map(|entry| entry.value().clone());
            let snapshots = stream! {
                if let Some(cycle) = initial {
                    yield cycle;
                }
                loop {
                    match receiver.recv().await {
                        Ok(cycle) => yield cycle,
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Catch up from the latest state instead of replaying.
                            if let Some(cycle) =
                                store.inner.cycles.get(&id).map(|entry| entry.value().clone())
                            {
                                yield cycle;
                            }
                        }
                    }
                }
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
            Ok(store
                .inner
                .libraries
                .get(&owner)
                .and_then(|library| library.get(&movie_id).cloned()))
        })
    }

    fn list_library(
        &self,
        owner: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<LibraryMovieEntity>>> {
        let store = self.clone();
        let owner = owner.to_owned();
        Box::pin(async move {
            Ok(store
                .inner
                .libraries
                .get(&owner)
                .map(|library| library.values().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn save_library_movie(
        &self,
        movie: LibraryMovieEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .inner
                .libraries
                .entry(movie.owner.clone())
                .or_default()
                .insert(movie.id, movie);
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
            Ok(store
                .inner
                .libraries
                .get_mut(&owner)
                .map(|mut library| library.shift_remove(&movie_id).is_some())
                .unwrap_or(false))
        })
    }

    fn find_shared_movie(
        &self,
        movie_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SharedMovieEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .shared
                .get(&movie_id)
                .map(|entry| entry.value().clone()))
        })
    }

    fn list_shared_movies(&self) -> BoxFuture<'static, StorageResult<Vec<SharedMovieEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .shared
                .iter()
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn save_shared_movie(
        &self,
        movie: SharedMovieEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.shared.insert(movie.id, movie);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use futures::StreamExt;

    use super::*;
    use crate::dao::models::ScheduleSettingsEntity;
    use crate::state::state_machine::CycleStatus;

    fn cycle(id: &str) -> CycleEntity {
        CycleEntity {
            id: id.into(),
            current_status: CycleStatus::WaitingForDecisions,
            decisions: Default::default(),
            nominations: Default::default(),
            votes: Default::default(),
            winning_movie: None,
            schedule_settings: ScheduleSettingsEntity {
                finish_by: "21:30".into(),
            },
            reveal_ends_at: None,
            created_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn create_cycle_is_first_writer_wins() {
        let store = MemoryNightStore::new();
        let first = store.create_cycle(cycle("2026-08-04")).await.unwrap();

        let mut second = cycle("2026-08-04");
        second.current_status = CycleStatus::Reveal;
        let stored = store.create_cycle(second).await.unwrap();

        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn update_of_missing_cycle_errors() {
        let store = MemoryNightStore::new();
        let err = store
            .apply_cycle_update(
                "2026-08-04",
                CycleUpdate::SetDecision {
                    user_id: "ana".into(),
                    interested: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Missing { .. }));
    }

    #[tokio::test]
    async fn stale_conditional_advance_reports_not_applied() {
        let store = MemoryNightStore::new();
        store.create_cycle(cycle("2026-08-04")).await.unwrap();

        let advance = CycleUpdate::AdvanceStatus {
            from: CycleStatus::WaitingForDecisions,
            to: CycleStatus::GatheringNominations,
            winner: None,
            reveal_ends_at: None,
        };
        assert!(
            store
                .apply_cycle_update("2026-08-04", advance.clone())
                .await
                .unwrap()
        );
        assert!(
            !store
                .apply_cycle_update("2026-08-04", advance)
                .await
                .unwrap()
        );

        let stored = store.find_cycle("2026-08-04").await.unwrap().unwrap();
        assert_eq!(stored.current_status, CycleStatus::GatheringNominations);
    }

    #[tokio::test]
    async fn watch_yields_current_state_then_updates() {
        let store = MemoryNightStore::new();
        store.create_cycle(cycle("2026-08-04")).await.unwrap();

        let mut snapshots = store.watch_cycle("2026-08-04").await.unwrap();
        let first = snapshots.next().await.unwrap();
        assert_eq!(first.current_status, CycleStatus::WaitingForDecisions);

        store
            .apply_cycle_update(
                "2026-08-04",
                CycleUpdate::SetDecision {
                    user_id: "ana".into(),
                    interested: true,
                },
            )
            .await
            .unwrap();

        let second = snapshots.next().await.unwrap();
        assert_eq!(second.decisions.get("ana"), Some(&true));
    }

    #[tokio::test]
    async fn library_is_isolated_per_owner() {
        let store = MemoryNightStore::new();
        let movie = LibraryMovieEntity {
            id: Uuid::new_v4(),
            owner: "ana".into(),
            catalog_id: None,
            title: "Stalker".into(),
            poster_url: None,
            runtime_minutes: 162,
            release_year: Some(1979),
            genres: vec!["Sci-Fi".into()],
            description: None,
            nomination_streak: 0,
            last_nominated_cycle: None,
            added_at: SystemTime::UNIX_EPOCH,
        };
        store.save_library_movie(movie.clone()).await.unwrap();

        assert!(
            store
                .find_library_movie("ben", movie.id)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            store
                .find_library_movie("ana", movie.id)
                .await
                .unwrap()
                .as_ref(),
            Some(&movie)
        );
        assert!(store.list_library("ben").await.unwrap().is_empty());
        assert!(!store.delete_library_movie("ben", movie.id).await.unwrap());
        assert!(store.delete_library_movie("ana", movie.id).await.unwrap());
    }
}
