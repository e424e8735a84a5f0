use indexmap::IndexMap;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{
    CycleEntity, LibraryMovieEntity, ScheduleSettingsEntity, SharedMovieEntity, VoteEntity,
    WinnerEntity,
};
use crate::state::state_machine::CycleStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCycleDocument {
    #[serde(rename = "_id")]
    id: String,
    current_status: CycleStatus,
    #[serde(default)]
    decisions: IndexMap<String, bool>,
    #[serde(default)]
    nominations: IndexMap<String, Vec<Uuid>>,
    #[serde(default)]
    votes: IndexMap<String, VoteEntity>,
    #[serde(default)]
    winning_movie: Option<WinnerEntity>,
    schedule_settings: ScheduleSettingsEntity,
    #[serde(default)]
    reveal_ends_at: Option<DateTime>,
    created_at: DateTime,
}

impl From<CycleEntity> for MongoCycleDocument {
    fn from(value: CycleEntity) -> Self {
        Self {
            id: value.id,
            current_status: value.current_status,
            decisions: value.decisions,
            nominations: value.nominations,
            votes: value.votes,
            winning_movie: value.winning_movie,
            schedule_settings: value.schedule_settings,
            reveal_ends_at: value.reveal_ends_at.map(DateTime::from_system_time),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoCycleDocument> for CycleEntity {
    fn from(value: MongoCycleDocument) -> Self {
        Self {
            id: value.id,
            current_status: value.current_status,
            decisions: value.decisions,
            nominations: value.nominations,
            votes: value.votes,
            winning_movie: value.winning_movie,
            schedule_settings: value.schedule_settings,
            reveal_ends_at: value.reveal_ends_at.map(DateTime::to_system_time),
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLibraryMovieDocument {
    #[serde(rename = "_id")]
    id: String,
    owner: String,
    #[serde(default)]
    catalog_id: Option<String>,
    title: String,
    #[serde(default)]
    poster_url: Option<String>,
    runtime_minutes: u32,
    #[serde(default)]
    release_year: Option<i32>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    nomination_streak: u32,
    #[serde(default)]
    last_nominated_cycle: Option<String>,
    added_at: DateTime,
}

impl From<LibraryMovieEntity> for MongoLibraryMovieDocument {
    fn from(value: LibraryMovieEntity) -> Self {
        Self {
            id: value.id.to_string(),
            owner: value.owner,
            catalog_id: value.catalog_id,
            title: value.title,
            poster_url: value.poster_url,
            runtime_minutes: value.runtime_minutes,
            release_year: value.release_year,
            genres: value.genres,
            description: value.description,
            nomination_streak: value.nomination_streak,
            last_nominated_cycle: value.last_nominated_cycle,
            added_at: DateTime::from_system_time(value.added_at),
        }
    }
}

impl TryFrom<MongoLibraryMovieDocument> for LibraryMovieEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoLibraryMovieDocument) -> Result<Self, Self::Error> {
        let id = parse_movie_id(&value.id)?;
        Ok(Self {
            id,
            owner: value.owner,
            catalog_id: value.catalog_id,
            title: value.title,
            poster_url: value.poster_url,
            runtime_minutes: value.runtime_minutes,
            release_year: value.release_year,
            genres: value.genres,
            description: value.description,
            nomination_streak: value.nomination_streak,
            last_nominated_cycle: value.last_nominated_cycle,
            added_at: value.added_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSharedMovieDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    catalog_id: Option<String>,
    title: String,
    #[serde(default)]
    poster_url: Option<String>,
    runtime_minutes: u32,
    #[serde(default)]
    release_year: Option<i32>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    nomination_streak: u32,
    original_owner: String,
    shared_at: DateTime,
}

impl From<SharedMovieEntity> for MongoSharedMovieDocument {
    fn from(value: SharedMovieEntity) -> Self {
        Self {
            id: value.id.to_string(),
            catalog_id: value.catalog_id,
            title: value.title,
            poster_url: value.poster_url,
            runtime_minutes: value.runtime_minutes,
            release_year: value.release_year,
            genres: value.genres,
            description: value.description,
            nomination_streak: value.nomination_streak,
            original_owner: value.original_owner,
            shared_at: DateTime::from_system_time(value.shared_at),
        }
    }
}

impl TryFrom<MongoSharedMovieDocument> for SharedMovieEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSharedMovieDocument) -> Result<Self, Self::Error> {
        let id = parse_movie_id(&value.id)?;
        Ok(Self {
            id,
            catalog_id: value.catalog_id,
            title: value.title,
            poster_url: value.poster_url,
            runtime_minutes: value.runtime_minutes,
            release_year: value.release_year,
            genres: value.genres,
            description: value.description,
            nomination_streak: value.nomination_streak,
            original_owner: value.original_owner,
            shared_at: value.shared_at.to_system_time(),
        })
    }
}

fn parse_movie_id(value: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(value).map_err(|source| MongoDaoError::InvalidMovieId {
        value: value.to_owned(),
        source,
    })
}
