use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::storage::StorageError;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save cycle `{id}`")]
    SaveCycle {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load cycle `{id}`")]
    LoadCycle {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to update cycle `{id}`")]
    UpdateCycle {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete cycle `{id}`")]
    DeleteCycle {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save movie `{id}`")]
    SaveMovie {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load movie `{id}`")]
    LoadMovie {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete movie `{id}`")]
    DeleteMovie {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list library of `{owner}`")]
    ListLibrary {
        owner: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list the shared movie pool")]
    ListShared {
        #[source]
        source: MongoError,
    },
    #[error("failed to encode `{context}` into BSON")]
    Encode {
        context: &'static str,
        #[source]
        source: mongodb::bson::error::Error,
    },
    #[error("stored document carries an invalid movie id `{value}`")]
    InvalidMovieId {
        value: String,
        #[source]
        source: uuid::Error,
    },
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
