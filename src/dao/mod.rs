/// Database model definitions.
pub mod models;
/// Cycle, library and shared-pool storage operations.
pub mod night_store;
/// Storage abstraction layer for database operations.
pub mod storage;
