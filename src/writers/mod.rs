pub mod sqlite_writer;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::models::UnifiedReading;

pub use sqlite_writer::{SqliteWriter, StoredReading};

/// Persists unified readings, one row per (location, date).
#[async_trait]
pub trait ReadingLoader: Send + Sync {
    /// Upsert `reading`, returning the id of its location row.
    async fn load(&self, reading: &UnifiedReading) -> Result<i64, LoadError>;
}
