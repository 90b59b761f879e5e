use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use validator::Validate;

use super::ReadingLoader;
use crate::error::{LoadError, LoadErrorKind, Result};
use crate::models::{Location, LocationRegistry, UnifiedReading};

const CREATE_LOCATIONS: &str = "
    CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        city TEXT NOT NULL,
        country TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        UNIQUE (city, country)
    )";

const CREATE_DAILY_READINGS: &str = "
    CREATE TABLE IF NOT EXISTS daily_readings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        location_id INTEGER NOT NULL REFERENCES locations (id),
        reading_date DATE NOT NULL,
        aqi REAL,
        pm25 REAL,
        o3 REAL,
        no2 REAL,
        pm10 REAL,
        co REAL,
        so2 REAL,
        temperature_celsius REAL,
        precipitation_mm REAL,
        wind_speed_kmh REAL,
        UNIQUE (location_id, reading_date)
    )";

const UPSERT_READING: &str = "
    INSERT INTO daily_readings (
        location_id, reading_date, aqi, pm25, o3, no2, pm10, co, so2,
        temperature_celsius, precipitation_mm, wind_speed_kmh
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (location_id, reading_date) DO UPDATE SET
        aqi = excluded.aqi,
        pm25 = excluded.pm25,
        o3 = excluded.o3,
        no2 = excluded.no2,
        pm10 = excluded.pm10,
        co = excluded.co,
        so2 = excluded.so2,
        temperature_celsius = excluded.temperature_celsius,
        precipitation_mm = excluded.precipitation_mm,
        wind_speed_kmh = excluded.wind_speed_kmh";

/// A row of `daily_readings` as stored.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredReading {
    pub id: i64,
    pub location_id: i64,
    pub reading_date: NaiveDate,
    pub aqi: Option<f64>,
    pub pm25: Option<f64>,
    pub o3: Option<f64>,
    pub no2: Option<f64>,
    pub pm10: Option<f64>,
    pub co: Option<f64>,
    pub so2: Option<f64>,
    pub temperature_celsius: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
}

/// Loads unified readings into SQLite with upsert semantics.
///
/// Owns the run's single connection pool; call [`SqliteWriter::close`] when done.
pub struct SqliteWriter {
    pool: SqlitePool,
}

impl SqliteWriter {
    /// Open (creating if missing) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        // One connection: writes are sequential and in-memory databases stay shared
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        debug!(database_url, "Connected to store");
        Ok(Self { pool })
    }

    /// Create `locations` and `daily_readings` if they do not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_LOCATIONS).execute(&self.pool).await?;
        sqlx::query(CREATE_DAILY_READINGS).execute(&self.pool).await?;
        info!("Schema ready");
        Ok(())
    }

    pub async fn count_readings(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM daily_readings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_locations(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// The stored reading for (city, country, date), if any.
    pub async fn fetch_reading(
        &self,
        city: &str,
        country: &str,
        date: NaiveDate,
    ) -> Result<Option<StoredReading>> {
        let reading = sqlx::query_as::<_, StoredReading>(
            "SELECT r.id, r.location_id, r.reading_date, r.aqi, r.pm25, r.o3, r.no2, r.pm10,
                    r.co, r.so2, r.temperature_celsius, r.precipitation_mm, r.wind_speed_kmh
             FROM daily_readings r
             JOIN locations l ON l.id = r.location_id
             WHERE l.city = ? AND l.country = ? AND r.reading_date = ?",
        )
        .bind(city)
        .bind(country)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reading)
    }

    /// Store every registry location not stored yet; returns how many were new.
    pub async fn seed_locations(&self, registry: &LocationRegistry) -> Result<usize> {
        let before = self.count_locations().await?;

        let mut tx = self.pool.begin().await?;
        for location in registry.iter() {
            resolve_location(&mut tx, location).await?;
        }
        tx.commit().await?;

        let added = (self.count_locations().await? - before) as usize;
        info!(added, total = registry.len(), "Locations seeded");
        Ok(added)
    }

    /// Close the pool, waiting for the connection to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Id of the location row, inserting it first when absent.
async fn resolve_location(conn: &mut SqliteConnection, location: &Location) -> sqlx::Result<i64> {
    sqlx::query(
        "INSERT INTO locations (city, country, latitude, longitude)
         VALUES (?, ?, ?, ?)
         ON CONFLICT (city, country) DO NOTHING",
    )
    .bind(&location.city)
    .bind(&location.country)
    .bind(location.latitude)
    .bind(location.longitude)
    .execute(&mut *conn)
    .await?;

    sqlx::query_scalar("SELECT id FROM locations WHERE city = ? AND country = ?")
        .bind(&location.city)
        .bind(&location.country)
        .fetch_one(&mut *conn)
        .await
}

async fn upsert_reading(
    conn: &mut SqliteConnection,
    location_id: i64,
    reading: &UnifiedReading,
) -> sqlx::Result<()> {
    sqlx::query(UPSERT_READING)
        .bind(location_id)
        .bind(reading.date)
        .bind(reading.aqi)
        .bind(reading.pm25)
        .bind(reading.o3)
        .bind(reading.no2)
        .bind(reading.pm10)
        .bind(reading.co)
        .bind(reading.so2)
        .bind(reading.temperature_celsius)
        .bind(reading.precipitation_mm)
        .bind(reading.wind_speed_kmh)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl ReadingLoader for SqliteWriter {
    async fn load(&self, reading: &UnifiedReading) -> std::result::Result<i64, LoadError> {
        let fail = |kind: LoadErrorKind| LoadError::new(reading.location.to_string(), reading.date, kind);

        reading.validate().map_err(|e| fail(e.into()))?;

        let mut tx = self.pool.begin().await.map_err(|e| fail(e.into()))?;
        let location_id = resolve_location(&mut tx, &reading.location)
            .await
            .map_err(|e| fail(e.into()))?;
        upsert_reading(&mut tx, location_id, reading)
            .await
            .map_err(|e| fail(e.into()))?;
        tx.commit().await.map_err(|e| fail(e.into()))?;

        debug!(
            location = %reading.location,
            date = %reading.date,
            location_id,
            "Upserted daily reading"
        );
        Ok(location_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn writer(dir: &TempDir) -> SqliteWriter {
        let url = format!("sqlite://{}", dir.path().join("test.sqlite").display());
        let writer = SqliteWriter::connect(&url).await.unwrap();
        writer.init_schema().await.unwrap();
        writer
    }

    fn reading(pm25: Option<f64>) -> UnifiedReading {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let mut reading = UnifiedReading::empty(Location::new("Atlanta", "US", 33.75, -84.39), date);
        reading.pm25 = pm25;
        reading.precipitation_mm = Some(1.5);
        reading
    }

    #[tokio::test]
    async fn test_init_schema_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        writer.init_schema().await.unwrap();
        assert_eq!(writer.count_readings().await.unwrap(), 0);
        writer.close().await;
    }

    #[tokio::test]
    async fn test_load_creates_location_once() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;

        let first = writer.load(&reading(Some(12.0))).await.unwrap();
        let mut other_day = reading(Some(8.0));
        other_day.date = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        let second = writer.load(&other_day).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(writer.count_locations().await.unwrap(), 1);
        assert_eq!(writer.count_readings().await.unwrap(), 2);
        writer.close().await;
    }

    #[tokio::test]
    async fn test_seed_locations_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        let registry = LocationRegistry::new(LocationRegistry::default_locations()).unwrap();

        assert_eq!(writer.seed_locations(&registry).await.unwrap(), 3);
        assert_eq!(writer.seed_locations(&registry).await.unwrap(), 0);
        assert_eq!(writer.count_locations().await.unwrap(), 3);
        writer.close().await;
    }

    #[tokio::test]
    async fn test_upsert_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

        writer.load(&reading(Some(12.0))).await.unwrap();
        let before = writer.fetch_reading("Atlanta", "US", date).await.unwrap().unwrap();

        writer.load(&reading(Some(20.0))).await.unwrap();
        let after = writer.fetch_reading("Atlanta", "US", date).await.unwrap().unwrap();

        assert_eq!(writer.count_readings().await.unwrap(), 1);
        assert_eq!(before.id, after.id);
        assert_eq!(after.pm25, Some(20.0));
        assert_eq!(after.precipitation_mm, Some(1.5));
        writer.close().await;
    }

    #[tokio::test]
    async fn test_null_is_stored_as_null() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

        writer.load(&reading(None)).await.unwrap();
        let stored = writer.fetch_reading("Atlanta", "US", date).await.unwrap().unwrap();

        assert_eq!(stored.pm25, None);
        assert_eq!(stored.aqi, None);
        assert_eq!(stored.precipitation_mm, Some(1.5));
        writer.close().await;
    }

    #[tokio::test]
    async fn test_out_of_range_value_rejected_before_write() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;

        let err = writer.load(&reading(Some(-3.0))).await.unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::Validation(_)));
        assert_eq!(err.location, "Atlanta, US");
        assert_eq!(writer.count_readings().await.unwrap(), 0);
        writer.close().await;
    }

    #[tokio::test]
    async fn test_closed_pool_is_connectivity_error() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;
        writer.close().await;

        let err = writer.load(&reading(Some(12.0))).await.unwrap_err();
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn test_missing_location_is_foreign_key_violation() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir).await;

        let mut conn = writer.pool().acquire().await.unwrap();
        let err = upsert_reading(&mut conn, 999, &reading(Some(1.0))).await.unwrap_err();
        let kind: LoadErrorKind = err.into();
        assert!(matches!(kind, LoadErrorKind::ForeignKey(_)));
    }
}
