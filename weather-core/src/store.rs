//! Persistence of observations into the `weather_data` table.
//!
//! One connection per run, no pool. The backend is picked from the url
//! scheme: PostgreSQL in production, SQLite for local runs and tests.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use sqlx::{AnyConnection, Connection, Row, any::AnyRow};

use crate::{
    config::DatabaseConfig,
    error::{Error, Result},
    model::{StoredObservation, WeatherObservation},
};

pub const TABLE_NAME: &str = "weather_data";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or_default();

        match scheme {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(Error::UnsupportedDatabase(other.to_string())),
        }
    }

    fn create_table_sql(self) -> String {
        let columns = match self {
            Dialect::Postgres => {
                "id BIGSERIAL PRIMARY KEY,
                date DATE NOT NULL,
                observation_time TIME NOT NULL,
                epoc_time BIGINT NOT NULL,
                temperature DOUBLE PRECISION NOT NULL,
                wind_speed DOUBLE PRECISION NOT NULL,
                wind_degree INTEGER NOT NULL,
                wind_dir TEXT NOT NULL,
                pressure DOUBLE PRECISION NOT NULL,
                feelslike DOUBLE PRECISION NOT NULL,
                uv_index INTEGER NOT NULL,
                visibility DOUBLE PRECISION NOT NULL"
            }
            Dialect::Sqlite => {
                "id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                observation_time TEXT NOT NULL,
                epoc_time INTEGER NOT NULL,
                temperature REAL NOT NULL,
                wind_speed REAL NOT NULL,
                wind_degree INTEGER NOT NULL,
                wind_dir TEXT NOT NULL,
                pressure REAL NOT NULL,
                feelslike REAL NOT NULL,
                uv_index INTEGER NOT NULL,
                visibility REAL NOT NULL"
            }
        };

        format!("CREATE TABLE IF NOT EXISTS {TABLE_NAME} ({columns})")
    }

    // Dates and times travel as text; Postgres casts them into typed columns.
    fn insert_sql(self) -> String {
        let values = match self {
            Dialect::Postgres => {
                "CAST($1 AS DATE), CAST($2 AS TIME), $3, $4, $5, $6, $7, $8, $9, $10, $11"
            }
            Dialect::Sqlite => "$1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11",
        };

        format!(
            "INSERT INTO {TABLE_NAME} (
                date, observation_time, epoc_time, temperature, wind_speed, wind_degree,
                wind_dir, pressure, feelslike, uv_index, visibility
            )
            VALUES ({values})
            RETURNING id"
        )
    }

    fn latest_sql(self) -> String {
        let columns = match self {
            Dialect::Postgres => {
                "id, CAST(date AS TEXT) AS date, CAST(observation_time AS TEXT) AS observation_time,
                epoc_time, temperature, wind_speed, CAST(wind_degree AS BIGINT) AS wind_degree,
                wind_dir, pressure, feelslike, CAST(uv_index AS BIGINT) AS uv_index, visibility"
            }
            Dialect::Sqlite => {
                "id, date, observation_time, epoc_time, temperature, wind_speed, wind_degree,
                wind_dir, pressure, feelslike, uv_index, visibility"
            }
        };

        format!("SELECT {columns} FROM {TABLE_NAME} ORDER BY id DESC LIMIT 1")
    }
}

/// A single open database session.
#[derive(Debug)]
pub struct WeatherStore {
    conn: AnyConnection,
    dialect: Dialect,
}

impl WeatherStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config.connection_url()?;
        Self::connect_url(&url, config.timeout()).await
    }

    pub async fn connect_url(url: &str, timeout: Duration) -> Result<Self> {
        let dialect = Dialect::from_url(url)?;
        sqlx::any::install_default_drivers();

        let conn = tokio::time::timeout(timeout, AnyConnection::connect(url))
            .await
            .map_err(|_| Error::DatabaseTimeout(timeout))??;

        tracing::debug!(?dialect, "connected to database");
        Ok(Self { conn, dialect })
    }

    /// Create `weather_data` unless it already exists.
    pub async fn ensure_table(&mut self) -> Result<()> {
        let sql = self.dialect.create_table_sql();
        sqlx::query(&sql).execute(&mut self.conn).await?;

        tracing::debug!(table = TABLE_NAME, "table ensured");
        Ok(())
    }

    /// Insert one row and return its surrogate key.
    pub async fn insert(&mut self, observation: &WeatherObservation) -> Result<i64> {
        let sql = self.dialect.insert_sql();
        let id: i64 = sqlx::query_scalar(&sql)
            .bind(observation.date.format(DATE_FORMAT).to_string())
            .bind(observation.observation_time.format(TIME_FORMAT).to_string())
            .bind(observation.epoc_time)
            .bind(observation.temperature)
            .bind(observation.wind_speed)
            .bind(observation.wind_degree)
            .bind(observation.wind_dir.clone())
            .bind(observation.pressure)
            .bind(observation.feelslike)
            .bind(observation.uv_index)
            .bind(observation.visibility)
            .fetch_one(&mut self.conn)
            .await?;

        tracing::info!(id, table = TABLE_NAME, "inserted observation");
        Ok(id)
    }

    /// Ensure the table and insert, the whole persistence step of a run.
    pub async fn save(&mut self, observation: &WeatherObservation) -> Result<i64> {
        self.ensure_table().await?;
        self.insert(observation).await
    }

    /// Most recently inserted row, if any.
    pub async fn latest(&mut self) -> Result<Option<StoredObservation>> {
        let sql = self.dialect.latest_sql();
        let row = sqlx::query(&sql)
            .fetch_optional(&mut self.conn)
            .await?;

        row.map(|row| row_to_stored(&row)).transpose()
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

/// Open a connection, save `observation`, and close the connection
/// whether or not the save succeeded.
pub async fn persist(config: &DatabaseConfig, observation: &WeatherObservation) -> Result<i64> {
    let mut store = WeatherStore::connect(config).await?;

    let saved = store.save(observation).await;
    let closed = store.close().await;

    let id = saved?;
    closed?;
    Ok(id)
}

fn row_to_stored(row: &AnyRow) -> Result<StoredObservation> {
    let date: String = row.try_get("date")?;
    let time: String = row.try_get("observation_time")?;

    let observation = WeatherObservation {
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| decode_error("date", e))?,
        observation_time: NaiveTime::parse_from_str(&time, TIME_FORMAT)
            .map_err(|e| decode_error("observation_time", e))?,
        epoc_time: row.try_get("epoc_time")?,
        temperature: row.try_get("temperature")?,
        wind_speed: row.try_get("wind_speed")?,
        wind_degree: narrow(row, "wind_degree")?,
        wind_dir: row.try_get("wind_dir")?,
        pressure: row.try_get("pressure")?,
        feelslike: row.try_get("feelslike")?,
        uv_index: narrow(row, "uv_index")?,
        visibility: row.try_get("visibility")?,
    };

    Ok(StoredObservation {
        id: row.try_get("id")?,
        observation,
    })
}

// Integer columns come back as 64-bit from both backends.
fn narrow(row: &AnyRow, column: &str) -> Result<i32> {
    let wide: i64 = row.try_get(column)?;
    i32::try_from(wide).map_err(|e| decode_error(column, e))
}

fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Database(sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    })
}
