use crate::errors::ApiError;
use crate::models::{MelodyRecord, Owner, TransferRecord};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};

pub type Db = Pool<Sqlite>;

pub async fn connect(db_url: &str) -> Result<Db, ApiError> {
    connect_with(db_url, 5).await
}

pub async fn connect_with(db_url: &str, max_connections: u32) -> Result<Db, ApiError> {
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "sqlite connect failed");
            ApiError::Internal
        })
}

pub async fn init_schema(db: &Db) -> Result<(), ApiError> {
    // `commitment` is the decimal form of the Poseidon hash; one owner per commitment.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS melodies (
  commitment TEXT PRIMARY KEY,
  owner TEXT NOT NULL,
  registered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS melodies_by_owner ON melodies(owner, registered_at);

CREATE TABLE IF NOT EXISTS transfers (
  id TEXT PRIMARY KEY,
  commitment TEXT NOT NULL,
  from_owner TEXT NOT NULL,
  to_owner TEXT NOT NULL,
  transferred_at TEXT NOT NULL
);
"#,
    )
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(())
}

/// Insert a registration. Returns `false` if the commitment is already taken.
pub async fn insert_melody(db: &Db, record: &MelodyRecord) -> Result<bool, ApiError> {
    let res = sqlx::query(r#"INSERT OR IGNORE INTO melodies (commitment, owner, registered_at) VALUES (?, ?, ?)"#)
        .bind(&record.commitment)
        .bind(record.owner.as_str())
        .bind(record.registered_at.to_rfc3339())
        .execute(db)
        .await
        .map_err(|_| ApiError::Internal)?;

    Ok(res.rows_affected() == 1)
}

pub async fn get_melody(db: &Db, commitment: &str) -> Result<Option<MelodyRecord>, ApiError> {
    let row = sqlx::query(r#"SELECT owner, registered_at FROM melodies WHERE commitment = ?"#)
        .bind(commitment)
        .fetch_optional(db)
        .await
        .map_err(|_| ApiError::Internal)?;

    let Some(row) = row else { return Ok(None); };

    let owner: String = row.get(0);
    let registered_at: String = row.get(1);

    Ok(Some(MelodyRecord {
        commitment: commitment.to_string(),
        owner: stored_owner(&owner)?,
        registered_at: parse_time(&registered_at)?,
    }))
}

pub async fn list_by_owner(db: &Db, owner: &Owner) -> Result<Vec<String>, ApiError> {
    let rows = sqlx::query(r#"SELECT commitment FROM melodies WHERE owner = ? ORDER BY registered_at, commitment"#)
        .bind(owner.as_str())
        .fetch_all(db)
        .await
        .map_err(|_| ApiError::Internal)?;

    Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
}

/// Move ownership and append the transfer row atomically.
///
/// Returns `false` without writing anything if `from` is not the current owner.
pub async fn transfer_owner(db: &Db, record: &TransferRecord) -> Result<bool, ApiError> {
    let mut tx = db.begin().await.map_err(|_| ApiError::Internal)?;

    let res = sqlx::query(r#"UPDATE melodies SET owner = ? WHERE commitment = ? AND owner = ?"#)
        .bind(record.to.as_str())
        .bind(&record.commitment)
        .bind(record.from.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|_| ApiError::Internal)?;

    if res.rows_affected() != 1 {
        tx.rollback().await.map_err(|_| ApiError::Internal)?;
        return Ok(false);
    }

    sqlx::query(
        r#"INSERT INTO transfers (id, commitment, from_owner, to_owner, transferred_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(record.transfer_id.to_string())
    .bind(&record.commitment)
    .bind(record.from.as_str())
    .bind(record.to.as_str())
    .bind(record.transferred_at.to_rfc3339())
    .execute(&mut *tx)
    .await
    .map_err(|_| ApiError::Internal)?;

    tx.commit().await.map_err(|_| ApiError::Internal)?;
    Ok(true)
}

pub async fn count_transfers(db: &Db, commitment: &str) -> Result<u64, ApiError> {
    let row = sqlx::query(r#"SELECT COUNT(*) AS c FROM transfers WHERE commitment = ?"#)
        .bind(commitment)
        .fetch_one(db)
        .await
        .map_err(|_| ApiError::Internal)?;
    let c: i64 = row.get("c");
    Ok(c as u64)
}

fn stored_owner(s: &str) -> Result<Owner, ApiError> {
    Owner::parse(s).map_err(|_| ApiError::Internal)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ApiError::Internal)
}
