//! Store feeds repository

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::AppResult,
    models::store::{BusinessHoursRecord, StoreSnapshot, StoreStatusRecord, StoreTimezoneRecord},
};

/// Rows per INSERT statement, well below the Postgres bind limit
const INSERT_CHUNK: usize = 1000;

/// Writes take a connection so that callers can group them in one
/// transaction.
#[derive(Clone)]
pub struct StoresRepository {
    pool: Pool<Postgres>,
}

impl StoresRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Load the three feeds in full, as of one database snapshot
    pub async fn load_snapshot(&self) -> AppResult<StoreSnapshot> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let statuses = sqlx::query_as::<_, StoreStatusRecord>(
            "SELECT store_id, timestamp_utc, status FROM store_status ORDER BY store_id, timestamp_utc"
        )
        .fetch_all(&mut *tx)
        .await?;

        let business_hours = sqlx::query_as::<_, BusinessHoursRecord>(
            "SELECT store_id, day_of_week, start_time_local, end_time_local FROM business_hours ORDER BY store_id, id"
        )
        .fetch_all(&mut *tx)
        .await?;

        let timezones = sqlx::query_as::<_, StoreTimezoneRecord>(
            "SELECT store_id, timezone_str FROM store_timezone ORDER BY store_id, id"
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(StoreSnapshot {
            statuses,
            business_hours,
            timezones,
        })
    }

    /// Insert status polls
    pub async fn insert_statuses(&self, conn: &mut PgConnection, rows: &[StoreStatusRecord]) -> AppResult<()> {
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO store_status (store_id, timestamp_utc, status) ");
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.store_id.clone())
                    .push_bind(row.timestamp_utc)
                    .push_bind(row.status.clone());
            });
            builder.build().execute(&mut *conn).await?;
        }
        Ok(())
    }

    /// Insert business-hour slots
    pub async fn insert_business_hours(&self, conn: &mut PgConnection, rows: &[BusinessHoursRecord]) -> AppResult<()> {
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO business_hours (store_id, day_of_week, start_time_local, end_time_local) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.store_id.clone())
                    .push_bind(row.day_of_week)
                    .push_bind(row.start_time_local.clone())
                    .push_bind(row.end_time_local.clone());
            });
            builder.build().execute(&mut *conn).await?;
        }
        Ok(())
    }

    /// Insert store timezones
    pub async fn insert_timezones(&self, conn: &mut PgConnection, rows: &[StoreTimezoneRecord]) -> AppResult<()> {
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO store_timezone (store_id, timezone_str) ");
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.store_id.clone()).push_bind(row.timezone_str.clone());
            });
            builder.build().execute(&mut *conn).await?;
        }
        Ok(())
    }

    /// Remove every ingested row
    pub async fn clear(&self, conn: &mut PgConnection) -> AppResult<()> {
        sqlx::query("DELETE FROM store_status").execute(&mut *conn).await?;
        sqlx::query("DELETE FROM business_hours").execute(&mut *conn).await?;
        sqlx::query("DELETE FROM store_timezone").execute(&mut *conn).await?;
        Ok(())
    }
}
