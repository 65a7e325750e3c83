use crate::error::BridgeError;
use crate::payload::{Datapoint, SensorEvent};
use crate::topic::TopicIdentifier;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::time::Duration;

/// Persistence gateway. Owns the process-wide connection pool; constructed
/// once at startup and closed only on the graceful shutdown path.
#[derive(Clone)]
pub struct EventStore {
    pool: PgPool,
}

impl EventStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, BridgeError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(8))
            .connect(database_url)
            .await
            .map_err(BridgeError::StoreUnavailable)?;
        Ok(Self { pool })
    }

    /// Test-only constructor over an externally built pool.
    #[cfg(test)]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes the event row and its datapoint batch in one transaction, so a
    /// failure between the two inserts cannot leave an event without its
    /// measurements. Returns the server-assigned event id.
    pub async fn record_event(
        &self,
        identifier: &TopicIdentifier,
        event: &SensorEvent,
    ) -> Result<i64, BridgeError> {
        let mut tx = self.pool.begin().await.map_err(BridgeError::from)?;
        let event_id = write_event(&mut tx, identifier, event).await?;
        write_datapoints(&mut tx, event_id, &event.datapoints).await?;
        tx.commit().await.map_err(BridgeError::from)?;
        Ok(event_id)
    }

    /// Single-statement event insert, outside any transaction.
    pub async fn insert_event(
        &self,
        identifier: &TopicIdentifier,
        event: &SensorEvent,
    ) -> Result<i64, BridgeError> {
        let mut conn = self.pool.acquire().await.map_err(BridgeError::from)?;
        write_event(&mut conn, identifier, event).await
    }

    /// Single-statement datapoint batch insert. No-op on an empty slice.
    pub async fn insert_datapoints(
        &self,
        event_id: i64,
        datapoints: &[Datapoint],
    ) -> Result<(), BridgeError> {
        let mut conn = self.pool.acquire().await.map_err(BridgeError::from)?;
        write_datapoints(&mut conn, event_id, datapoints).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn write_event(
    conn: &mut PgConnection,
    identifier: &TopicIdentifier,
    event: &SensorEvent,
) -> Result<i64, BridgeError> {
    // The timestamp is bound as text and cast by the store; an uncastable
    // value comes back as SQLSTATE 22xxx, i.e. a constraint violation.
    let (event_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO events (
            client_id, location, area, subarea, device_id,
            version, event_timestamp, device_category, device_name
        ) VALUES ($1, $2, $3, $4, $5, $6, $7::timestamptz, $8, $9)
        RETURNING id
        "#,
    )
    .bind(identifier.client_id)
    .bind(&identifier.location)
    .bind(&identifier.area)
    .bind(&identifier.subarea)
    .bind(&identifier.device_id)
    .bind(&event.version)
    .bind(&event.timestamp)
    .bind(&event.device_category)
    .bind(&event.device_name)
    .fetch_one(&mut *conn)
    .await
    .map_err(BridgeError::from)?;

    Ok(event_id)
}

async fn write_datapoints(
    conn: &mut PgConnection,
    event_id: i64,
    datapoints: &[Datapoint],
) -> Result<(), BridgeError> {
    if datapoints.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO datapoints (event_id, name, value, units, port, type) ");
    builder.push_values(datapoints.iter(), |mut b, dp| {
        b.push_bind(event_id)
            .push_bind(&dp.name)
            .push_bind(dp.value)
            .push_bind(&dp.units)
            .push_bind(dp.port)
            .push_bind(dp.kind.as_str());
    });

    builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(BridgeError::from)?;
    Ok(())
}
