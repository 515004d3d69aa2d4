use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use tokio_postgres::Row;
use tracing::instrument;
use uuid::Uuid;

use crate::api::connection::{Connection, ConnectionStatus, ConnectionType, NewConnection};
use crate::db::parse_column;
use crate::db::util::timed;
use crate::store::StoreError;

const CONNECTION_COLUMNS: &str =
    "id, user1_id, user2_id, connection_type, compatibility_score, status, created_at, responded_at";

fn connection_from_row(row: &Row) -> Result<Connection, StoreError> {
    let connection_type: String = row.get("connection_type");
    let status: String = row.get("status");
    Ok(Connection {
        id: row.get("id"),
        user1_id: row.get("user1_id"),
        user2_id: row.get("user2_id"),
        connection_type: parse_column(&connection_type, "connections.connection_type")?,
        compatibility_score: row.get("compatibility_score"),
        status: parse_column(&status, "connections.status")?,
        created_at: row.get("created_at"),
        responded_at: row.get("responded_at"),
    })
}

/// `ON CONFLICT DO NOTHING` keeps the insert idempotent; the existing row is
/// re-read when nothing was inserted.
#[instrument(skip(client, new), fields(user1_id = %new.user1_id, user2_id = %new.user2_id))]
pub async fn insert_connection(
    client: &impl GenericClient,
    new: &NewConnection,
) -> Result<(Connection, bool), StoreError> {
    let sql = format!(
        "INSERT INTO bitspark.connections
            (id, user1_id, user2_id, connection_type, compatibility_score, status, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, NOW())
         ON CONFLICT (user1_id, user2_id, connection_type) DO NOTHING
         RETURNING {CONNECTION_COLUMNS}"
    );
    let inserted = timed(
        "connections.insert",
        client.query_opt(
            sql.as_str(),
            &[
                &Uuid::new_v4(),
                &new.user1_id,
                &new.user2_id,
                &new.connection_type.as_str(),
                &new.compatibility_score,
                &new.status.as_str(),
            ],
        ),
    )
    .await?;

    if let Some(row) = inserted {
        return Ok((connection_from_row(&row)?, true));
    }

    let sql = format!(
        "SELECT {CONNECTION_COLUMNS} FROM bitspark.connections
         WHERE user1_id = $1 AND user2_id = $2 AND connection_type = $3"
    );
    let row = timed(
        "connections.select_existing",
        client.query_one(
            sql.as_str(),
            &[&new.user1_id, &new.user2_id, &new.connection_type.as_str()],
        ),
    )
    .await?;
    Ok((connection_from_row(&row)?, false))
}

#[instrument(skip(client))]
pub async fn get_connection(
    client: &impl GenericClient,
    id: Uuid,
) -> Result<Option<Connection>, StoreError> {
    let sql = format!("SELECT {CONNECTION_COLUMNS} FROM bitspark.connections WHERE id = $1");
    let row = timed("connections.get", client.query_opt(sql.as_str(), &[&id])).await?;
    row.as_ref().map(connection_from_row).transpose()
}

#[instrument(skip(client))]
pub async fn list_connections(
    client: &impl GenericClient,
    user_id: Uuid,
) -> Result<Vec<Connection>, StoreError> {
    let sql = format!(
        "SELECT {CONNECTION_COLUMNS} FROM bitspark.connections
         WHERE user1_id = $1 OR user2_id = $1
         ORDER BY created_at DESC, id"
    );
    let rows = timed("connections.list", client.query(sql.as_str(), &[&user_id])).await?;
    rows.iter().map(connection_from_row).collect()
}

#[instrument(skip(client))]
pub async fn connections_between(
    client: &impl GenericClient,
    a: Uuid,
    b: Uuid,
) -> Result<Vec<Connection>, StoreError> {
    let sql = format!(
        "SELECT {CONNECTION_COLUMNS} FROM bitspark.connections
         WHERE (user1_id = $1 AND user2_id = $2) OR (user1_id = $2 AND user2_id = $1)
         ORDER BY created_at DESC, id"
    );
    let rows = timed("connections.between", client.query(sql.as_str(), &[&a, &b])).await?;
    rows.iter().map(connection_from_row).collect()
}

#[instrument(skip(client))]
pub async fn transition_connection(
    client: &impl GenericClient,
    id: Uuid,
    from: ConnectionStatus,
    to: ConnectionStatus,
    at: DateTime<Utc>,
) -> Result<Option<Connection>, StoreError> {
    let sql = format!(
        "UPDATE bitspark.connections
         SET status = $3, responded_at = $4
         WHERE id = $1 AND status = $2
         RETURNING {CONNECTION_COLUMNS}"
    );
    let row = timed(
        "connections.transition",
        client.query_opt(sql.as_str(), &[&id, &from.as_str(), &to.as_str(), &at]),
    )
    .await?;
    row.as_ref().map(connection_from_row).transpose()
}

/// Marks every edge between the pair as blocked; inserts a blocked friend edge
/// when none exists. Callers run this inside a transaction.
#[instrument(skip(client))]
pub async fn block_pair(
    client: &impl GenericClient,
    user_id: Uuid,
    blocked_user_id: Uuid,
    at: DateTime<Utc>,
) -> Result<Vec<Connection>, StoreError> {
    let sql = format!(
        "UPDATE bitspark.connections
         SET status = $3, responded_at = $4
         WHERE (user1_id = $1 AND user2_id = $2) OR (user1_id = $2 AND user2_id = $1)
         RETURNING {CONNECTION_COLUMNS}"
    );
    let blocked = ConnectionStatus::Blocked.as_str();
    let rows = timed(
        "connections.block_existing",
        client.query(sql.as_str(), &[&user_id, &blocked_user_id, &blocked, &at]),
    )
    .await?;
    if !rows.is_empty() {
        return rows.iter().map(connection_from_row).collect();
    }

    let sql = format!(
        "INSERT INTO bitspark.connections
            (id, user1_id, user2_id, connection_type, compatibility_score, status,
             created_at, responded_at)
         VALUES ($1, $2, $3, $4, 0, $5, $6, $6)
         RETURNING {CONNECTION_COLUMNS}"
    );
    let row = timed(
        "connections.block_insert",
        client.query_one(
            sql.as_str(),
            &[
                &Uuid::new_v4(),
                &user_id,
                &blocked_user_id,
                &ConnectionType::Friend.as_str(),
                &blocked,
                &at,
            ],
        ),
    )
    .await?;
    Ok(vec![connection_from_row(&row)?])
}
