use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use tokio_postgres::Row;
use tracing::instrument;
use uuid::Uuid;

use crate::api::ship::{NewShip, Ship, ShipStatus};
use crate::db::util::timed;
use crate::db::{map_unique_violation, parse_column};
use crate::store::StoreError;

const SHIP_COLUMNS: &str =
    "id, shipper_id, user1_id, user2_id, message, is_anonymous, status, created_at, responded_at";

fn ship_from_row(row: &Row) -> Result<Ship, StoreError> {
    let status: String = row.get("status");
    Ok(Ship {
        id: row.get("id"),
        shipper_id: row.get("shipper_id"),
        user1_id: row.get("user1_id"),
        user2_id: row.get("user2_id"),
        message: row.get("message"),
        is_anonymous: row.get("is_anonymous"),
        status: parse_column(&status, "ships.status")?,
        created_at: row.get("created_at"),
        responded_at: row.get("responded_at"),
    })
}

#[instrument(skip(client, ship), fields(shipper_id = %ship.shipper_id))]
pub async fn insert_ship(client: &impl GenericClient, ship: &NewShip) -> Result<Ship, StoreError> {
    let sql = format!(
        "INSERT INTO bitspark.ships
            (id, shipper_id, user1_id, user2_id, message, is_anonymous, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {SHIP_COLUMNS}"
    );
    let row = timed(
        "ships.insert",
        client.query_one(
            sql.as_str(),
            &[
                &Uuid::new_v4(),
                &ship.shipper_id,
                &ship.user1_id,
                &ship.user2_id,
                &ship.message,
                &ship.is_anonymous,
                &ShipStatus::Pending.as_str(),
            ],
        ),
    )
    .await
    .map_err(|err| map_unique_violation(err, "ship"))?;
    ship_from_row(&row)
}

#[instrument(skip(client))]
pub async fn get_ship(client: &impl GenericClient, id: Uuid) -> Result<Option<Ship>, StoreError> {
    let sql = format!("SELECT {SHIP_COLUMNS} FROM bitspark.ships WHERE id = $1");
    let row = timed("ships.get", client.query_opt(sql.as_str(), &[&id])).await?;
    row.as_ref().map(ship_from_row).transpose()
}

#[instrument(skip(client))]
pub async fn respond_ship(
    client: &impl GenericClient,
    id: Uuid,
    status: ShipStatus,
    at: DateTime<Utc>,
) -> Result<Option<Ship>, StoreError> {
    let sql = format!(
        "UPDATE bitspark.ships
         SET status = $2, responded_at = $3
         WHERE id = $1 AND status = 'pending'
         RETURNING {SHIP_COLUMNS}"
    );
    let row = timed(
        "ships.respond",
        client.query_opt(sql.as_str(), &[&id, &status.as_str(), &at]),
    )
    .await?;
    row.as_ref().map(ship_from_row).transpose()
}

#[instrument(skip(client))]
pub async fn list_received(
    client: &impl GenericClient,
    user_id: Uuid,
) -> Result<Vec<Ship>, StoreError> {
    let sql = format!(
        "SELECT {SHIP_COLUMNS} FROM bitspark.ships
         WHERE user1_id = $1 OR user2_id = $1
         ORDER BY created_at DESC"
    );
    let rows = timed("ships.list_received", client.query(sql.as_str(), &[&user_id])).await?;
    rows.iter().map(ship_from_row).collect()
}

#[instrument(skip(client))]
pub async fn list_sent(client: &impl GenericClient, user_id: Uuid) -> Result<Vec<Ship>, StoreError> {
    let sql = format!(
        "SELECT {SHIP_COLUMNS} FROM bitspark.ships
         WHERE shipper_id = $1
         ORDER BY created_at DESC"
    );
    let rows = timed("ships.list_sent", client.query(sql.as_str(), &[&user_id])).await?;
    rows.iter().map(ship_from_row).collect()
}
