use deadpool_postgres::GenericClient;
use tokio_postgres::Row;
use tracing::instrument;
use uuid::Uuid;

use crate::api::notification::{NewNotification, Notification};
use crate::db::parse_column;
use crate::db::util::timed;
use crate::store::StoreError;

fn notification_from_row(row: &Row) -> Result<Notification, StoreError> {
    let kind: String = row.get("kind");
    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: parse_column(&kind, "notifications.kind")?,
        title: row.get("title"),
        message: row.get("message"),
        data: row.get("data"),
        read: row.get("read"),
        created_at: row.get("created_at"),
    })
}

#[instrument(skip(client, notification), fields(user_id = %notification.user_id, kind = notification.kind.as_str()))]
pub async fn insert_notification(
    client: &impl GenericClient,
    notification: &NewNotification,
) -> Result<Notification, StoreError> {
    let row = timed(
        "notifications.insert",
        client.query_one(
            "INSERT INTO bitspark.notifications (id, user_id, kind, title, message, data)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, user_id, kind, title, message, data, read, created_at",
            &[
                &Uuid::new_v4(),
                &notification.user_id,
                &notification.kind.as_str(),
                &notification.title,
                &notification.message,
                &notification.data,
            ],
        ),
    )
    .await?;
    notification_from_row(&row)
}

#[instrument(skip(client))]
pub async fn list_notifications(
    client: &impl GenericClient,
    user_id: Uuid,
    limit: usize,
) -> Result<Vec<Notification>, StoreError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = timed(
        "notifications.list",
        client.query(
            "SELECT id, user_id, kind, title, message, data, read, created_at
             FROM bitspark.notifications
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
            &[&user_id, &limit],
        ),
    )
    .await?;
    rows.iter().map(notification_from_row).collect()
}
