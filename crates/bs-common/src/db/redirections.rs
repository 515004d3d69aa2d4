use std::collections::HashMap;

use chrono::{DateTime, Utc};
use deadpool_postgres::GenericClient;
use tracing::instrument;
use uuid::Uuid;

use crate::db::parse_column;
use crate::db::util::timed;
use crate::deep_links::{Platform, PlatformRedirection};
use crate::store::StoreError;

#[instrument(skip(client))]
pub async fn record_redirection(
    client: &impl GenericClient,
    connection_id: Uuid,
    platform: Platform,
    at: DateTime<Utc>,
) -> Result<PlatformRedirection, StoreError> {
    let row = timed(
        "redirections.record",
        client.query_one(
            "INSERT INTO bitspark.platform_redirections
                (id, connection_id, platform, redirect_count, last_redirect_at)
             VALUES ($1, $2, $3, 1, $4)
             ON CONFLICT (connection_id, platform)
             DO UPDATE SET redirect_count = platform_redirections.redirect_count + 1,
                           last_redirect_at = EXCLUDED.last_redirect_at
             RETURNING id, connection_id, platform, redirect_count, last_redirect_at",
            &[&Uuid::new_v4(), &connection_id, &platform.as_str(), &at],
        ),
    )
    .await?;

    let platform: String = row.get("platform");
    Ok(PlatformRedirection {
        id: row.get("id"),
        connection_id: row.get("connection_id"),
        platform: parse_column(&platform, "platform_redirections.platform")?,
        redirect_count: row.get("redirect_count"),
        last_redirect_at: row.get("last_redirect_at"),
    })
}

#[instrument(skip(client))]
pub async fn platform_stats(
    client: &impl GenericClient,
    user_id: Uuid,
) -> Result<HashMap<Platform, i64>, StoreError> {
    let rows = timed(
        "redirections.platform_stats",
        client.query(
            "SELECT r.platform, SUM(r.redirect_count)::BIGINT AS total
             FROM bitspark.platform_redirections r
             JOIN bitspark.connections c ON c.id = r.connection_id
             WHERE c.user1_id = $1 OR c.user2_id = $1
             GROUP BY r.platform",
            &[&user_id],
        ),
    )
    .await?;

    let mut stats = HashMap::new();
    for row in &rows {
        let platform: String = row.get("platform");
        stats.insert(
            parse_column(&platform, "platform_redirections.platform")?,
            row.get::<_, i64>("total"),
        );
    }
    Ok(stats)
}
