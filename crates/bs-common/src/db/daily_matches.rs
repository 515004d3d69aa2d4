use chrono::{DateTime, NaiveDate, Utc};
use deadpool_postgres::GenericClient;
use tokio_postgres::Row;
use tracing::instrument;
use uuid::Uuid;

use crate::api::daily_match::{DailyAction, DailyMatch, NewDailyMatch};
use crate::db::util::timed;
use crate::db::{map_unique_violation, parse_optional_column};
use crate::store::StoreError;

const DAILY_MATCH_COLUMNS: &str = "id, user_id, matched_user_id, match_date, compatibility_score,
    algorithm_version, viewed, action, acted_at, created_at";

fn daily_match_from_row(row: &Row) -> Result<DailyMatch, StoreError> {
    Ok(DailyMatch {
        id: row.get("id"),
        user_id: row.get("user_id"),
        matched_user_id: row.get("matched_user_id"),
        match_date: row.get("match_date"),
        compatibility_score: row.get("compatibility_score"),
        algorithm_version: row.get("algorithm_version"),
        viewed: row.get("viewed"),
        action: parse_optional_column(row.get("action"), "daily_matches.action")?,
        acted_at: row.get("acted_at"),
        created_at: row.get("created_at"),
    })
}

#[instrument(skip(client))]
pub async fn get_for_date(
    client: &impl GenericClient,
    user_id: Uuid,
    match_date: NaiveDate,
) -> Result<Option<DailyMatch>, StoreError> {
    let sql = format!(
        "SELECT {DAILY_MATCH_COLUMNS} FROM bitspark.daily_matches
         WHERE user_id = $1 AND match_date = $2"
    );
    let row = timed(
        "daily_matches.get_for_date",
        client.query_opt(sql.as_str(), &[&user_id, &match_date]),
    )
    .await?;
    row.as_ref().map(daily_match_from_row).transpose()
}

#[instrument(skip(client))]
pub async fn get_daily_match(
    client: &impl GenericClient,
    id: Uuid,
) -> Result<Option<DailyMatch>, StoreError> {
    let sql = format!("SELECT {DAILY_MATCH_COLUMNS} FROM bitspark.daily_matches WHERE id = $1");
    let row = timed("daily_matches.get", client.query_opt(sql.as_str(), &[&id])).await?;
    row.as_ref().map(daily_match_from_row).transpose()
}

#[instrument(skip(client, new), fields(user_id = %new.user_id, match_date = %new.match_date))]
pub async fn insert_daily_match(
    client: &impl GenericClient,
    new: &NewDailyMatch,
) -> Result<DailyMatch, StoreError> {
    let sql = format!(
        "INSERT INTO bitspark.daily_matches
            (id, user_id, matched_user_id, match_date, compatibility_score, algorithm_version)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {DAILY_MATCH_COLUMNS}"
    );
    let row = timed(
        "daily_matches.insert",
        client.query_one(
            sql.as_str(),
            &[
                &Uuid::new_v4(),
                &new.user_id,
                &new.matched_user_id,
                &new.match_date,
                &new.compatibility_score,
                &new.algorithm_version,
            ],
        ),
    )
    .await
    .map_err(|err| map_unique_violation(err, "daily match"))?;
    daily_match_from_row(&row)
}

/// Overwrites an acted-upon row in place with a fresh id; the `action IS NOT
/// NULL` guard makes concurrent replacements race-free.
#[instrument(skip(client, new), fields(user_id = %new.user_id))]
pub async fn replace_acted(
    client: &impl GenericClient,
    existing_id: Uuid,
    new: &NewDailyMatch,
) -> Result<Option<DailyMatch>, StoreError> {
    let sql = format!(
        "UPDATE bitspark.daily_matches
         SET id = $2, matched_user_id = $3, match_date = $4, compatibility_score = $5,
             algorithm_version = $6, viewed = FALSE, action = NULL, acted_at = NULL,
             created_at = NOW()
         WHERE id = $1 AND action IS NOT NULL
         RETURNING {DAILY_MATCH_COLUMNS}"
    );
    let row = timed(
        "daily_matches.replace_acted",
        client.query_opt(
            sql.as_str(),
            &[
                &existing_id,
                &Uuid::new_v4(),
                &new.matched_user_id,
                &new.match_date,
                &new.compatibility_score,
                &new.algorithm_version,
            ],
        ),
    )
    .await?;
    row.as_ref().map(daily_match_from_row).transpose()
}

#[instrument(skip(client))]
pub async fn record_action(
    client: &impl GenericClient,
    id: Uuid,
    action: DailyAction,
    at: DateTime<Utc>,
) -> Result<Option<DailyMatch>, StoreError> {
    let sql = format!(
        "UPDATE bitspark.daily_matches
         SET action = $2, acted_at = $3, viewed = TRUE
         WHERE id = $1 AND action IS NULL
         RETURNING {DAILY_MATCH_COLUMNS}"
    );
    let row = timed(
        "daily_matches.record_action",
        client.query_opt(sql.as_str(), &[&id, &action.as_str(), &at]),
    )
    .await?;
    row.as_ref().map(daily_match_from_row).transpose()
}

#[instrument(skip(client))]
pub async fn list_daily_matches(
    client: &impl GenericClient,
    user_id: Uuid,
    limit: Option<usize>,
) -> Result<Vec<DailyMatch>, StoreError> {
    let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
    let sql = format!(
        "SELECT {DAILY_MATCH_COLUMNS} FROM bitspark.daily_matches
         WHERE user_id = $1
         ORDER BY match_date DESC
         LIMIT $2"
    );
    let rows = timed("daily_matches.list", client.query(sql.as_str(), &[&user_id, &limit])).await?;
    rows.iter().map(daily_match_from_row).collect()
}

#[instrument(skip(client))]
pub async fn recent_matched_user_ids(
    client: &impl GenericClient,
    user_id: Uuid,
    since: NaiveDate,
) -> Result<Vec<Uuid>, StoreError> {
    let rows = timed(
        "daily_matches.recent_matched",
        client.query(
            "SELECT matched_user_id FROM bitspark.daily_matches
             WHERE user_id = $1 AND match_date >= $2",
            &[&user_id, &since],
        ),
    )
    .await?;
    Ok(rows.iter().map(|row| row.get("matched_user_id")).collect())
}
