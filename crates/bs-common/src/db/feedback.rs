use deadpool_postgres::GenericClient;
use tokio_postgres::Row;
use tracing::instrument;
use uuid::Uuid;

use crate::api::feedback_request::Feedback;
use crate::api::feedback_response::FeedbackStatus;
use crate::db::parse_column;
use crate::db::util::timed;
use crate::store::StoreError;

fn feedback_from_row(row: &Row) -> Result<Feedback, StoreError> {
    let action: String = row.get("action");
    Ok(Feedback {
        user_id: row.get("user_id"),
        target_user_id: row.get("target_user_id"),
        action: parse_column(&action, "user_feedback.action")?,
        context: row.get("context"),
        created_at: row.get("created_at"),
    })
}

/// Last write wins per `(user_id, target_user_id)`. `xmax = 0` only holds for
/// freshly inserted tuples, which tells the two outcomes apart.
#[instrument(skip(client, feedback), fields(user_id = %feedback.user_id, target_user_id = %feedback.target_user_id))]
pub async fn upsert_feedback(
    client: &impl GenericClient,
    feedback: &Feedback,
) -> Result<FeedbackStatus, StoreError> {
    let row = timed(
        "feedback.upsert",
        client.query_one(
            "INSERT INTO bitspark.user_feedback
                (user_id, target_user_id, action, context, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             ON CONFLICT (user_id, target_user_id)
             DO UPDATE SET action = EXCLUDED.action,
                           context = EXCLUDED.context,
                           updated_at = EXCLUDED.updated_at
             RETURNING (xmax = 0) AS inserted",
            &[
                &feedback.user_id,
                &feedback.target_user_id,
                &feedback.action.as_str(),
                &feedback.context,
                &feedback.created_at,
            ],
        ),
    )
    .await?;

    let inserted: bool = row.get("inserted");
    Ok(if inserted {
        FeedbackStatus::Created
    } else {
        FeedbackStatus::Updated
    })
}

#[instrument(skip(client))]
pub async fn get_feedback(
    client: &impl GenericClient,
    user_id: Uuid,
    target_user_id: Uuid,
) -> Result<Option<Feedback>, StoreError> {
    let row = timed(
        "feedback.get",
        client.query_opt(
            "SELECT user_id, target_user_id, action, context, created_at
             FROM bitspark.user_feedback
             WHERE user_id = $1 AND target_user_id = $2",
            &[&user_id, &target_user_id],
        ),
    )
    .await?;
    row.as_ref().map(feedback_from_row).transpose()
}

#[instrument(skip(client))]
pub async fn list_by_user(
    client: &impl GenericClient,
    user_id: Uuid,
) -> Result<Vec<Feedback>, StoreError> {
    let rows = timed(
        "feedback.list_by_user",
        client.query(
            "SELECT user_id, target_user_id, action, context, created_at
             FROM bitspark.user_feedback
             WHERE user_id = $1
             ORDER BY created_at DESC",
            &[&user_id],
        ),
    )
    .await?;
    rows.iter().map(feedback_from_row).collect()
}
