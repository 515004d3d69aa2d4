use axum::extract::{Query, State};
use axum::Json;
use bs_common::api::notification::Notification;
use serde::Deserialize;
use uuid::Uuid;

use super::pagination::validate_limit;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Newest first.
pub async fn list_notifications(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    let limit = validate_limit(query.limit)?;
    Ok(Json(state.service.list_notifications(user_id, limit).await?))
}
