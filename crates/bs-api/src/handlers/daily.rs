use axum::extract::{Path, Query, State};
use axum::Json;
use bs_common::api::daily_match::{
    DailyMatchStats, DailyMatchView, RecordActionRequest, RecordActionResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pagination::validate_limit;
use super::UserQuery;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StreakResponse {
    pub user_id: Uuid,
    pub streak: u32,
}

fn count_generated(view: &Option<DailyMatchView>, started: DateTime<Utc>) {
    if view
        .as_ref()
        .is_some_and(|view| view.daily_match.created_at >= started)
    {
        bs_metrics::record_daily_match_generated();
    }
}

/// Today's match; the first call of the day draws one. `null` when nobody is
/// eligible.
pub async fn todays_match(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Option<DailyMatchView>>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    let started = Utc::now();
    let view = state.service.get_todays_match(user_id).await?;
    count_generated(&view, started);
    Ok(Json(view))
}

pub async fn generate(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Option<DailyMatchView>>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    let started = Utc::now();
    let view = state.service.generate_daily_match(user_id).await?;
    count_generated(&view, started);
    Ok(Json(view))
}

pub async fn record_action(
    State(state): State<SharedState>,
    Path(match_id): Path<Uuid>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
    Json(body): Json<RecordActionRequest>,
) -> Result<Json<RecordActionResponse>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    let response = state
        .service
        .record_action(user_id, match_id, body.action)
        .await?;
    Ok(Json(response))
}

pub async fn history(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DailyMatchView>>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    let limit = validate_limit(query.limit)?;
    Ok(Json(state.service.get_match_history(user_id, limit).await?))
}

pub async fn streak(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<StreakResponse>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    let streak = state.service.get_user_streak(user_id).await?;
    Ok(Json(StreakResponse { user_id, streak }))
}

pub async fn stats(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<DailyMatchStats>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(state.service.get_daily_match_stats(user_id).await?))
}
