use axum::extract::{Path, State};
use axum::Json;
use bs_common::api::feedback_request::FeedbackRequest;
use bs_common::api::feedback_response::FeedbackResponse;
use bs_common::api::recommendation::{RecommendationRequest, RecommendationResponse, MAX_COUNT};
use bs_common::api::stats::UserStats;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

pub async fn get_recommendations(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let user_id = auth.acting_user(request.user_id)?;
    if let Some(count) = request.count {
        if !(1..=MAX_COUNT).contains(&count) {
            return Err(ApiError::BadRequest(format!(
                "count must be between 1 and {MAX_COUNT}"
            )));
        }
    }

    let response = state.service.get_recommendations(user_id, &request).await?;
    bs_metrics::record_matches_served(
        request.recommendation_type.as_str(),
        response.recommendations.len(),
    );
    Ok(Json(response))
}

pub async fn submit_feedback(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let user_id = auth.acting_user(request.user_id)?;
    let response = state.service.submit_feedback(user_id, &request).await?;

    bs_metrics::record_feedback(request.action.as_str());
    if response.mutual_match {
        bs_metrics::record_connection_created("friend");
    }
    Ok(Json(response))
}

pub async fn user_stats(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<Json<UserStats>, ApiError> {
    let user_id = auth.acting_user(Some(user_id))?;
    Ok(Json(state.service.get_user_stats(user_id).await?))
}
