use axum::{extract::State, Json};
use bs_common::api::match_request::MatchRequest;
use bs_common::api::match_response::MatchResponse;

use super::pagination::validate_limit;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

pub async fn get_matches(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    let user_id = auth.acting_user(request.user_id)?;
    validate_limit(request.max_results)?;

    let response = state.service.get_matches(user_id, &request).await?;
    bs_metrics::record_matches_served(request.connection_type.as_str(), response.matches.len());
    Ok(Json(response))
}
