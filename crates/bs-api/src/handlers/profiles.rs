use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bs_common::api::profile_request::{CreateProfileRequest, ProfilePatch};
use bs_common::UserProfile;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AuthUser, Principal};
use crate::error::ApiError;
use crate::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateProfileBody {
    /// Identity-provider user id; service callers may omit it to mint one.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(flatten)]
    pub request: CreateProfileRequest,
}

pub async fn create_profile(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(body): Json<CreateProfileBody>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let user_id = match (&auth.principal, body.user_id) {
        (Principal::Service, None) => Uuid::new_v4(),
        _ => auth.acting_user(body.user_id)?,
    };
    let profile = state.service.create_profile(user_id, &body.request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn get_profile(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    auth: AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user_id = auth.acting_user(Some(user_id))?;
    Ok(Json(state.service.get_profile(user_id).await?))
}

/// Onboarding and settings edits. Completing the required fields lifts the
/// onboarding gate.
pub async fn update_profile(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    auth: AuthUser,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<UserProfile>, ApiError> {
    let user_id = auth.acting_user(Some(user_id))?;
    Ok(Json(state.service.update_profile(user_id, &patch).await?))
}
