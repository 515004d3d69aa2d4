use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use bs_common::deep_links::{DeepLink, Platform};
use serde::Deserialize;
use uuid::Uuid;

use super::UserQuery;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

#[derive(Debug, Deserialize)]
pub struct DeepLinkQuery {
    pub platform: Platform,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub platform: Platform,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

pub async fn deep_link(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Query(query): Query<DeepLinkQuery>,
) -> Json<DeepLink> {
    Json(state.service.deep_link(
        query.platform,
        query.handle.as_deref(),
        query.message.as_deref(),
    ))
}

/// Continue an accepted connection on another messenger; every call is
/// counted per platform.
pub async fn invite(
    State(state): State<SharedState>,
    Path(connection_id): Path<Uuid>,
    auth: AuthUser,
    Json(request): Json<InviteRequest>,
) -> Result<Json<DeepLink>, ApiError> {
    let user_id = auth.acting_user(request.user_id)?;
    let link = state
        .service
        .create_platform_invitation(
            user_id,
            connection_id,
            request.platform,
            request.handle.as_deref(),
            request.message.as_deref(),
        )
        .await?;
    Ok(Json(link))
}

pub async fn platform_stats(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<HashMap<Platform, i64>>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(state.service.platform_stats(user_id).await?))
}
