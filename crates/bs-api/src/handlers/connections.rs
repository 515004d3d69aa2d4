use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bs_common::api::connection::{
    BlockRequest, Connection, ConnectionStats, ConnectionView, CreateConnectionRequest,
    CreateConnectionResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserQuery;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub other_user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub connected: bool,
}

/// `201` when a new request was opened, `200` when it already existed.
pub async fn create_connection(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(request): Json<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<CreateConnectionResponse>), ApiError> {
    let user_id = auth.acting_user(request.user_id)?;
    let response = state.service.create_connection(user_id, &request).await?;

    let status = if response.created {
        bs_metrics::record_connection_created(response.connection.connection_type.as_str());
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

pub async fn list_connections(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<ConnectionView>>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(state.service.list_connections(user_id).await?))
}

pub async fn pending_requests(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<ConnectionView>>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(state.service.pending_requests(user_id).await?))
}

pub async fn stats(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<ConnectionStats>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(state.service.connection_stats(user_id).await?))
}

pub async fn check(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckResponse>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    let connected = state
        .service
        .are_users_connected(user_id, query.other_user_id)
        .await?;
    Ok(Json(CheckResponse { connected }))
}

pub async fn accept(
    State(state): State<SharedState>,
    Path(connection_id): Path<Uuid>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Connection>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(
        state.service.accept_connection(user_id, connection_id).await?,
    ))
}

pub async fn decline(
    State(state): State<SharedState>,
    Path(connection_id): Path<Uuid>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Connection>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(
        state.service.decline_connection(user_id, connection_id).await?,
    ))
}

pub async fn block_user(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(request): Json<BlockRequest>,
) -> Result<Json<Vec<Connection>>, ApiError> {
    let user_id = auth.acting_user(request.user_id)?;
    if request.blocked_user_id == user_id {
        return Err(ApiError::BadRequest("cannot block yourself".into()));
    }
    Ok(Json(
        state.service.block_user(user_id, request.blocked_user_id).await?,
    ))
}
