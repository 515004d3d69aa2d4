use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bs_common::api::ship::{CreateShipRequest, RespondShipRequest, Ship, ShipStats};
use uuid::Uuid;

use super::UserQuery;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

pub async fn create_ship(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(request): Json<CreateShipRequest>,
) -> Result<(StatusCode, Json<Ship>), ApiError> {
    let shipper_id = auth.acting_user(request.shipper_id)?;
    let ship = state.service.create_ship(shipper_id, &request).await?;
    Ok((StatusCode::CREATED, Json(ship)))
}

/// Anonymous shippers come back as the nil id.
pub async fn received(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Ship>>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(state.service.received_ships(user_id).await?))
}

pub async fn sent(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Ship>>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(state.service.sent_ships(user_id).await?))
}

pub async fn stats(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<ShipStats>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(state.service.ship_stats(user_id).await?))
}

pub async fn respond(
    State(state): State<SharedState>,
    Path(ship_id): Path<Uuid>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
    Json(body): Json<RespondShipRequest>,
) -> Result<Json<Ship>, ApiError> {
    let user_id = auth.acting_user(query.user_id)?;
    Ok(Json(
        state
            .service
            .respond_to_ship(user_id, ship_id, body.response)
            .await?,
    ))
}
