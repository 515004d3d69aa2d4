use axum::extract::{Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bs_common::identity::{CallbackIdentity, CallbackOutcome};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{authorize_api_key, bearer_token, decode_user_token, AuthMode};
use crate::error::ApiError;
use crate::SharedState;

pub const SESSION_COOKIE: &str = "bs_session";

/// Provider redirect parameters. `user_id` and `email` are only read from
/// trusted API-key callers; token callers carry them in the token.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
}

fn identity_from_request(
    state: &SharedState,
    headers: &HeaderMap,
    query: &CallbackQuery,
) -> Result<CallbackIdentity, ApiError> {
    if query.error.is_some() {
        return Ok(CallbackIdentity::ProviderError);
    }

    let auth = &state.config.auth;
    match auth.mode {
        AuthMode::Jwt => match bearer_token(headers)? {
            None => Ok(CallbackIdentity::Anonymous),
            Some(token) => match decode_user_token(token, auth) {
                Ok((user_id, Some(email))) => Ok(CallbackIdentity::Authenticated { user_id, email }),
                Ok((_, None)) => Ok(CallbackIdentity::ProviderError),
                Err(err) => {
                    warn!(error = %err, "callback_token_rejected");
                    Ok(CallbackIdentity::ProviderError)
                }
            },
        },
        AuthMode::ApiKey => {
            authorize_api_key(headers, auth)?;
            match (query.user_id, query.email.as_deref()) {
                (Some(user_id), Some(email)) => Ok(CallbackIdentity::Authenticated {
                    user_id,
                    email: email.to_string(),
                }),
                _ => Ok(CallbackIdentity::Anonymous),
            }
        }
    }
}

fn redirect(origin: &str, outcome: CallbackOutcome) -> Response {
    let location = format!("{origin}{}", outcome.path());
    if outcome.clears_session() {
        let cookie = format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
        return (
            StatusCode::SEE_OTHER,
            [(LOCATION, location), (SET_COOKIE, cookie)],
        )
            .into_response();
    }
    (StatusCode::SEE_OTHER, [(LOCATION, location)]).into_response()
}

/// Post sign-in gate: sends the browser to onboarding, the dashboard or back
/// to sign-in.
pub async fn auth_callback(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let identity = identity_from_request(&state, &headers, &query)?;
    let outcome = state.service.resolve_callback(&identity).await?;
    info!(outcome = outcome.path(), "auth_callback");
    Ok(redirect(&state.config.app_origin, outcome))
}
