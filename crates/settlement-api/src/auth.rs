//! The session resolver: bearer-token authentication and the
//! administrator-only route gate.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use settlement_db::AccountStore;
use settlement_types::{Account, Role};

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated session, extracted from the `Authorization: Bearer
/// <token>` header and resolved against the accounts table.
pub struct Session(pub Account);

impl<S> FromRequestParts<S> for Session
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = bearer_token(parts).ok_or(ApiError::Unauthenticated)?;

        let store = AccountStore::new(app_state.db());
        let account = store
            .find_by_auth_token(token)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        Ok(Self(account))
    }
}

/// An authenticated session known to hold the [`Role::Administrator`]
/// role, for gating the admin REST surface.
pub struct AdminSession(pub Account);

impl<S> FromRequestParts<S> for AdminSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Session(account) = Session::from_request_parts(parts, state).await?;
        if account.role != Role::Administrator {
            return Err(ApiError::NotAdmin);
        }
        Ok(Self(account))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
