use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::auth::{bearer_token, Claims, Permission};
use crate::database::models::User;
use crate::database::NewUser;
use crate::error::ApiError;
use crate::middleware::guard::authorize;
use crate::state::AppState;

/// Verified caller and their local user record
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub claims: Claims,
    pub user: User,
}

impl CurrentUser {
    /// Routes that name a subject in the path may only act on the caller
    pub fn ensure_subject(&self, sub: &str) -> Result<(), ApiError> {
        if self.claims.sub != sub {
            warn!("Subject {} attempted to act as {}", self.claims.sub, sub);
            return Err(ApiError::forbidden("Cannot modify another user's lists"));
        }
        Ok(())
    }
}

/// Authentication middleware: verifies the bearer token, checks every
/// permission in `required` and only then provisions the local user.
pub async fn authenticate(
    required: &'static [Permission],
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;

    let claims = state.verifier.verify(token).map_err(|e| {
        warn!("Rejected credential: {}", e);
        e
    })?;

    authorize(&claims, required)?;

    let user = state.store.ensure_user(&NewUser::from_claims(&claims)).await?;
    debug!("Authenticated {} as user {}", claims.sub, user.id);

    request.extensions_mut().insert(CurrentUser { claims, user });
    Ok(next.run(request).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::invalid_credential("Authorization header is expected"))
    }
}
