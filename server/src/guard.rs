use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tinyauth_authz::{Action, Decision};

use crate::http::{HttpError, LOGIN_PATH, found};

/// Execute a policy action: hand the decision back to the handler when the
/// request may continue, or produce the terminating response.
pub fn apply(action: Action) -> Result<Decision, Response> {
    match action {
        Action::Continue(decision) => Ok(decision),
        Action::Unauthorized(body) => Err((StatusCode::UNAUTHORIZED, Json(body)).into_response()),
        Action::RedirectToLogin => Err(found(LOGIN_PATH)),
        Action::Raise(err) => Err(HttpError::from(err).into_response()),
    }
}
