use tracing::warn;

use crate::{
    engine::{Decision, Outcome},
    error::AuthzError,
};

/// What an enforcement policy decided to do with the request.
///
/// The policies are pure functions over [`Outcome`]; executing an action
/// (writing a status code, issuing the redirect, formatting the error) is
/// the embedding application's job, which also supplies the login
/// location for [`Action::RedirectToLogin`].
#[derive(Debug)]
pub enum Action {
    /// Check passed; hand the decision to the handler and continue.
    Continue(Decision),
    /// Terminate the request with HTTP 401 and this JSON body.
    Unauthorized(Decision),
    /// Send the caller to the login page.
    RedirectToLogin,
    /// Surface the failure to the host's error handling.
    Raise(AuthzError),
}

/// Policy for machine-readable API call sites: any failure becomes a 401.
///
/// Fails closed — when the service is unreachable the 401 body is a
/// synthesized `{"Authorized": false}`, not a passthrough. An explicit
/// denial forwards the service's full payload.
pub fn reject_or_401(outcome: Outcome) -> Action {
    match outcome {
        Outcome::Allowed(decision) => Action::Continue(decision),
        Outcome::Denied(decision) => Action::Unauthorized(decision),
        Outcome::Unreachable(err) => {
            warn!(error = %err, "authorization service unreachable, denying");
            Action::Unauthorized(Decision::denied())
        }
    }
}

/// Policy for browser call sites: any failure bounces to the login page.
pub fn redirect_or_login(outcome: Outcome) -> Action {
    match outcome {
        Outcome::Allowed(decision) => Action::Continue(decision),
        Outcome::Denied(_) => Action::RedirectToLogin,
        Outcome::Unreachable(err) => {
            warn!(error = %err, "authorization service unreachable, redirecting to login");
            Action::RedirectToLogin
        }
    }
}

/// Policy for call sites that centralize failure handling in the host.
///
/// A denial raises [`AuthzError::Denied`] with the payload; a transport
/// failure propagates as itself rather than being folded into a denial,
/// leaving the fail-open/fail-closed choice to the host's error handler.
/// The success path stays silent.
pub fn raise_on_deny(outcome: Outcome) -> Action {
    match outcome {
        Outcome::Allowed(decision) => Action::Continue(decision),
        Outcome::Denied(decision) => Action::Raise(AuthzError::Denied(decision)),
        Outcome::Unreachable(err) => Action::Raise(err),
    }
}
