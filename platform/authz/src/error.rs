use thiserror::Error;

use crate::engine::Decision;

/// Failure modes of the remote authorization exchange.
///
/// `Unreachable` and `Malformed` are transport-level and originate only in
/// the client; the fail-closed enforcement policies turn both into a
/// denial. `Denied` carries the remote decision payload and is produced by
/// the raise policy when the service answered with an explicit rejection.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("tinyauth endpoint unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("malformed response from tinyauth service: {0}")]
    Malformed(#[source] reqwest::Error),
    #[error("authorization denied")]
    Denied(Decision),
}

impl AuthzError {
    /// True for failures where no decision from the service exists at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Malformed(_))
    }
}
