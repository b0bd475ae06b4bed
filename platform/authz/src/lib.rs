//! Client-side authorization against a remote tinyauth service.
//!
//! The flow: a call site names a permission (and optionally a resource),
//! the [`AuthzEngine`] wraps it in a context envelope and asks the remote
//! service over the [`AuthClient`], and one of the enforcement policies
//! maps the outcome to an [`Action`] the embedding application executes.

mod arn;
mod client;
mod enforce;
mod engine;
mod error;

pub use arn::{DEFAULT_PARTITION, DEFAULT_REGION, ServiceIdentity};
pub use client::{AuthClient, ClientConfig};
pub use enforce::{Action, raise_on_deny, redirect_or_login, reject_or_401};
pub use engine::{AuthzEngine, Decision, Outcome, Permit, RequestContext};
pub use error::AuthzError;
