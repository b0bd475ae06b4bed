use reqwest::header;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::AuthzError;

/// Endpoint and static credentials for the remote tinyauth service.
///
/// The access key pair is presented as HTTP basic auth on every call.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoint: String,
    pub service: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Sole transport to the remote tinyauth service.
///
/// Wraps one long-lived connection pool for the process lifetime; clones
/// share it. Carries no per-request state, so it is safe to use from any
/// number of in-flight requests.
#[derive(Clone, Debug)]
pub struct AuthClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl AuthClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// POST a JSON body to one of the service APIs and decode the JSON
    /// response object.
    ///
    /// HTTP error statuses are not special-cased: the body is decoded and
    /// handed back for the caller to inspect. The only failures raised here
    /// are transport-level — the service could not be reached, or what came
    /// back was not a JSON object.
    pub async fn call<B>(&self, api: &str, body: &B) -> Result<Map<String, Value>, AuthzError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(api);
        debug!(%url, "calling tinyauth service");
        let response = self
            .http
            .post(&url)
            .basic_auth(
                &self.config.access_key_id,
                Some(&self.config.secret_access_key),
            )
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(AuthzError::Unreachable)?;
        response.json().await.map_err(AuthzError::Malformed)
    }

    fn url(&self, api: &str) -> String {
        format!(
            "{}/api/v1/services/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.service,
            api
        )
    }
}
