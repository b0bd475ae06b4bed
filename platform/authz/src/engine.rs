use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::{arn::ServiceIdentity, client::AuthClient, error::AuthzError};

/// Verbatim decision payload from the remote service.
///
/// Beyond the `Authorized` flag the service may attach arbitrary fields
/// (reason codes and the like); they are carried through untouched so a
/// rejection response can forward them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decision(pub Map<String, Value>);

impl Decision {
    pub fn allowed() -> Self {
        let mut map = Map::new();
        map.insert("Authorized".to_string(), Value::Bool(true));
        Self(map)
    }

    pub fn denied() -> Self {
        let mut map = Map::new();
        map.insert("Authorized".to_string(), Value::Bool(false));
        Self(map)
    }

    /// True only when the service said `Authorized: true`; a missing or
    /// non-boolean field counts as a denial.
    pub fn is_authorized(&self) -> bool {
        matches!(self.0.get("Authorized"), Some(Value::Bool(true)))
    }
}

/// Facts about the inbound request that are forwarded to the service:
/// the caller's address and the raw headers in wire order.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub source_ip: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// One permission check: the permission name, the resource it applies to,
/// and any extra context the call site wants evaluated.
#[derive(Clone, Debug)]
pub struct Permit<'a> {
    permission: &'a str,
    resource_class: Option<&'a str>,
    resource_key: &'a str,
    context: Map<String, Value>,
}

impl<'a> Permit<'a> {
    pub fn new(permission: &'a str) -> Self {
        Self {
            permission,
            resource_class: None,
            resource_key: "",
            context: Map::new(),
        }
    }

    /// Scope the check to one resource. Without this the check runs against
    /// the namespace root.
    pub fn resource(mut self, class: &'a str, key: &'a str) -> Self {
        self.resource_class = Some(class);
        self.resource_key = key;
        self
    }

    /// Add a context entry. Caller entries win over the built-in
    /// `SourceIp` / `RequestDateTime` pair on conflict.
    pub fn context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// Result of one authorization check.
#[derive(Debug)]
pub enum Outcome {
    /// The service granted the permission; the decision payload rides along.
    Allowed(Decision),
    /// The service answered and did not grant it.
    Denied(Decision),
    /// No decision exists: the service could not be reached.
    Unreachable(AuthzError),
}

/// The decision pipeline: resource naming, context assembly, and the
/// remote permission check.
pub struct AuthzEngine {
    identity: ServiceIdentity,
    client: AuthClient,
    bypass: bool,
}

impl AuthzEngine {
    pub fn new(identity: ServiceIdentity, client: AuthClient, bypass: bool) -> Self {
        Self {
            identity,
            client,
            bypass,
        }
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// Ask the remote service whether `permit` is granted for the caller
    /// described by `request`.
    ///
    /// In bypass mode this short-circuits to an allow before any network
    /// activity. Transport failures surface as [`Outcome::Unreachable`];
    /// there are no retries.
    pub async fn authorize(&self, permit: Permit<'_>, request: &RequestContext) -> Outcome {
        if self.bypass {
            debug!(permission = permit.permission, "authorization bypassed");
            return Outcome::Allowed(Decision::allowed());
        }

        let body = self.request_body(&permit, request);
        match self.client.call("authorize-by-token", &body).await {
            Ok(response) => {
                let decision = Decision(response);
                if decision.is_authorized() {
                    Outcome::Allowed(decision)
                } else {
                    Outcome::Denied(decision)
                }
            }
            Err(err) => Outcome::Unreachable(err),
        }
    }

    fn request_body(&self, permit: &Permit<'_>, request: &RequestContext) -> Value {
        let resource_arn = match permit.resource_class {
            Some(class) => self.identity.format(class, permit.resource_key),
            None => self.identity.base(),
        };

        let mut context = Map::new();
        context.insert(
            "SourceIp".to_string(),
            match &request.source_ip {
                Some(ip) => Value::String(ip.clone()),
                None => Value::Null,
            },
        );
        context.insert(
            "RequestDateTime".to_string(),
            Value::String(utc_timestamp()),
        );
        for (key, value) in &permit.context {
            context.insert(key.clone(), value.clone());
        }

        // Exactly one resource name per permission in this protocol version.
        let mut permit_map = Map::new();
        permit_map.insert(
            permit.permission.to_string(),
            Value::Array(vec![Value::String(resource_arn)]),
        );

        json!({
            "permit": permit_map,
            "headers": request.headers,
            "context": context,
        })
    }
}

/// ISO-8601 UTC instant without an offset suffix, microsecond precision.
fn utc_timestamp() -> String {
    Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;

    fn engine(bypass: bool) -> AuthzEngine {
        let client = AuthClient::new(ClientConfig {
            // A closed port: any attempt to actually call out fails fast.
            endpoint: "http://127.0.0.1:1".into(),
            service: "test".into(),
            access_key_id: "root".into(),
            secret_access_key: "password".into(),
        });
        AuthzEngine::new(ServiceIdentity::new("test"), client, bypass)
    }

    #[tokio::test]
    async fn bypass_allows_without_network() {
        let outcome = engine(true)
            .authorize(
                Permit::new("TestPermission").resource("res_class", "res_key"),
                &RequestContext::default(),
            )
            .await;
        match outcome {
            Outcome::Allowed(decision) => assert_eq!(decision, Decision::allowed()),
            other => panic!("expected Allowed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_reported() {
        let outcome = engine(false)
            .authorize(Permit::new("TestPermission"), &RequestContext::default())
            .await;
        assert!(matches!(outcome, Outcome::Unreachable(err) if err.is_transport()));
    }

    #[test]
    fn permit_field_carries_a_single_arn() {
        let body = engine(false).request_body(
            &Permit::new("TestPermission").resource("res_class", "res_key"),
            &RequestContext::default(),
        );
        assert_eq!(
            body["permit"],
            json!({ "TestPermission": ["tinyauth:test:default::res_class/res_key"] })
        );
    }

    #[test]
    fn bare_permit_targets_the_namespace_root() {
        let body = engine(false).request_body(
            &Permit::new("TestPermission"),
            &RequestContext::default(),
        );
        assert_eq!(
            body["permit"],
            json!({ "TestPermission": ["tinyauth:test:default::"] })
        );
    }

    #[test]
    fn context_carries_source_ip_and_timestamp() {
        let request = RequestContext {
            source_ip: Some("192.0.2.7".into()),
            headers: vec![("host".into(), "example.test".into())],
        };
        let body = engine(false).request_body(&Permit::new("P"), &request);
        assert_eq!(body["context"]["SourceIp"], json!("192.0.2.7"));
        assert!(body["context"]["RequestDateTime"].is_string());
        assert_eq!(body["headers"], json!([["host", "example.test"]]));
    }

    #[test]
    fn caller_context_overrides_builtins() {
        let request = RequestContext {
            source_ip: Some("192.0.2.7".into()),
            headers: vec![],
        };
        let permit = Permit::new("P")
            .context("SourceIp", json!("10.0.0.9"))
            .context("Tenant", json!("acme"));
        let body = engine(false).request_body(&permit, &request);
        assert_eq!(body["context"]["SourceIp"], json!("10.0.0.9"));
        assert_eq!(body["context"]["Tenant"], json!("acme"));
    }

    #[test]
    fn missing_authorized_field_counts_as_denied() {
        assert!(!Decision::default().is_authorized());
        let mut map = Map::new();
        map.insert("Authorized".to_string(), json!("yes"));
        assert!(!Decision(map).is_authorized());
        assert!(Decision::allowed().is_authorized());
        assert!(!Decision::denied().is_authorized());
    }
}
