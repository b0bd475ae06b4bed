use anyhow::{Result, anyhow};
use tinyauth_authz::{ClientConfig, DEFAULT_PARTITION, DEFAULT_REGION, ServiceIdentity};

/// Process-wide configuration, read from the environment once at startup
/// and immutable afterwards.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub identity: ServiceIdentity,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bypass: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let service = env_required("TINYAUTH_SERVICE")?;
        let endpoint = env_required("TINYAUTH_ENDPOINT")?;
        let access_key_id = env_required("TINYAUTH_ACCESS_KEY_ID")?;
        let secret_access_key = env_required("TINYAUTH_SECRET_ACCESS_KEY")?;

        let partition = std::env::var("TINYAUTH_PARTITION")
            .unwrap_or_else(|_| DEFAULT_PARTITION.to_string());
        let region =
            std::env::var("TINYAUTH_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());

        let bypass = std::env::var("TINYAUTH_BYPASS")
            .ok()
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            identity: ServiceIdentity {
                partition,
                service,
                region,
            },
            endpoint,
            access_key_id,
            secret_access_key,
            bypass,
            cors_allowed_origins,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.clone(),
            service: self.identity.service.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        }
    }
}

fn env_required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing env {}", key))
}
