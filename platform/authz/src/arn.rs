use serde::{Deserialize, Serialize};

pub const DEFAULT_PARTITION: &str = "tinyauth";
pub const DEFAULT_REGION: &str = "default";

/// Namespace a process checks permissions under.
///
/// Read-only after startup; every resource name the process emits is scoped
/// by one identity.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServiceIdentity {
    pub partition: String,
    pub service: String,
    pub region: String,
}

impl ServiceIdentity {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            partition: DEFAULT_PARTITION.to_string(),
            service: service.into(),
            region: DEFAULT_REGION.to_string(),
        }
    }

    /// Namespace root, `partition:service:region::`.
    ///
    /// The trailing `::` is the namespace separator plus the empty account
    /// field of the resource-name grammar; callers match on it exactly.
    pub fn base(&self) -> String {
        format!("{}:{}:{}::", self.partition, self.service, self.region)
    }

    /// Resource name for a class/key pair: `base() + class + "/" + key`.
    ///
    /// An empty key keeps the trailing slash (`class/`), never a bare class.
    pub fn format(&self, resource_class: &str, resource_key: &str) -> String {
        format!("{}{}/{}", self.base(), resource_class, resource_key)
    }
}
