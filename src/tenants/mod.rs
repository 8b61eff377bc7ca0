//! Per-tenant configuration store
//!
//! One JSON file per tenant under the configured tenants directory. Loads are
//! read-only per request; instruction updates are last-write-wins.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TenantError {
    #[error("Tenant not found: {0}")]
    NotFound(String),

    #[error("Failed to read tenant config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid tenant config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub id: String,
    pub name: String,
    pub vector_namespace: String,
    #[serde(default)]
    pub assistant_instruction: String,
}

/// Filesystem-backed store of tenant configurations.
#[derive(Debug, Clone)]
pub struct TenantStore {
    tenants_dir: PathBuf,
}

impl TenantStore {
    pub fn new(tenants_dir: impl Into<PathBuf>) -> Self {
        Self {
            tenants_dir: tenants_dir.into(),
        }
    }

    /// Load a tenant's configuration by id.
    pub async fn load(&self, tenant_id: &str) -> Result<TenantConfig, TenantError> {
        let path = self.config_path(tenant_id)?;
        if !path.exists() {
            return Err(TenantError::NotFound(tenant_id.to_string()));
        }
        let raw = tokio::fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Rewrite the assistant instruction for a tenant. Last write wins.
    pub async fn update_instruction(
        &self,
        tenant_id: &str,
        instruction: &str,
    ) -> Result<TenantConfig, TenantError> {
        let mut config = self.load(tenant_id).await?;
        config.assistant_instruction = instruction.to_string();
        let raw = serde_json::to_string_pretty(&config)?;
        tokio::fs::write(self.config_path(tenant_id)?, raw).await?;
        Ok(config)
    }

    /// Store a tenant configuration, creating the tenants directory if needed.
    pub async fn save(&self, config: &TenantConfig) -> Result<(), TenantError> {
        tokio::fs::create_dir_all(&self.tenants_dir).await?;
        let raw = serde_json::to_string_pretty(config)?;
        tokio::fs::write(self.config_path(&config.id)?, raw).await?;
        Ok(())
    }

    fn config_path(&self, tenant_id: &str) -> Result<PathBuf, TenantError> {
        // Untrusted path component: reject anything that could escape the
        // tenants directory.
        if !is_valid_tenant_id(tenant_id) {
            return Err(TenantError::NotFound(tenant_id.to_string()));
        }
        Ok(self.tenants_dir.join(format!("{tenant_id}.json")))
    }
}

pub fn is_valid_tenant_id(tenant_id: &str) -> bool {
    !tenant_id.is_empty()
        && !tenant_id.contains(['/', '\\'])
        && !tenant_id.contains("..")
        && tenant_id != "."
}
