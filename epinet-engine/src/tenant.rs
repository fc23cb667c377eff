//! Tenant contexts and the tenant registry
//!
//! Every engine operation receives an explicit [`TenantContext`] carrying the
//! tenant's store handle and the shared bin cache.

use epinet_common::config::{TenantEntry, TenantStatus};
use epinet_common::db::init_database;
use epinet_common::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::services::cache_store::EpinetCache;
use crate::store::{AnalyticsStore, SqliteStore};

#[derive(Clone)]
pub struct TenantContext {
    pub tenant_id: String,
    pub store: Arc<dyn AnalyticsStore>,
    pub cache: Arc<EpinetCache>,
}

impl TenantContext {
    pub fn new(
        tenant_id: impl Into<String>,
        store: Arc<dyn AnalyticsStore>,
        cache: Arc<EpinetCache>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            store,
            cache,
        }
    }
}

enum Slot {
    Ready(TenantContext),
    Inactive,
    /// Active but its store could not be opened
    Unavailable(String),
}

/// Tenant id → status, with an opened context for every reachable active tenant
pub struct TenantRegistry {
    tenants: BTreeMap<String, Slot>,
}

impl TenantRegistry {
    /// Open the database of every active tenant
    ///
    /// A tenant whose database fails to open stays registered as unavailable
    /// so that warming reports it as failed instead of silently skipping it.
    pub async fn open(entries: &[TenantEntry], cache: Arc<EpinetCache>) -> Self {
        let mut tenants = BTreeMap::new();
        for entry in entries {
            let slot = match entry.status {
                TenantStatus::Inactive => Slot::Inactive,
                TenantStatus::Active => match init_database(&entry.database).await {
                    Ok(pool) => {
                        info!(tenant_id = %entry.id, "Tenant database ready");
                        Slot::Ready(TenantContext::new(
                            entry.id.clone(),
                            Arc::new(SqliteStore::new(pool)),
                            cache.clone(),
                        ))
                    }
                    Err(e) => {
                        error!(tenant_id = %entry.id, error = %e, "Failed to open tenant database");
                        Slot::Unavailable(e.to_string())
                    }
                },
            };
            tenants.insert(entry.id.clone(), slot);
        }
        Self { tenants }
    }

    /// Registry over already-built contexts, all active
    pub fn from_contexts(contexts: impl IntoIterator<Item = TenantContext>) -> Self {
        Self {
            tenants: contexts
                .into_iter()
                .map(|ctx| (ctx.tenant_id.clone(), Slot::Ready(ctx)))
                .collect(),
        }
    }

    /// Register an inactive tenant id
    pub fn with_inactive(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenants.insert(tenant_id.into(), Slot::Inactive);
        self
    }

    pub fn get(&self, tenant_id: &str) -> Result<&TenantContext> {
        match self.tenants.get(tenant_id) {
            Some(Slot::Ready(ctx)) => Ok(ctx),
            Some(Slot::Inactive) => Err(Error::InvalidInput(format!(
                "Tenant is inactive: {}",
                tenant_id
            ))),
            Some(Slot::Unavailable(reason)) => Err(Error::Internal(format!(
                "Tenant store unavailable: {}: {}",
                tenant_id, reason
            ))),
            None => Err(Error::NotFound(format!("Tenant: {}", tenant_id))),
        }
    }

    /// Contexts of active tenants whose store is open
    pub fn active(&self) -> Vec<TenantContext> {
        self.tenants
            .values()
            .filter_map(|slot| match slot {
                Slot::Ready(ctx) => Some(ctx.clone()),
                _ => None,
            })
            .collect()
    }

    /// Active tenants that could not be opened, with the reason
    pub fn unavailable(&self) -> Vec<(String, String)> {
        self.tenants
            .iter()
            .filter_map(|(id, slot)| match slot {
                Slot::Unavailable(reason) => Some((id.clone(), reason.clone())),
                _ => None,
            })
            .collect()
    }
}
