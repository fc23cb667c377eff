//! Tenant-partitioned bin cache
//!
//! Bins are keyed by (tenant, epinet, hour key) and stored as shared,
//! immutable snapshots. A write always replaces the whole bin. Expired bins
//! are never served; a miss means "no data for that hour" on the read path.

use chrono::{DateTime, Utc};
use epinet_common::time::parse_hour_key;
use epinet_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::HourlyBin;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BinKey {
    epinet_id: String,
    hour_key: String,
}

impl BinKey {
    fn new(epinet_id: &str, hour_key: &str) -> Self {
        Self {
            epinet_id: epinet_id.to_string(),
            hour_key: hour_key.to_string(),
        }
    }
}

type TenantBins = HashMap<BinKey, Arc<HourlyBin>>;

#[derive(Debug, Default)]
pub struct EpinetCache {
    tenants: RwLock<HashMap<String, TenantBins>>,
}

fn validate_key(tenant_id: &str, epinet_id: &str, hour_key: &str) -> Result<()> {
    if tenant_id.trim().is_empty() {
        return Err(Error::InvalidInput("Tenant id must not be empty".to_string()));
    }
    if epinet_id.trim().is_empty() {
        return Err(Error::InvalidInput("Epinet id must not be empty".to_string()));
    }
    if parse_hour_key(hour_key).is_none() {
        return Err(Error::InvalidInput(format!("Invalid hour key: {:?}", hour_key)));
    }
    Ok(())
}

impl EpinetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live bin for the key, or `None` on a miss or expiry
    pub async fn get(&self, tenant_id: &str, epinet_id: &str, hour_key: &str) -> Option<Arc<HourlyBin>> {
        self.get_at(tenant_id, epinet_id, hour_key, Utc::now()).await
    }

    pub async fn get_at(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        hour_key: &str,
        now: DateTime<Utc>,
    ) -> Option<Arc<HourlyBin>> {
        let tenants = self.tenants.read().await;
        tenants
            .get(tenant_id)?
            .get(&BinKey::new(epinet_id, hour_key))
            .filter(|bin| !bin.is_expired(now))
            .cloned()
    }

    /// Live bins for `hour_keys` under one read lock, in the given key order
    pub async fn get_range(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        hour_keys: &[String],
        now: DateTime<Utc>,
    ) -> Vec<(String, Arc<HourlyBin>)> {
        let tenants = self.tenants.read().await;
        let Some(bins) = tenants.get(tenant_id) else {
            return Vec::new();
        };
        hour_keys
            .iter()
            .filter_map(|hour_key| {
                bins.get(&BinKey::new(epinet_id, hour_key))
                    .filter(|bin| !bin.is_expired(now))
                    .map(|bin| (hour_key.clone(), bin.clone()))
            })
            .collect()
    }

    /// Replace the bin for the key
    pub async fn set(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        hour_key: &str,
        bin: HourlyBin,
    ) -> Result<()> {
        validate_key(tenant_id, epinet_id, hour_key)?;
        let mut tenants = self.tenants.write().await;
        tenants
            .entry(tenant_id.to_string())
            .or_default()
            .insert(BinKey::new(epinet_id, hour_key), Arc::new(bin));
        Ok(())
    }

    /// Replace many bins of one tenant under a single write lock
    ///
    /// All keys are validated before anything is written.
    pub async fn set_many(
        &self,
        tenant_id: &str,
        bins: Vec<(String, String, HourlyBin)>,
    ) -> Result<usize> {
        for (epinet_id, hour_key, _) in &bins {
            validate_key(tenant_id, epinet_id, hour_key)?;
        }
        let count = bins.len();
        let mut tenants = self.tenants.write().await;
        let tenant_bins = tenants.entry(tenant_id.to_string()).or_default();
        for (epinet_id, hour_key, bin) in bins {
            tenant_bins.insert(BinKey::new(&epinet_id, &hour_key), Arc::new(bin));
        }
        Ok(count)
    }

    /// Hour keys for which at least one of `epinet_ids` has no live bin
    pub async fn missing_hours(
        &self,
        tenant_id: &str,
        epinet_ids: &[String],
        hour_keys: &[String],
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let tenants = self.tenants.read().await;
        let bins = tenants.get(tenant_id);
        hour_keys
            .iter()
            .filter(|hour_key| {
                epinet_ids.iter().any(|epinet_id| {
                    bins.and_then(|b| b.get(&BinKey::new(epinet_id, hour_key)))
                        .map_or(true, |bin| bin.is_expired(now))
                })
            })
            .cloned()
            .collect()
    }

    /// Drop expired bins across all tenants, returning how many were removed
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tenants = self.tenants.write().await;
        let mut removed = 0;
        for bins in tenants.values_mut() {
            let before = bins.len();
            bins.retain(|_, bin| !bin.is_expired(now));
            removed += before - bins.len();
        }
        tenants.retain(|_, bins| !bins.is_empty());
        removed
    }

    /// Number of stored bins (live or not) for a tenant
    pub async fn len(&self, tenant_id: &str) -> usize {
        self.tenants
            .read()
            .await
            .get(tenant_id)
            .map_or(0, |bins| bins.len())
    }
}
