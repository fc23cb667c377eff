//! Epinet bin warming
//!
//! Two write paths populate the cache:
//! - **Full backfill** over a fixed window, split into batches when the
//!   estimated event volume exceeds a threshold (bounds query size and peak
//!   memory for high-volume tenants).
//! - **Catch-up** for an explicit list of missing hour keys, fetching events
//!   once from the oldest requested hour to now.
//!
//! Every written bin is a full recompute from source, so overlapping passes
//! over the same hour converge on the same value (last write wins).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use epinet_common::config::WarmingConfig;
use epinet_common::time::{
    hour_key, hour_keys_back, hour_keys_in_span, parse_hour_key, truncate_to_hour,
};
use epinet_common::{Error, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::models::{ContentIndex, FunnelDefinition};
use crate::services::bin_builder::build_bin;
use crate::services::event_fetcher::fetch_events;
use crate::services::hour_grouper::group_by_hour;
use crate::services::rule_analyzer::analyze_all;
use crate::tenant::{TenantContext, TenantRegistry};

/// Half-open time span processed as one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Outcome of one tenant warming pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmStats {
    pub epinets: usize,
    pub batches: usize,
    pub bins_written: usize,
    pub events: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantFailure {
    pub tenant_id: String,
    pub error: String,
}

/// Outcome of warming every active tenant
#[derive(Debug, Clone, Default, Serialize)]
pub struct WarmReport {
    pub succeeded: usize,
    pub failures: Vec<TenantFailure>,
}

impl WarmReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Success count, or an error naming the failed tenants
    pub fn into_result(self) -> Result<usize> {
        if self.failures.is_empty() {
            return Ok(self.succeeded);
        }
        let failed: Vec<&str> = self.failures.iter().map(|f| f.tenant_id.as_str()).collect();
        Err(Error::Internal(format!(
            "Warming failed for {} tenant(s) ({} succeeded): {}",
            failed.len(),
            self.succeeded,
            failed.join(", ")
        )))
    }
}

pub struct WarmingOrchestrator {
    config: WarmingConfig,
}

impl WarmingOrchestrator {
    pub fn new(config: WarmingConfig) -> Self {
        Self { config }
    }

    /// Short TTL for the current (or a future) hour, long TTL for elapsed hours
    pub fn ttl_for(&self, hour_key: &str, now: DateTime<Utc>) -> Duration {
        match parse_hour_key(hour_key) {
            Some(start) if start < truncate_to_hour(now) => {
                Duration::from_secs(self.config.past_hour_ttl_secs)
            }
            _ => Duration::from_secs(self.config.current_hour_ttl_secs),
        }
    }

    /// Backfill window ending with the current hour
    pub fn window(&self, now: DateTime<Utc>) -> BatchSpan {
        let end = truncate_to_hour(now) + ChronoDuration::hours(1);
        let start = end - ChronoDuration::hours(i64::from(self.config.window_hours));
        BatchSpan { start, end }
    }

    /// Split `window` into batches, newest first, when `estimate` exceeds the threshold
    pub fn plan_batches(&self, window: BatchSpan, estimate: i64) -> Vec<BatchSpan> {
        if estimate <= self.config.batch_threshold_events {
            return vec![window];
        }

        let step = ChronoDuration::hours(i64::from(self.config.batch_hours.max(1)));
        let mut batches = Vec::new();
        let mut batch_end = window.end;
        while batch_end > window.start {
            let batch_start = (batch_end - step).max(window.start);
            batches.push(BatchSpan {
                start: batch_start,
                end: batch_end,
            });
            batch_end = batch_start;
        }
        batches
    }

    /// Warm every active tenant independently
    ///
    /// One tenant's failure is recorded and does not stop the others.
    pub async fn warm_all_tenants(&self, registry: &TenantRegistry) -> WarmReport {
        let mut report = WarmReport::default();

        for (tenant_id, reason) in registry.unavailable() {
            report.failures.push(TenantFailure {
                tenant_id,
                error: reason,
            });
        }

        let contexts = registry.active();
        if contexts.is_empty() {
            info!("No active tenants to warm");
        }

        let results: Vec<(String, Result<WarmStats>)> = stream::iter(contexts)
            .map(|ctx| self.warm_owned(ctx))
            .buffer_unordered(self.config.max_concurrent_tenants.max(1))
            .collect()
            .await;

        for (tenant_id, result) in results {
            match result {
                Ok(_) => report.succeeded += 1,
                Err(e) => {
                    error!(tenant_id = %tenant_id, error = %e, "Tenant warming failed");
                    report.failures.push(TenantFailure {
                        tenant_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        report.failures.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));

        info!(
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "Tenant warming complete"
        );
        report
    }

    /// Maintenance pass over every active tenant, one at a time
    pub async fn refresh_all_tenants(
        &self,
        registry: &TenantRegistry,
        now: DateTime<Utc>,
    ) -> WarmReport {
        let mut report = WarmReport::default();
        for ctx in registry.active() {
            match self.refresh_tenant_at(&ctx, now).await {
                Ok(stats) => {
                    debug!(
                        tenant_id = %ctx.tenant_id,
                        bins = stats.bins_written,
                        "Refresh pass stored"
                    );
                    report.succeeded += 1;
                }
                Err(e) => {
                    warn!(tenant_id = %ctx.tenant_id, error = %e, "Refresh pass failed");
                    report.failures.push(TenantFailure {
                        tenant_id: ctx.tenant_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    async fn warm_owned(&self, ctx: TenantContext) -> (String, Result<WarmStats>) {
        let result = self.warm_tenant(&ctx).await;
        (ctx.tenant_id, result)
    }

    /// Full warming sequence for one tenant
    pub async fn warm_tenant(&self, ctx: &TenantContext) -> Result<WarmStats> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let span = info_span!("warm_tenant", tenant_id = %ctx.tenant_id, %run_id);

        async {
            info!("Starting tenant warming");
            let stats = self.warm_full_range_at(ctx, Utc::now()).await?;
            info!(
                epinets = stats.epinets,
                batches = stats.batches,
                bins = stats.bins_written,
                events = stats.events,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Tenant warming finished"
            );
            Ok::<_, Error>(stats)
        }
        .instrument(span)
        .await
    }

    pub async fn warm_full_range(&self, ctx: &TenantContext) -> Result<WarmStats> {
        self.warm_full_range_at(ctx, Utc::now()).await
    }

    /// Backfill the whole window ending at `now`'s hour
    pub async fn warm_full_range_at(
        &self,
        ctx: &TenantContext,
        now: DateTime<Utc>,
    ) -> Result<WarmStats> {
        let funnels = ctx.store.find_all_funnels().await?;
        if funnels.is_empty() {
            info!(tenant_id = %ctx.tenant_id, "No epinets configured, nothing to warm");
            return Ok(WarmStats::default());
        }
        let content = ctx.store.find_all_content().await?;

        let window = self.window(now);
        let estimate = ctx
            .store
            .estimate_event_count(window.start, window.end)
            .await?;
        let batches = self.plan_batches(window, estimate);
        debug!(
            tenant_id = %ctx.tenant_id,
            estimate,
            batches = batches.len(),
            "Planned backfill"
        );

        let mut stats = WarmStats {
            epinets: funnels.len(),
            ..Default::default()
        };
        for (i, batch) in batches.iter().enumerate() {
            let hour_keys = hour_keys_in_span(batch.start, batch.end);
            let (bins, events) = self
                .rebuild_hours(ctx, &funnels, &content, *batch, &hour_keys, now)
                .await?;
            debug!(
                tenant_id = %ctx.tenant_id,
                batch = i + 1,
                hours = hour_keys.len(),
                bins,
                events,
                "Backfill batch stored"
            );
            stats.batches += 1;
            stats.bins_written += bins;
            stats.events += events;
        }

        Ok(stats)
    }

    pub async fn warm_missing_hours(
        &self,
        ctx: &TenantContext,
        hour_keys: &[String],
    ) -> Result<WarmStats> {
        self.warm_missing_hours_at(ctx, hour_keys, Utc::now()).await
    }

    /// Rebuild bins only for the requested hour keys
    pub async fn warm_missing_hours_at(
        &self,
        ctx: &TenantContext,
        hour_keys: &[String],
        now: DateTime<Utc>,
    ) -> Result<WarmStats> {
        let mut requested: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
        for key in hour_keys {
            match parse_hour_key(key) {
                Some(start) => {
                    requested.insert(key.clone(), start);
                }
                None => warn!(tenant_id = %ctx.tenant_id, hour_key = %key, "Ignoring invalid hour key"),
            }
        }
        if requested.is_empty() {
            return Ok(WarmStats::default());
        }

        let funnels = ctx.store.find_all_funnels().await?;
        if funnels.is_empty() {
            return Ok(WarmStats::default());
        }
        let content = ctx.store.find_all_content().await?;

        let run_id = Uuid::new_v4();
        let oldest = requested.values().min().copied().unwrap_or(now);
        let newest = requested.values().max().copied().unwrap_or(now);
        let end = (truncate_to_hour(now) + ChronoDuration::hours(1))
            .max(newest + ChronoDuration::hours(1));
        let span = BatchSpan { start: oldest, end };
        let keys: Vec<String> = requested.into_keys().collect();

        let (bins, events) = self
            .rebuild_hours(ctx, &funnels, &content, span, &keys, now)
            .instrument(info_span!("catch_up", tenant_id = %ctx.tenant_id, %run_id))
            .await?;
        info!(
            tenant_id = %ctx.tenant_id,
            %run_id,
            hours = keys.len(),
            bins,
            events,
            "Catch-up warming stored"
        );

        Ok(WarmStats {
            epinets: funnels.len(),
            batches: 1,
            bins_written: bins,
            events,
        })
    }

    /// Maintenance pass: rebuild missing or expired hours in the window,
    /// always including the current hour
    pub async fn refresh_tenant_at(
        &self,
        ctx: &TenantContext,
        now: DateTime<Utc>,
    ) -> Result<WarmStats> {
        let funnels = ctx.store.find_all_funnels().await?;
        if funnels.is_empty() {
            return Ok(WarmStats::default());
        }
        let epinet_ids: Vec<String> = funnels.iter().map(|f| f.id.clone()).collect();
        let window_keys = hour_keys_back(self.config.window_hours, now);

        let mut missing = ctx
            .cache
            .missing_hours(&ctx.tenant_id, &epinet_ids, &window_keys, now)
            .await;
        let current = hour_key(now);
        if !missing.contains(&current) {
            missing.push(current);
        }

        self.warm_missing_hours_at(ctx, &missing, now).await
    }

    /// Fetch events for `span` once and store a bin per funnel for each of `hour_keys`
    ///
    /// Hours without matching events get an explicit empty bin.
    async fn rebuild_hours(
        &self,
        ctx: &TenantContext,
        funnels: &[FunnelDefinition],
        content: &ContentIndex,
        span: BatchSpan,
        hour_keys: &[String],
        now: DateTime<Utc>,
    ) -> Result<(usize, usize)> {
        let rules = analyze_all(funnels);
        let (actions, beliefs) = fetch_events(ctx.store.as_ref(), &rules, span.start, span.end).await?;
        let events = actions.len() + beliefs.len();
        let grouped = group_by_hour(actions, beliefs);

        let mut bins = Vec::with_capacity(hour_keys.len() * funnels.len());
        for key in hour_keys {
            let ttl = self.ttl_for(key, now);
            let hour_events = grouped.get(key);
            for funnel in funnels {
                let bin = build_bin(funnel, hour_events, content, now, ttl);
                bins.push((funnel.id.clone(), key.clone(), bin));
            }
        }

        let written = ctx.cache.set_many(&ctx.tenant_id, bins).await?;
        Ok((written, events))
    }
}
