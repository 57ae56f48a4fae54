//! Reporting service: faculty table and dashboard summary
//!
//! The reconciled table is cached under one versioned key; the summary is always
//! projected from that cached table and never fetched on its own.

use hemis_common::config::AggregationConfig;
use hemis_common::{Result, Summary, Table};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aggregator::ParallelAggregator;
use crate::cache::CacheStore;
use crate::dimensions::DimensionResolver;
use crate::fetcher::CountFetcher;
use crate::reconciler;
use crate::retry::RetryPolicy;
use crate::summary;
use crate::upstream::HemisApi;

/// Cache key of the reconciled table; bump when the table shape changes
pub const TABLE_CACHE_KEY: &str = "faculty_table_data_v5";

pub struct ReportService {
    resolver: DimensionResolver,
    aggregator: ParallelAggregator,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ReportService {
    pub fn new(api: Arc<dyn HemisApi>, cache: Arc<dyn CacheStore>, config: &AggregationConfig) -> Self {
        Self::with_policy(api, cache, config, RetryPolicy::from_config(config))
    }

    pub fn with_policy(
        api: Arc<dyn HemisApi>,
        cache: Arc<dyn CacheStore>,
        config: &AggregationConfig,
        policy: RetryPolicy,
    ) -> Self {
        let fetcher = CountFetcher::new(api.clone(), policy);
        Self {
            resolver: DimensionResolver::new(api),
            aggregator: ParallelAggregator::new(
                fetcher,
                config.max_workers,
                config.active_status_code,
            ),
            cache,
            ttl: config.cache_ttl(),
        }
    }

    /// Cached table, or a fresh aggregation run stored for `ttl`
    pub async fn get_table(&self) -> Result<Table> {
        if let Some(table) = self.cached_table().await {
            tracing::debug!(key = TABLE_CACHE_KEY, "Faculty table served from cache");
            return Ok(table);
        }

        let table = self.build_table().await?;
        self.cache
            .set(TABLE_CACHE_KEY, serde_json::to_value(&table)?, self.ttl)
            .await;
        Ok(table)
    }

    /// Summary projected from the cached table (building it first if needed)
    pub async fn get_summary(&self) -> Result<Summary> {
        let table = match self.cached_table().await {
            Some(table) => table,
            None => self.get_table().await?,
        };
        Ok(summary::project(&table))
    }

    async fn cached_table(&self) -> Option<Table> {
        let blob = self.cache.get(TABLE_CACHE_KEY).await?;
        match serde_json::from_value(blob) {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::warn!(key = TABLE_CACHE_KEY, error = %e, "Discarding unreadable cached table");
                None
            }
        }
    }

    async fn build_table(&self) -> Result<Table> {
        let started = Instant::now();

        let faculties = self.resolver.resolve_faculties().await?;
        let forms = self.resolver.resolve_forms().await;

        let aggregation = self.aggregator.aggregate(&faculties, &forms).await;
        let table = reconciler::reconcile(
            &aggregation.active_faculties,
            &aggregation.active_forms,
            &aggregation.cells,
        );

        tracing::info!(
            faculties = faculties.len(),
            forms = forms.len(),
            rows = table.rows.len(),
            columns = table.columns.len(),
            grand_total = table.totals.grand_total,
            queries = aggregation.stats.phase1_queries + aggregation.stats.phase2_queries,
            unknown_results = aggregation.stats.unknown_results,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Faculty table rebuilt"
        );

        Ok(table)
    }
}
