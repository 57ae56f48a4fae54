//! Two-phase bounded fan-out of count queries
//!
//! Phase 1 counts every faculty and every form on its own. Members with a zero total
//! are pruned. Phase 2 counts only the active faculty × active form cells. Each phase
//! runs at most `max_workers` queries at once (`buffer_unordered`) and is fully
//! collected before the next one starts.
//!
//! Workers return `(key, result)` pairs; the map is filled after the join, so every key
//! is written exactly once and no locking is needed.

use futures::stream::{self, StreamExt};
use hemis_common::Member;
use std::collections::HashMap;
use std::time::Instant;

use crate::fetcher::{CountFetcher, CountResult};
use crate::filters::CountFilter;

/// Dimension member with its phase-1 total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tallied {
    pub member: Member,
    pub total: u64,
}

impl Tallied {
    pub fn id(&self) -> i64 {
        self.member.id
    }
}

/// Sparse faculty × form counts; absent means 0
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseCells {
    cells: HashMap<(i64, i64), u64>,
}

impl SparseCells {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `count` unless it is 0
    pub fn insert(&mut self, faculty_id: i64, form_id: i64, count: u64) {
        if count > 0 {
            self.cells.insert((faculty_id, form_id), count);
        }
    }

    pub fn get(&self, faculty_id: i64, form_id: i64) -> u64 {
        self.cells.get(&(faculty_id, form_id)).copied().unwrap_or(0)
    }

    pub fn contains(&self, faculty_id: i64, form_id: i64) -> bool {
        self.cells.contains_key(&(faculty_id, form_id))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub phase1_queries: usize,
    pub phase2_queries: usize,
    /// Queries that exhausted their retries
    pub unknown_results: usize,
    pub pruned_faculties: usize,
    pub pruned_forms: usize,
}

/// Result of one aggregation run
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub active_faculties: Vec<Tallied>,
    pub active_forms: Vec<Tallied>,
    pub cells: SparseCells,
    pub stats: AggregationStats,
}

#[derive(Debug, Clone, Copy)]
enum Dimension {
    Faculty(usize),
    Form(usize),
}

pub struct ParallelAggregator {
    fetcher: CountFetcher,
    max_workers: usize,
    status: i64,
}

impl ParallelAggregator {
    pub fn new(fetcher: CountFetcher, max_workers: usize, status: i64) -> Self {
        Self {
            fetcher,
            max_workers: max_workers.max(1),
            status,
        }
    }

    pub async fn aggregate(&self, faculties: &[Member], forms: &[Member]) -> Aggregation {
        let mut stats = AggregationStats::default();
        let started = Instant::now();

        // Phase 1: dimension totals
        let jobs = faculties
            .iter()
            .enumerate()
            .map(|(i, f)| (Dimension::Faculty(i), CountFilter::faculty(f.id, self.status)))
            .chain(
                forms
                    .iter()
                    .enumerate()
                    .map(|(i, f)| (Dimension::Form(i), CountFilter::form(f.id, self.status))),
            )
            .collect::<Vec<_>>();
        stats.phase1_queries = jobs.len();

        let results = self.run_phase(jobs).await;

        let mut faculty_totals = vec![0u64; faculties.len()];
        let mut form_totals = vec![0u64; forms.len()];
        for (dim, result) in results {
            if result.is_unknown() {
                stats.unknown_results += 1;
            }
            match dim {
                Dimension::Faculty(i) => faculty_totals[i] = result.value(),
                Dimension::Form(i) => form_totals[i] = result.value(),
            }
        }

        let active_faculties = active(faculties, &faculty_totals);
        let active_forms = active(forms, &form_totals);
        stats.pruned_faculties = faculties.len() - active_faculties.len();
        stats.pruned_forms = forms.len() - active_forms.len();

        tracing::info!(
            queries = stats.phase1_queries,
            active_faculties = active_faculties.len(),
            active_forms = active_forms.len(),
            pruned_faculties = stats.pruned_faculties,
            pruned_forms = stats.pruned_forms,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Phase 1 (dimension totals) completed"
        );

        // Phase 2: sparse cross product of active members only
        let jobs = active_faculties
            .iter()
            .flat_map(|fac| {
                active_forms.iter().map(move |form| {
                    let filter = CountFilter::cell(fac.id(), form.id(), self.status);
                    ((fac.id(), form.id()), filter)
                })
            })
            .collect::<Vec<_>>();
        stats.phase2_queries = jobs.len();

        let mut cells = SparseCells::new();
        for ((faculty_id, form_id), result) in self.run_phase(jobs).await {
            if result.is_unknown() {
                stats.unknown_results += 1;
            }
            cells.insert(faculty_id, form_id, result.value());
        }

        tracing::info!(
            queries = stats.phase2_queries,
            nonzero_cells = cells.len(),
            unknown_results = stats.unknown_results,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Phase 2 (cell counts) completed"
        );

        Aggregation {
            active_faculties,
            active_forms,
            cells,
            stats,
        }
    }

    /// Run every job with at most `max_workers` in flight; returns once all finished
    async fn run_phase<K: Send>(&self, jobs: Vec<(K, CountFilter)>) -> Vec<(K, CountResult)> {
        let fetcher = &self.fetcher;
        stream::iter(jobs)
            .map(|(key, filter)| async move { (key, fetcher.fetch(&filter).await) })
            .buffer_unordered(self.max_workers)
            .collect()
            .await
    }
}

/// Members with a strictly positive total, in input order
fn active(members: &[Member], totals: &[u64]) -> Vec<Tallied> {
    members
        .iter()
        .zip(totals)
        .filter(|(_, total)| **total > 0)
        .map(|(member, total)| Tallied {
            member: member.clone(),
            total: *total,
        })
        .collect()
}
