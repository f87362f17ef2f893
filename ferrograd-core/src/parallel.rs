//! Bounded worker pool used by layers that fan large batches out by rows.

use std::ops::Range;

use rayon::prelude::*;

use crate::error::{FerrogradError, Result};

/// A fixed-size rayon pool plus the row threshold above which work is split.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    max_workers: usize,
    threshold: usize,
}

impl WorkerPool {
    pub fn new(max_workers: usize, threshold: usize) -> Result<Self> {
        if max_workers == 0 {
            return Err(FerrogradError::ConfigurationError(
                "max_workers must be at least 1".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .thread_name(|i| format!("ferrograd-worker-{}", i))
            .build()
            .map_err(|e| FerrogradError::ConfigurationError(format!("worker pool: {}", e)))?;
        log::debug!(
            "worker pool started with {} threads, fan-out above {} rows",
            max_workers,
            threshold
        );
        Ok(WorkerPool {
            pool,
            max_workers,
            threshold,
        })
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether a batch of `rows` should be split across workers.
    pub fn should_fan_out(&self, rows: usize) -> bool {
        self.max_workers > 1 && rows > self.threshold
    }

    /// Splits `0..rows` into at most `max_workers` contiguous ranges.
    pub fn partition(&self, rows: usize) -> Vec<Range<usize>> {
        if rows == 0 {
            return Vec::new();
        }
        let chunk = (rows + self.max_workers - 1) / self.max_workers;
        (0..rows)
            .step_by(chunk)
            .map(|start| start..(start + chunk).min(rows))
            .collect()
    }

    /// Runs `task` over disjoint row ranges on the pool and concatenates the
    /// per-range results in range order. The first error aborts the join.
    pub fn fan_out_rows<T, F>(&self, rows: usize, task: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(Range<usize>) -> Result<Vec<T>> + Send + Sync,
    {
        let ranges = self.partition(rows);
        log::trace!("fan-out of {} rows into {} tasks", rows, ranges.len());
        let parts: Vec<Vec<T>> = self
            .pool
            .install(|| ranges.into_par_iter().map(|r| task(r)).collect::<Result<Vec<_>>>())?;
        Ok(parts.into_iter().flatten().collect())
    }
}
