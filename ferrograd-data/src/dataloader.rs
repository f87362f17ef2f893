//! # DataLoader
//!
//! Batches samples from a [`Dataset`] in the order a [`Sampler`] produces.
//!
//! ```rust
//! use ferrograd_data::{DataLoader, SequentialSampler, VecDataset};
//!
//! let dataset = VecDataset::new(vec![1, 2, 3, 4, 5, 6]);
//! let loader = DataLoader::new(dataset, 4, SequentialSampler::new(), false).unwrap();
//! let batches: Vec<Vec<i32>> = loader.map(|b| b.unwrap()).collect();
//! assert_eq!(batches, vec![vec![1, 2, 3, 4], vec![5, 6]]);
//! ```

use ferrograd_core::buffer::HostData;
use ferrograd_core::{FerrogradError, Result, Tensor};

use crate::datasets::Dataset;
use crate::samplers::Sampler;

/// Turns the samples of one batch into the batch value.
pub type CollateFn<I, B> = Box<dyn Fn(Vec<I>) -> Result<B> + Send + Sync>;

/// Iterator over the batches of one epoch.
///
/// Yields `Some(Ok(batch))` per batch, `Some(Err(_))` when a sample cannot be
/// fetched or collated, and `None` once the epoch's indices are exhausted
/// (also for every later call). [`DataLoader::reset`] starts a new epoch.
pub struct DataLoader<D: Dataset, S: Sampler, B = Vec<<D as Dataset>::Item>> {
    dataset: D,
    batch_size: usize,
    sampler: S,
    drop_last: bool,
    collate_fn: CollateFn<D::Item, B>,
    indices: Box<dyn Iterator<Item = usize> + Send + Sync>,
    epoch: usize,
}

impl<D: Dataset, S: Sampler> DataLoader<D, S> {
    /// A loader whose batches are the plain `Vec` of samples.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if `batch_size` is zero.
    pub fn new(dataset: D, batch_size: usize, sampler: S, drop_last: bool) -> Result<Self> {
        Self::with_collate(dataset, batch_size, sampler, drop_last, Box::new(Ok))
    }
}

impl<D: Dataset, S: Sampler, B> DataLoader<D, S, B> {
    pub fn with_collate(
        dataset: D,
        batch_size: usize,
        mut sampler: S,
        drop_last: bool,
        collate_fn: CollateFn<D::Item, B>,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(FerrogradError::ConfigurationError("batch_size must be at least 1".to_string()));
        }
        let indices = sampler.iter(dataset.len());
        Ok(Self {
            dataset,
            batch_size,
            sampler,
            drop_last,
            collate_fn,
            indices,
            epoch: 0,
        })
    }

    /// Starts the next epoch, drawing a fresh index order from the sampler.
    pub fn reset(&mut self) {
        self.indices = self.sampler.iter(self.dataset.len());
        self.epoch += 1;
        log::debug!("DataLoader: epoch {} started", self.epoch);
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Number of batches one epoch yields.
    pub fn num_batches(&self) -> usize {
        let n = self.sampler.len(self.dataset.len());
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl<D: Dataset, S: Sampler, B> Iterator for DataLoader<D, S, B> {
    type Item = Result<B>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.batch_size);
        for idx in self.indices.by_ref().take(self.batch_size) {
            match self.dataset.get(idx) {
                Ok(item) => batch.push(item),
                Err(e) => return Some(Err(e)),
            }
        }
        if batch.is_empty() || (self.drop_last && batch.len() < self.batch_size) {
            return None;
        }
        log::trace!("DataLoader: batch of {}", batch.len());
        Some((self.collate_fn)(batch))
    }
}

/// Collates [`TensorDataset`](crate::datasets::TensorDataset) samples by
/// stacking each field along a new leading batch dimension.
///
/// # Errors
///
/// `ShapeMismatch` or `DtypeMismatch` if the samples of one field disagree,
/// `ArityMismatch` if samples have different field counts.
pub fn stack_samples(samples: Vec<Vec<Tensor>>) -> Result<Vec<Tensor>> {
    let Some(first) = samples.first() else {
        return Ok(Vec::new());
    };
    let fields = first.len();
    let mut out = Vec::with_capacity(fields);
    for field in 0..fields {
        let template = &first[field];
        let mut values = Vec::with_capacity(samples.len() * template.numel());
        for sample in &samples {
            if sample.len() != fields {
                return Err(FerrogradError::ArityMismatch {
                    expected: fields,
                    actual: sample.len(),
                    operation: "stack_samples".to_string(),
                });
            }
            let t = &sample[field];
            if t.shape() != template.shape() {
                return Err(FerrogradError::ShapeMismatch {
                    expected: template.shape().to_vec(),
                    actual: t.shape().to_vec(),
                    operation: "stack_samples".to_string(),
                });
            }
            if t.dtype() != template.dtype() {
                return Err(FerrogradError::DtypeMismatch {
                    expected: template.dtype(),
                    actual: t.dtype(),
                    operation: "stack_samples".to_string(),
                });
            }
            values.extend(t.to_f64_vec());
        }
        let mut shape = Vec::with_capacity(template.rank() + 1);
        shape.push(samples.len());
        shape.extend_from_slice(template.shape());
        out.push(template.like(HostData::from_f64_vec(template.dtype(), values), shape)?);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "dataloader_test.rs"]
mod tests;
