//! Dataset, sampler and batch iteration for ferrograd training drivers.
//!
//! A [`DataLoader`] draws indices from a [`Sampler`], fetches samples from a
//! [`Dataset`] and collates them into batches. It is a plain `Iterator` over
//! `Result<Batch>`: the end of an epoch is `None`, never an error.

pub mod dataloader;
pub mod datasets;
pub mod samplers;

pub use dataloader::{stack_samples, CollateFn, DataLoader};
pub use datasets::{Dataset, TensorDataset, VecDataset};
pub use samplers::{RandomSampler, Sampler, SequentialSampler, SubsetRandomSampler};
