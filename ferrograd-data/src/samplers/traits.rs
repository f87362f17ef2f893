use std::fmt::Debug;

/// Produces the index order of one epoch over a dataset.
///
/// Each call to [`Sampler::iter`] starts a new epoch; random samplers draw a
/// fresh order from their own generator every time.
pub trait Sampler: Debug + Send + Sync {
    fn iter(&mut self, dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send + Sync>;

    /// Number of indices one epoch yields.
    fn len(&self, dataset_len: usize) -> usize;
}
