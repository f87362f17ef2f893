use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::traits::Sampler;

/// Random order over a fixed subset of indices, e.g. a validation split.
///
/// Indices are not checked against the dataset; the loader reports an
/// out-of-range index as `IndexOutOfBounds` for that batch.
#[derive(Debug, Clone)]
pub struct SubsetRandomSampler {
    indices: Vec<usize>,
    rng: StdRng,
}

impl SubsetRandomSampler {
    pub fn new(indices: Vec<usize>) -> Self {
        SubsetRandomSampler {
            indices,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Sampler for SubsetRandomSampler {
    fn iter(&mut self, _dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send + Sync> {
        let mut order = self.indices.clone();
        order.shuffle(&mut self.rng);
        Box::new(order.into_iter())
    }

    fn len(&self, _dataset_len: usize) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
#[path = "subset_random_sampler_test.rs"]
mod tests;
