use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::traits::Sampler;

/// Random index order, with or without replacement.
///
/// The generator lives in the sampler, so consecutive epochs differ while a
/// seeded sampler reproduces the same sequence of epochs.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    replacement: bool,
    num_samples: Option<usize>,
    rng: StdRng,
}

impl RandomSampler {
    /// * `replacement`: an index may be drawn several times per epoch.
    /// * `num_samples`: indices per epoch, the dataset size when `None`.
    ///   Without replacement it is capped at the dataset size.
    pub fn new(replacement: bool, num_samples: Option<usize>) -> Self {
        RandomSampler {
            replacement,
            num_samples,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Sampler for RandomSampler {
    fn iter(&mut self, dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send + Sync> {
        if dataset_len == 0 {
            return Box::new(std::iter::empty());
        }
        let n = self.len(dataset_len);
        if self.replacement {
            let indices: Vec<usize> = (0..n).map(|_| self.rng.gen_range(0..dataset_len)).collect();
            return Box::new(indices.into_iter());
        }
        if self.num_samples.map_or(false, |requested| requested > dataset_len) {
            log::warn!(
                "RandomSampler: {} samples requested from {} items without replacement, using {}",
                self.num_samples.unwrap_or_default(),
                dataset_len,
                n
            );
        }
        let mut indices: Vec<usize> = (0..dataset_len).collect();
        indices.shuffle(&mut self.rng);
        indices.truncate(n);
        Box::new(indices.into_iter())
    }

    fn len(&self, dataset_len: usize) -> usize {
        let requested = self.num_samples.unwrap_or(dataset_len);
        if self.replacement {
            requested
        } else {
            requested.min(dataset_len)
        }
    }
}

#[cfg(test)]
#[path = "random_sampler_test.rs"]
mod tests;
