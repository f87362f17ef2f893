use super::traits::Sampler;

/// Visits indices in order.
///
/// A sampler built with [`SequentialSampler::resume_at`] skips the first
/// `offset` indices of its first epoch only, which lets a run restored from
/// saved optimizer state continue mid-epoch. Later epochs start at 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialSampler {
    resume: usize,
}

impl SequentialSampler {
    pub fn new() -> Self {
        SequentialSampler { resume: 0 }
    }

    /// # Arguments
    /// * `offset`: number of leading indices to skip in the first epoch.
    pub fn resume_at(offset: usize) -> Self {
        SequentialSampler { resume: offset }
    }

    /// Index the next epoch starts from.
    pub fn next_start(&self) -> usize {
        self.resume
    }
}

impl Sampler for SequentialSampler {
    fn iter(&mut self, dataset_len: usize) -> Box<dyn Iterator<Item = usize> + Send + Sync> {
        let start = std::mem::take(&mut self.resume).min(dataset_len);
        if start > 0 {
            log::debug!("sequential sampler resuming at index {} of {}", start, dataset_len);
        }
        Box::new(start..dataset_len)
    }

    fn len(&self, dataset_len: usize) -> usize {
        dataset_len - self.resume.min(dataset_len)
    }
}

#[cfg(test)]
#[path = "sequential_sampler_test.rs"]
mod tests;
