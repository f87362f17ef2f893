use std::ops::Range;
use std::sync::Arc;

use ferrograd_core::{FerrogradError, Result};

use super::traits::Dataset;

/// An in-memory dataset over shared storage.
///
/// Cloning and [`VecDataset::split_at`] produce views of the same samples
/// without copying them, so a train/validation split of one `Vec` costs two
/// reference counts. `get` clones the sample.
#[derive(Debug, Clone)]
pub struct VecDataset<T: Clone + Send + Sync + 'static> {
    data: Arc<[T]>,
    window: Range<usize>,
}

impl<T: Clone + Send + Sync + 'static> VecDataset<T> {
    pub fn new(data: Vec<T>) -> Self {
        let len = data.len();
        VecDataset {
            data: data.into(),
            window: 0..len,
        }
    }

    /// Splits into the first `at` samples and the rest.
    ///
    /// # Errors
    /// `IndexOutOfBounds` if `at > self.len()`.
    pub fn split_at(&self, at: usize) -> Result<(Self, Self)> {
        if at > self.len() {
            return Err(FerrogradError::IndexOutOfBounds {
                index: vec![at],
                shape: vec![self.len()],
            });
        }
        let mid = self.window.start + at;
        let head = VecDataset {
            data: Arc::clone(&self.data),
            window: self.window.start..mid,
        };
        let tail = VecDataset {
            data: Arc::clone(&self.data),
            window: mid..self.window.end,
        };
        Ok((head, tail))
    }

    /// Samples of this view, in order.
    pub fn as_slice(&self) -> &[T] {
        &self.data[self.window.clone()]
    }
}

impl<T: Clone + Send + Sync + 'static> FromIterator<T> for VecDataset<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        VecDataset::new(iter.into_iter().collect())
    }
}

impl<T: Clone + Send + Sync + 'static> Dataset for VecDataset<T> {
    type Item = T;

    fn get(&self, index: usize) -> Result<Self::Item> {
        self.as_slice().get(index).cloned().ok_or_else(|| FerrogradError::IndexOutOfBounds {
            index: vec![index],
            shape: vec![self.len()],
        })
    }

    fn len(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
#[path = "vec_dataset_test.rs"]
mod tests;
