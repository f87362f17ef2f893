use ferrograd_core::Result;

/// Indexed access to a finite collection of samples.
///
/// A sample can be a single tensor, a tuple such as `(features, label)` or
/// any other `Send` value.
pub trait Dataset {
    type Item: Send + 'static;

    /// The sample at `index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds` if `index >= self.len()`.
    fn get(&self, index: usize) -> Result<Self::Item>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
