use crate::device::StorageDevice;
use crate::error::Result;
use crate::tensor::Tensor;
use crate::types::DType;

/// Indirection box around an externally-allocated buffer.
///
/// The cell lets a node swap its buffer (for example when moving between
/// devices) without changing identity. Once released the cell is empty and
/// further releases are no-ops.
#[derive(Debug, Clone, Default)]
pub struct ValueCell {
    value: Option<Tensor>,
}

impl ValueCell {
    pub fn new(value: Tensor) -> Self {
        ValueCell { value: Some(value) }
    }

    pub fn empty() -> Self {
        ValueCell { value: None }
    }

    /// Replaces the held buffer, dropping the previous one.
    pub fn set(&mut self, value: Tensor) {
        self.value = Some(value);
    }

    pub fn get(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.value.is_none()
    }

    /// Drops the held buffer. Returns `true` if a buffer was actually held.
    pub fn release(&mut self) -> bool {
        self.value.take().is_some()
    }

    pub fn shape(&self) -> Option<&[usize]> {
        self.value.as_ref().map(|t| t.shape())
    }

    pub fn dtype(&self) -> Option<DType> {
        self.value.as_ref().map(|t| t.dtype())
    }

    pub fn device(&self) -> Option<StorageDevice> {
        self.value.as_ref().map(|t| t.device())
    }

    /// Re-allocates the buffer on `device` through its pool.
    ///
    /// No-op for an empty cell or when already on `device`. On failure the
    /// cell keeps its current buffer.
    pub fn materialize_on(&mut self, device: StorageDevice) -> Result<()> {
        let moved = match &self.value {
            Some(t) if t.device() != device => t.to_device(device)?,
            _ => return Ok(()),
        };
        self.value = Some(moved);
        Ok(())
    }
}

#[cfg(test)]
#[path = "value_cell_test.rs"]
mod tests;
