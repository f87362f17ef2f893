// src/tensor/mod.rs

use std::fmt;
use std::sync::Arc;

use crate::buffer::{Buffer, Element, HostData};
use crate::device::StorageDevice;
use crate::error::{FerrogradError, Result};
use crate::memory::MemoryPool;
use crate::types::DType;

pub mod create;

pub use create::{full, full_like, ones, ones_like, zeros, zeros_like};

/// An immutable n-dimensional array: a shared buffer plus a shape.
///
/// Cloning a `Tensor` is cheap and shares the buffer. The buffer (and its
/// pool allocation) is freed when the last clone is dropped, which is what
/// [`ValueCell::release`](crate::value_cell::ValueCell::release) relies on.
#[derive(Clone)]
pub struct Tensor {
    pub(crate) buffer: Arc<Buffer>,
    pub(crate) shape: Vec<usize>,
}

impl Tensor {
    /// Creates a new unaccounted F32 tensor on the CPU.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        Self::from_host(HostData::F32(data_vec), shape, StorageDevice::Cpu, None)
    }

    /// Creates a new unaccounted F64 tensor on the CPU.
    pub fn new_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self> {
        Self::from_host(HostData::F64(data_vec), shape, StorageDevice::Cpu, None)
    }

    /// Creates a scalar (rank-0) F32 tensor.
    pub fn scalar(value: f32) -> Self {
        Tensor {
            buffer: Arc::new(Buffer::unaccounted(HostData::F32(vec![value]))),
            shape: Vec::new(),
        }
    }

    /// Allocates a tensor on `device`, accounted in `pool` when given.
    ///
    /// # Errors
    /// `TensorCreationError` if the element count does not match `shape`,
    /// `ResourceExhausted` if the pool refuses the allocation.
    pub fn from_host(
        data: HostData,
        shape: Vec<usize>,
        device: StorageDevice,
        pool: Option<&Arc<MemoryPool>>,
    ) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(FerrogradError::TensorCreationError {
                data_len: data.len(),
                shape,
            });
        }
        let buffer = Buffer::new(data, device, pool)?;
        Ok(Tensor {
            buffer: Arc::new(buffer),
            shape,
        })
    }

    /// Allocates a new tensor on the same device and pool as `self`.
    pub fn like(&self, data: HostData, shape: Vec<usize>) -> Result<Self> {
        Self::from_host(data, shape, self.device(), self.pool())
    }

    /// Builds a tensor with the shape, dtype, device and pool of `self` from
    /// f64 values.
    pub fn from_f64_like(&self, values: Vec<f64>) -> Result<Self> {
        self.like(HostData::from_f64_vec(self.dtype(), values), self.shape.clone())
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    pub fn device(&self) -> StorageDevice {
        self.buffer.device()
    }

    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    pub fn pool(&self) -> Option<&Arc<MemoryPool>> {
        self.buffer.pool()
    }

    pub fn host_data(&self) -> &HostData {
        self.buffer.data()
    }

    /// Views the elements as `T`, failing with `DtypeMismatch` otherwise.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        self.buffer.try_slice::<T>()
    }

    /// Copies the data out as `Vec<f32>`. Requires an F32 tensor.
    pub fn get_f32_data(&self) -> Result<Vec<f32>> {
        Ok(self.as_slice::<f32>()?.to_vec())
    }

    /// Copies the data out as `Vec<f64>`. Requires an F64 tensor.
    pub fn get_f64_data(&self) -> Result<Vec<f64>> {
        Ok(self.as_slice::<f64>()?.to_vec())
    }

    /// Widens the data to f64 regardless of dtype.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.buffer.data().to_f64_vec()
    }

    /// Returns the single element of a one-element tensor.
    pub fn item(&self) -> Result<f64> {
        if self.numel() != 1 {
            return Err(FerrogradError::ShapeMismatch {
                expected: vec![1],
                actual: self.shape.clone(),
                operation: "item".to_string(),
            });
        }
        Ok(self.to_f64_vec()[0])
    }

    /// Returns a tensor sharing this buffer under a new shape.
    pub fn reshape(&self, shape: Vec<usize>) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if numel != self.numel() {
            return Err(FerrogradError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: shape,
                operation: "reshape".to_string(),
            });
        }
        Ok(Tensor {
            buffer: Arc::clone(&self.buffer),
            shape,
        })
    }

    /// Copies the data into a fresh allocation on `device` in the same pool.
    pub fn to_device(&self, device: StorageDevice) -> Result<Self> {
        Self::from_host(self.host_data().clone(), self.shape.clone(), device, self.pool())
    }

    /// Whether both tensors share a shape and all elements are within `tol`.
    pub fn all_close(&self, other: &Tensor, tol: f64) -> bool {
        self.shape == other.shape
            && self
                .to_f64_vec()
                .iter()
                .zip(other.to_f64_vec().iter())
                .all(|(a, b)| (a - b).abs() <= tol)
    }

    /// Whether every element is finite.
    pub fn is_finite(&self) -> bool {
        self.to_f64_vec().iter().all(|x| x.is_finite())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("dtype", &self.dtype())
            .field("device", &self.device())
            .field("data", self.host_data())
            .finish()
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.device() == other.device() && self.host_data() == other.host_data()
    }
}

#[cfg(test)]
#[path = "tensor_test.rs"]
mod tests;
