use crate::buffer::HostData;
use crate::device::StorageDevice;
use crate::error::Result;
use crate::tensor::Tensor;
use crate::types::DType;

/// Creates a CPU tensor of the given shape and dtype filled with `value`.
pub fn full(shape: &[usize], value: f64, dtype: DType) -> Result<Tensor> {
    let numel: usize = shape.iter().product();
    Tensor::from_host(
        HostData::from_f64_vec(dtype, vec![value; numel]),
        shape.to_vec(),
        StorageDevice::Cpu,
        None,
    )
}

/// Creates a CPU tensor filled with zeros.
pub fn zeros(shape: &[usize], dtype: DType) -> Result<Tensor> {
    full(shape, 0.0, dtype)
}

/// Creates a CPU tensor filled with ones.
pub fn ones(shape: &[usize], dtype: DType) -> Result<Tensor> {
    full(shape, 1.0, dtype)
}

/// Creates a tensor with the shape, dtype, device and pool of `other`,
/// filled with `value`.
pub fn full_like(other: &Tensor, value: f64) -> Result<Tensor> {
    other.from_f64_like(vec![value; other.numel()])
}

pub fn zeros_like(other: &Tensor) -> Result<Tensor> {
    full_like(other, 0.0)
}

pub fn ones_like(other: &Tensor) -> Result<Tensor> {
    full_like(other, 1.0)
}
