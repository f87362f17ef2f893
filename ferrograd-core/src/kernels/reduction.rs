use crate::buffer::{Element, HostData};
use crate::error::{FerrogradError, Result};
use crate::kernels::{broadcast_index, broadcast_shapes};
use crate::tensor::Tensor;
use crate::types::DType;

fn sum_all_typed<T: Element>(a: &Tensor) -> Result<HostData> {
    let total = a.as_slice::<T>()?.iter().fold(T::zero(), |acc, &x| acc + x);
    Ok(T::wrap(vec![total]))
}

/// Sums every element into a rank-0 tensor.
pub fn sum_all(a: &Tensor) -> Result<Tensor> {
    let data = match a.dtype() {
        DType::F32 => sum_all_typed::<f32>(a)?,
        DType::F64 => sum_all_typed::<f64>(a)?,
    };
    a.like(data, Vec::new())
}

fn broadcast_to_typed<T: Element>(a: &Tensor, shape: &[usize]) -> Result<HostData> {
    let src = a.as_slice::<T>()?;
    let numel: usize = shape.iter().product();
    Ok(T::wrap(
        (0..numel).map(|i| src[broadcast_index(i, shape, a.shape())]).collect(),
    ))
}

/// Expands `a` to `shape` following broadcasting rules.
pub fn broadcast_to(a: &Tensor, shape: &[usize]) -> Result<Tensor> {
    if a.shape() == shape {
        return Ok(a.clone());
    }
    match broadcast_shapes(a.shape(), shape) {
        Some(ref out) if out.as_slice() == shape => {}
        _ => {
            return Err(FerrogradError::ShapeMismatch {
                expected: shape.to_vec(),
                actual: a.shape().to_vec(),
                operation: "broadcast_to".to_string(),
            })
        }
    }
    let data = match a.dtype() {
        DType::F32 => broadcast_to_typed::<f32>(a, shape)?,
        DType::F64 => broadcast_to_typed::<f64>(a, shape)?,
    };
    a.like(data, shape.to_vec())
}

fn sum_to_typed<T: Element>(a: &Tensor, shape: &[usize]) -> Result<HostData> {
    let src = a.as_slice::<T>()?;
    let numel: usize = shape.iter().product();
    let mut out = vec![T::zero(); numel];
    for (i, &x) in src.iter().enumerate() {
        let j = broadcast_index(i, a.shape(), shape);
        out[j] = out[j] + x;
    }
    Ok(T::wrap(out))
}

/// Reduces a broadcast result back to `shape` by summing the expanded axes.
/// This is the adjoint of [`broadcast_to`].
pub fn sum_to(a: &Tensor, shape: &[usize]) -> Result<Tensor> {
    if a.shape() == shape {
        return Ok(a.clone());
    }
    match broadcast_shapes(shape, a.shape()) {
        Some(ref out) if out.as_slice() == a.shape() => {}
        _ => {
            return Err(FerrogradError::ShapeMismatch {
                expected: shape.to_vec(),
                actual: a.shape().to_vec(),
                operation: "sum_to".to_string(),
            })
        }
    }
    let data = match a.dtype() {
        DType::F32 => sum_to_typed::<f32>(a, shape)?,
        DType::F64 => sum_to_typed::<f64>(a, shape)?,
    };
    a.like(data, shape.to_vec())
}
