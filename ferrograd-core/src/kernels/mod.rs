//! Reference CPU kernels.
//!
//! These are the primitive numeric operations graph functions call into.
//! Every kernel validates the dtype/device/shape contract of its inputs and
//! allocates its output in the pool of its first input.

pub mod linalg;
pub mod reduction;

pub use linalg::{matmul, matmul_parallel, transpose};
pub use reduction::{broadcast_to, sum_all, sum_to};

use num_traits::Float;

use crate::buffer::{Element, HostData};
use crate::error::{FerrogradError, Result};
use crate::tensor::Tensor;
use crate::types::DType;

/// Element-wise binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn apply<T: Float>(self, a: T, b: T) -> T {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
        }
    }
}

/// Element-wise unary operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
    Square,
    Sqrt,
    Abs,
    Relu,
    /// 1 where the input is positive, 0 elsewhere.
    Step,
    Scale(f64),
    AddScalar(f64),
}

impl UnaryOp {
    fn apply<T: Element>(self, x: T) -> T {
        match self {
            UnaryOp::Neg => -x,
            UnaryOp::Square => x * x,
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Abs => x.abs(),
            UnaryOp::Relu => x.max(T::zero()),
            UnaryOp::Step => {
                if x > T::zero() {
                    T::one()
                } else {
                    T::zero()
                }
            }
            UnaryOp::Scale(s) => x * T::from_f64(s),
            UnaryOp::AddScalar(s) => x + T::from_f64(s),
        }
    }
}

pub(crate) fn check_same_device(a: &Tensor, b: &Tensor, operation: &str) -> Result<()> {
    if a.device() != b.device() {
        return Err(FerrogradError::DeviceMismatch {
            expected: a.device(),
            actual: b.device(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_same_dtype(a: &Tensor, b: &Tensor, operation: &str) -> Result<()> {
    if a.dtype() != b.dtype() {
        return Err(FerrogradError::DtypeMismatch {
            expected: a.dtype(),
            actual: b.dtype(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_same_shape(a: &Tensor, b: &Tensor, operation: &str) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(FerrogradError::ShapeMismatch {
            expected: a.shape().to_vec(),
            actual: b.shape().to_vec(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

/// Computes the numpy-style broadcast of two shapes.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let rank = a.len().max(b.len());
    let mut out = vec![0; rank];
    for i in 0..rank {
        let da = if i < rank - a.len() { 1 } else { a[i - (rank - a.len())] };
        let db = if i < rank - b.len() { 1 } else { b[i - (rank - b.len())] };
        out[i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => return None,
        };
    }
    Some(out)
}

/// Maps a flat index of `out_shape` onto the flat index of a tensor of
/// `in_shape` broadcast into it (right-aligned, size-1 dims pinned to 0).
pub(crate) fn broadcast_index(flat: usize, out_shape: &[usize], in_shape: &[usize]) -> usize {
    let offset = out_shape.len() - in_shape.len();
    let mut rem = flat;
    let mut index = 0;
    let mut stride = 1;
    for d in (0..out_shape.len()).rev() {
        let coord = rem % out_shape[d];
        rem /= out_shape[d];
        if d >= offset {
            let dim = in_shape[d - offset];
            if dim != 1 {
                index += coord * stride;
            }
            stride *= dim;
        }
    }
    index
}

fn binary_typed<T: Element>(a: &Tensor, b: &Tensor, out_shape: &[usize], op: BinaryOp) -> Result<Vec<T>> {
    let xa = a.as_slice::<T>()?;
    let xb = b.as_slice::<T>()?;
    if a.shape() == b.shape() {
        return Ok(xa.iter().zip(xb.iter()).map(|(&x, &y)| op.apply(x, y)).collect());
    }
    let numel: usize = out_shape.iter().product();
    Ok((0..numel)
        .map(|i| {
            let x = xa[broadcast_index(i, out_shape, a.shape())];
            let y = xb[broadcast_index(i, out_shape, b.shape())];
            op.apply(x, y)
        })
        .collect())
}

/// Element-wise binary operation with broadcasting.
///
/// # Errors
/// `DeviceMismatch`, `DtypeMismatch`, or `ShapeMismatch` when the shapes
/// cannot be broadcast together.
pub fn binary(a: &Tensor, b: &Tensor, op: BinaryOp) -> Result<Tensor> {
    check_same_device(a, b, op.name())?;
    check_same_dtype(a, b, op.name())?;
    let out_shape = broadcast_shapes(a.shape(), b.shape()).ok_or_else(|| FerrogradError::ShapeMismatch {
        expected: a.shape().to_vec(),
        actual: b.shape().to_vec(),
        operation: op.name().to_string(),
    })?;
    let data = match a.dtype() {
        DType::F32 => HostData::F32(binary_typed::<f32>(a, b, &out_shape, op)?),
        DType::F64 => HostData::F64(binary_typed::<f64>(a, b, &out_shape, op)?),
    };
    a.like(data, out_shape)
}

fn unary_typed<T: Element>(a: &Tensor, op: UnaryOp) -> Result<HostData> {
    Ok(T::wrap(a.as_slice::<T>()?.iter().map(|&x| op.apply(x)).collect()))
}

/// Element-wise unary operation.
pub fn unary(a: &Tensor, op: UnaryOp) -> Result<Tensor> {
    let data = match a.dtype() {
        DType::F32 => unary_typed::<f32>(a, op)?,
        DType::F64 => unary_typed::<f64>(a, op)?,
    };
    a.like(data, a.shape().to_vec())
}

pub fn add(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    binary(a, b, BinaryOp::Add)
}

pub fn sub(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    binary(a, b, BinaryOp::Sub)
}

pub fn mul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    binary(a, b, BinaryOp::Mul)
}

pub fn div(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    binary(a, b, BinaryOp::Div)
}

pub fn neg(a: &Tensor) -> Result<Tensor> {
    unary(a, UnaryOp::Neg)
}

pub fn scale(a: &Tensor, factor: f64) -> Result<Tensor> {
    unary(a, UnaryOp::Scale(factor))
}

#[cfg(test)]
#[path = "kernels_test.rs"]
mod tests;
