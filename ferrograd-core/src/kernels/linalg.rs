use std::ops::Range;

use crate::buffer::{Element, HostData};
use crate::error::{FerrogradError, Result};
use crate::kernels::{check_same_device, check_same_dtype};
use crate::parallel::WorkerPool;
use crate::tensor::Tensor;
use crate::types::DType;

fn check_matmul(a: &Tensor, b: &Tensor) -> Result<(usize, usize, usize)> {
    check_same_device(a, b, "matmul")?;
    check_same_dtype(a, b, "matmul")?;
    if a.rank() != 2 || b.rank() != 2 || a.shape()[1] != b.shape()[0] {
        return Err(FerrogradError::ShapeMismatch {
            expected: vec![a.shape().get(1).copied().unwrap_or(0)],
            actual: b.shape().to_vec(),
            operation: "matmul".to_string(),
        });
    }
    Ok((a.shape()[0], a.shape()[1], b.shape()[1]))
}

fn matmul_rows<T: Element>(a: &[T], b: &[T], k: usize, n: usize, rows: Range<usize>) -> Vec<T> {
    let mut out = vec![T::zero(); rows.len() * n];
    for (r, i) in rows.enumerate() {
        let row = &a[i * k..(i + 1) * k];
        let dst = &mut out[r * n..(r + 1) * n];
        for (p, &x) in row.iter().enumerate() {
            let src = &b[p * n..(p + 1) * n];
            for (o, &y) in dst.iter_mut().zip(src.iter()) {
                *o = *o + x * y;
            }
        }
    }
    out
}

/// 2-D matrix product `[m, k] x [k, n] -> [m, n]`.
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let (m, k, n) = check_matmul(a, b)?;
    let data = match a.dtype() {
        DType::F32 => HostData::F32(matmul_rows(a.as_slice::<f32>()?, b.as_slice::<f32>()?, k, n, 0..m)),
        DType::F64 => HostData::F64(matmul_rows(a.as_slice::<f64>()?, b.as_slice::<f64>()?, k, n, 0..m)),
    };
    a.like(data, vec![m, n])
}

/// Same as [`matmul`], with the rows of `a` split across `workers` when the
/// batch is above the pool threshold.
pub fn matmul_parallel(a: &Tensor, b: &Tensor, workers: &WorkerPool) -> Result<Tensor> {
    let (m, k, n) = check_matmul(a, b)?;
    if !workers.should_fan_out(m) {
        return matmul(a, b);
    }
    let data = match a.dtype() {
        DType::F32 => {
            let (xa, xb) = (a.as_slice::<f32>()?, b.as_slice::<f32>()?);
            HostData::F32(workers.fan_out_rows(m, |rows| Ok(matmul_rows(xa, xb, k, n, rows)))?)
        }
        DType::F64 => {
            let (xa, xb) = (a.as_slice::<f64>()?, b.as_slice::<f64>()?);
            HostData::F64(workers.fan_out_rows(m, |rows| Ok(matmul_rows(xa, xb, k, n, rows)))?)
        }
    };
    a.like(data, vec![m, n])
}

fn transpose_typed<T: Element>(a: &[T], rows: usize, cols: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(a.len());
    for j in 0..cols {
        for i in 0..rows {
            out.push(a[i * cols + j]);
        }
    }
    out
}

/// Transposes a 2-D tensor.
pub fn transpose(a: &Tensor) -> Result<Tensor> {
    if a.rank() != 2 {
        return Err(FerrogradError::ShapeMismatch {
            expected: vec![0, 0],
            actual: a.shape().to_vec(),
            operation: "transpose".to_string(),
        });
    }
    let (rows, cols) = (a.shape()[0], a.shape()[1]);
    let data = match a.dtype() {
        DType::F32 => HostData::F32(transpose_typed(a.as_slice::<f32>()?, rows, cols)),
        DType::F64 => HostData::F64(transpose_typed(a.as_slice::<f64>()?, rows, cols)),
    };
    a.like(data, vec![cols, rows])
}
