use std::sync::Arc;

use crate::autograd::{Function, Operation, Variable};
use crate::error::{FerrogradError, Result};
use crate::kernels;
use crate::ops::single_grad;
use crate::parallel::WorkerPool;
use crate::tensor::Tensor;

/// 2-D matrix product.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatMul;

impl Operation for MatMul {
    fn name(&self) -> &'static str {
        "matmul"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![kernels::matmul(&inputs[0], &inputs[1])?])
    }

    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        let (a, b) = (&inputs[0], &inputs[1]);
        Ok(vec![
            Some(kernels::matmul(gy, &kernels::transpose(b)?)?),
            Some(kernels::matmul(&kernels::transpose(a)?, gy)?),
        ])
    }
}

/// `y = x·Wᵀ + b` for `x: [n, in]`, `W: [out, in]` and an optional
/// `b: [out]`.
///
/// With a worker pool attached, batches above the pool threshold have their
/// rows split across workers in both passes.
#[derive(Debug, Clone, Default)]
pub struct Linear {
    pub has_bias: bool,
    pub workers: Option<Arc<WorkerPool>>,
}

impl Linear {
    fn matmul(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        match &self.workers {
            Some(workers) => kernels::matmul_parallel(a, b, workers),
            None => kernels::matmul(a, b),
        }
    }

    fn check(&self, inputs: &[Tensor]) -> Result<()> {
        let (x, w) = (&inputs[0], &inputs[1]);
        if x.rank() != 2 || w.rank() != 2 || x.shape()[1] != w.shape()[1] {
            return Err(FerrogradError::ShapeMismatch {
                expected: vec![w.shape().get(1).copied().unwrap_or(0)],
                actual: x.shape().to_vec(),
                operation: "linear".to_string(),
            });
        }
        if self.has_bias && inputs[2].shape() != [w.shape()[0]] {
            return Err(FerrogradError::ShapeMismatch {
                expected: vec![w.shape()[0]],
                actual: inputs[2].shape().to_vec(),
                operation: "linear bias".to_string(),
            });
        }
        Ok(())
    }
}

impl Operation for Linear {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn arity(&self) -> usize {
        if self.has_bias {
            3
        } else {
            2
        }
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        self.check(inputs)?;
        let y = self.matmul(&inputs[0], &kernels::transpose(&inputs[1])?)?;
        let y = if self.has_bias { kernels::add(&y, &inputs[2])? } else { y };
        Ok(vec![y])
    }

    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        let (x, w) = (&inputs[0], &inputs[1]);
        let gx = self.matmul(gy, w)?;
        let gw = kernels::matmul(&kernels::transpose(gy)?, x)?;
        let mut grads = vec![Some(gx), Some(gw)];
        if self.has_bias {
            grads.push(Some(kernels::sum_to(gy, inputs[2].shape())?));
        }
        Ok(grads)
    }
}

pub fn matmul_op(a: &Variable, b: &Variable) -> Result<Variable> {
    Function::invoke_single(MatMul, &[a, b])
}

/// Applies the linear map, fanning large batches out over `workers`.
pub fn linear_op(
    x: &Variable,
    weight: &Variable,
    bias: Option<&Variable>,
    workers: Option<Arc<WorkerPool>>,
) -> Result<Variable> {
    let op = Linear {
        has_bias: bias.is_some(),
        workers,
    };
    match bias {
        Some(b) => Function::invoke_single(op, &[x, weight, b]),
        None => Function::invoke_single(op, &[x, weight]),
    }
}

#[cfg(test)]
#[path = "linalg_test.rs"]
mod tests;
