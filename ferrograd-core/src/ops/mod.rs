//! # Graph operations (`ops`)
//!
//! Every differentiable computation is an [`Operation`] implementation plus
//! an `xxx_op` function that applies it to [`Variable`]s through
//! [`Function::invoke`], recording the function in the graph.
//!
//! - [`arithmetic`]: element-wise add, sub, mul, neg, scale, square, identity.
//! - [`linalg`]: matmul and the fused linear map.
//! - [`activation`]: relu.
//! - [`reduction`]: full sum.
//! - [`loss`]: squared error and mean squared error.
//!
//! [`Operation`]: crate::autograd::Operation
//! [`Function::invoke`]: crate::autograd::Function::invoke

pub mod activation;
pub mod arithmetic;
pub mod linalg;
pub mod loss;
pub mod reduction;

pub use activation::{relu_op, Relu};
pub use arithmetic::{add_op, identity_op, mul_op, neg_op, scale_op, square_op, sub_op, Add, Identity, Mul, Neg, Scale, Square, Sub};
pub use linalg::{linear_op, matmul_op, Linear, MatMul};
pub use loss::{mse_op, squared_error_op, MeanSquaredError, SquaredError};
pub use reduction::{sum_op, Sum};

use crate::error::{FerrogradError, Result};
use crate::tensor::Tensor;

/// Returns the single upstream gradient of a one-output operation.
pub(crate) fn single_grad<'a>(grad_outputs: &'a [Tensor], operation: &str) -> Result<&'a Tensor> {
    match grad_outputs {
        [g] => Ok(g),
        _ => Err(FerrogradError::ArityMismatch {
            expected: 1,
            actual: grad_outputs.len(),
            operation: format!("{} backward", operation),
        }),
    }
}

#[cfg(test)]
#[path = "ops_test.rs"]
mod tests;
