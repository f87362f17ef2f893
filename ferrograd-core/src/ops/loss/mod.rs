use crate::autograd::{Function, Operation, Variable};
use crate::error::Result;
use crate::kernels::{self, UnaryOp};
use crate::ops::single_grad;
use crate::tensor::Tensor;

/// Shared forward/backward of the squared-error losses, scaled by `scale`.
fn squared_error_forward(inputs: &[Tensor], scale: f64) -> Result<Tensor> {
    kernels::check_same_shape(&inputs[0], &inputs[1], "squared_error")?;
    let diff = kernels::sub(&inputs[0], &inputs[1])?;
    let total = kernels::sum_all(&kernels::unary(&diff, UnaryOp::Square)?)?;
    kernels::scale(&total, scale)
}

fn squared_error_backward(inputs: &[Tensor], gy: &Tensor, scale: f64) -> Result<Vec<Option<Tensor>>> {
    let diff = kernels::sub(&inputs[0], &inputs[1])?;
    let gd = kernels::mul(&kernels::scale(&diff, 2.0 * scale)?, gy)?;
    let gt = kernels::neg(&gd)?;
    Ok(vec![Some(gd), Some(gt)])
}

/// `Σ (y - t)²`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredError;

impl Operation for SquaredError {
    fn name(&self) -> &'static str {
        "squared_error"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![squared_error_forward(inputs, 1.0)?])
    }

    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        squared_error_backward(inputs, single_grad(grad_outputs, self.name())?, 1.0)
    }
}

/// `Σ (y - t)² / N` where `N` is the element count.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredError;

impl MeanSquaredError {
    fn scale(inputs: &[Tensor]) -> f64 {
        1.0 / inputs[0].numel().max(1) as f64
    }
}

impl Operation for MeanSquaredError {
    fn name(&self) -> &'static str {
        "mean_squared_error"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![squared_error_forward(inputs, Self::scale(inputs))?])
    }

    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        squared_error_backward(inputs, single_grad(grad_outputs, self.name())?, Self::scale(inputs))
    }
}

pub fn squared_error_op(prediction: &Variable, target: &Variable) -> Result<Variable> {
    Function::invoke_single(SquaredError, &[prediction, target])
}

pub fn mse_op(prediction: &Variable, target: &Variable) -> Result<Variable> {
    Function::invoke_single(MeanSquaredError, &[prediction, target])
}

#[cfg(test)]
#[path = "loss_test.rs"]
mod tests;
