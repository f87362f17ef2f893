use crate::autograd::{Function, Operation, Variable};
use crate::error::Result;
use crate::kernels;
use crate::ops::single_grad;
use crate::tensor::Tensor;

/// Sum of all elements into a scalar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl Operation for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![kernels::sum_all(&inputs[0])?])
    }

    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        Ok(vec![Some(kernels::broadcast_to(gy, inputs[0].shape())?)])
    }
}

pub fn sum_op(x: &Variable) -> Result<Variable> {
    Function::invoke_single(Sum, &[x])
}
