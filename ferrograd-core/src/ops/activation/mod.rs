use crate::autograd::{Function, Operation, Variable};
use crate::error::Result;
use crate::kernels::{self, UnaryOp};
use crate::ops::single_grad;
use crate::tensor::Tensor;

/// Rectified linear unit, `max(x, 0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relu;

impl Operation for Relu {
    fn name(&self) -> &'static str {
        "relu"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![kernels::unary(&inputs[0], UnaryOp::Relu)?])
    }

    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        let mask = kernels::unary(&inputs[0], UnaryOp::Step)?;
        Ok(vec![Some(kernels::mul(gy, &mask)?)])
    }
}

pub fn relu_op(x: &Variable) -> Result<Variable> {
    Function::invoke_single(Relu, &[x])
}
