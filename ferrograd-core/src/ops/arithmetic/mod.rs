use crate::autograd::{Function, Operation, Variable};
use crate::error::Result;
use crate::kernels::{self, UnaryOp};
use crate::ops::single_grad;
use crate::tensor::Tensor;

/// `a + b` with broadcasting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

impl Operation for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![kernels::add(&inputs[0], &inputs[1])?])
    }

    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        Ok(vec![
            Some(kernels::sum_to(gy, inputs[0].shape())?),
            Some(kernels::sum_to(gy, inputs[1].shape())?),
        ])
    }
}

/// `a - b` with broadcasting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sub;

impl Operation for Sub {
    fn name(&self) -> &'static str {
        "sub"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![kernels::sub(&inputs[0], &inputs[1])?])
    }

    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        Ok(vec![
            Some(kernels::sum_to(gy, inputs[0].shape())?),
            Some(kernels::sum_to(&kernels::neg(gy)?, inputs[1].shape())?),
        ])
    }
}

/// Element-wise `a * b` with broadcasting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mul;

impl Operation for Mul {
    fn name(&self) -> &'static str {
        "mul"
    }

    fn arity(&self) -> usize {
        2
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![kernels::mul(&inputs[0], &inputs[1])?])
    }

    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        let (a, b) = (&inputs[0], &inputs[1]);
        Ok(vec![
            Some(kernels::sum_to(&kernels::mul(gy, b)?, a.shape())?),
            Some(kernels::sum_to(&kernels::mul(gy, a)?, b.shape())?),
        ])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Neg;

impl Operation for Neg {
    fn name(&self) -> &'static str {
        "neg"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![kernels::neg(&inputs[0])?])
    }

    fn backward(&self, _inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        Ok(vec![Some(kernels::neg(gy)?)])
    }
}

/// Multiplication by a constant factor.
#[derive(Debug, Clone, Copy)]
pub struct Scale {
    pub factor: f64,
}

impl Operation for Scale {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![kernels::scale(&inputs[0], self.factor)?])
    }

    fn backward(&self, _inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        Ok(vec![Some(kernels::scale(gy, self.factor)?)])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Square;

impl Operation for Square {
    fn name(&self) -> &'static str {
        "square"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![kernels::unary(&inputs[0], UnaryOp::Square)?])
    }

    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        let two_x = kernels::scale(&inputs[0], 2.0)?;
        Ok(vec![Some(kernels::mul(gy, &two_x)?)])
    }
}

/// Passes its input through unchanged. Used to fork a variable into a new
/// graph node that still routes gradient back to the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Operation for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn arity(&self) -> usize {
        1
    }

    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![inputs[0].clone()])
    }

    fn backward(&self, _inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>> {
        let gy = single_grad(grad_outputs, self.name())?;
        Ok(vec![Some(gy.clone())])
    }
}

pub fn add_op(a: &Variable, b: &Variable) -> Result<Variable> {
    Function::invoke_single(Add, &[a, b])
}

pub fn sub_op(a: &Variable, b: &Variable) -> Result<Variable> {
    Function::invoke_single(Sub, &[a, b])
}

pub fn mul_op(a: &Variable, b: &Variable) -> Result<Variable> {
    Function::invoke_single(Mul, &[a, b])
}

pub fn neg_op(a: &Variable) -> Result<Variable> {
    Function::invoke_single(Neg, &[a])
}

pub fn scale_op(a: &Variable, factor: f64) -> Result<Variable> {
    Function::invoke_single(Scale { factor }, &[a])
}

pub fn square_op(a: &Variable) -> Result<Variable> {
    Function::invoke_single(Square, &[a])
}

pub fn identity_op(a: &Variable) -> Result<Variable> {
    Function::invoke_single(Identity, &[a])
}

impl Variable {
    /// Returns a new node sharing this variable's value, recording this
    /// variable as its clone source. Gradient flows back through the fork.
    pub fn fork(&self) -> Result<Variable> {
        let forked = identity_op(self)?;
        forked.set_clone_source(self)?;
        Ok(forked)
    }
}

#[cfg(test)]
#[path = "arithmetic_test.rs"]
mod tests;
