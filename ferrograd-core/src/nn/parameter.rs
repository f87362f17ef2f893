use crate::autograd::Variable;
use crate::error::Result;
use crate::tensor::Tensor;
use std::fmt;
use std::ops::Deref;

/// A [`Variable`] marked as trainable.
///
/// Parameters always require gradients and are never released by graph
/// cleanup: their value belongs to the layer slot that registered them.
/// Cloning shares the underlying node.
#[derive(Clone, PartialEq, Eq)]
pub struct Parameter(Variable);

impl Parameter {
    /// Wraps `value` in a fresh trainable node called `name`.
    pub fn new(value: Tensor, name: impl Into<String>) -> Result<Self> {
        Self::from_variable(Variable::named(value, name))
    }

    /// Promotes an existing leaf variable to a parameter.
    pub fn from_variable(variable: Variable) -> Result<Self> {
        variable.mark_parameter()?;
        Ok(Parameter(variable))
    }

    pub fn variable(&self) -> &Variable {
        &self.0
    }

    /// Consumes the Parameter and returns the underlying Variable.
    pub fn into_inner(self) -> Variable {
        self.0
    }
}

impl Deref for Parameter {
    type Target = Variable;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter({:?})", self.0)
    }
}

#[cfg(test)]
#[path = "parameter_test.rs"]
mod tests;
