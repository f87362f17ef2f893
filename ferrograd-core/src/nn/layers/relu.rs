use crate::autograd::Variable;
use crate::error::Result;
use crate::nn::layer::{Layer, Registry};
use crate::nn::layers::single_input;
use crate::ops::relu_op;

/// Layer that applies the Rectified Linear Unit (ReLU) activation function.
///
/// This layer does not have any learnable parameters.
#[derive(Debug, Default)]
pub struct ReLU {
    registry: Registry,
}

impl ReLU {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Layer for ReLU {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    fn forward(&self, inputs: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![relu_op(single_input(inputs, "ReLU")?)?])
    }
}
