use std::sync::Arc;

use rand::Rng;

use crate::autograd::Variable;
use crate::config::Context;
use crate::error::{FerrogradError, Result};
use crate::nn::init::{self, Init};
use crate::nn::layer::{Layer, Registry, WeightOwner};
use crate::nn::layers::single_input;
use crate::nn::parameter::Parameter;
use crate::ops::linear_op;
use crate::parallel::WorkerPool;
use crate::tensor::Tensor;

/// Applies a linear transformation to the incoming data: `y = x·Wᵀ + b`.
///
/// `W` has shape `[out_features, in_features]` and `b` shape
/// `[out_features]`. Batches with more rows than the context's
/// `parallel_threshold` are split across its worker pool.
#[derive(Debug)]
pub struct Linear {
    registry: Registry,
    in_features: usize,
    out_features: usize,
    workers: Option<Arc<WorkerPool>>,
}

impl Linear {
    /// Creates a new Linear layer on the context's device and dtype.
    ///
    /// The weight is Kaiming-uniform initialized from `rng`, the bias
    /// starts at zero.
    pub fn new<R: Rng + ?Sized>(
        ctx: &Context,
        in_features: usize,
        out_features: usize,
        has_bias: bool,
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(FerrogradError::ConfigurationError(format!(
                "linear layer needs positive sizes, got {} -> {}",
                in_features, out_features
            )));
        }
        let weight = ctx.zeros(&[out_features, in_features])?;
        let bias = if has_bias { Some(ctx.zeros(&[out_features])?) } else { None };
        let workers = if ctx.config().max_workers > 1 {
            Some(ctx.workers()?)
        } else {
            None
        };
        let layer = Self::from_tensors(weight, bias)?.with_workers(workers);
        init::init_weights(&layer, &Init::KaimingUniform, &Init::Constant(0.0), rng)?;
        Ok(layer)
    }

    /// Builds the layer around explicit weight (`[out, in]`) and bias
    /// (`[out]`) values.
    pub fn from_tensors(weight: Tensor, bias: Option<Tensor>) -> Result<Self> {
        let (out_features, in_features) = match weight.shape() {
            [o, i] => (*o, *i),
            other => {
                return Err(FerrogradError::ShapeMismatch {
                    expected: vec![0, 0],
                    actual: other.to_vec(),
                    operation: "Linear::from_tensors".to_string(),
                })
            }
        };
        let mut registry = Registry::new();
        registry.register_param("W", Parameter::new(weight, "W")?);
        if let Some(b) = bias {
            if b.shape() != [out_features] {
                return Err(FerrogradError::ShapeMismatch {
                    expected: vec![out_features],
                    actual: b.shape().to_vec(),
                    operation: "Linear::from_tensors".to_string(),
                });
            }
            registry.register_param("b", Parameter::new(b, "b")?);
        }
        Ok(Linear {
            registry,
            in_features,
            out_features,
            workers: None,
        })
    }

    pub fn with_workers(mut self, workers: Option<Arc<WorkerPool>>) -> Self {
        self.workers = workers;
        self
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

impl WeightOwner for Linear {
    fn weight(&self) -> Result<&Parameter> {
        self.registry.require_param("W")
    }

    fn bias(&self) -> Option<&Parameter> {
        self.registry.param("b")
    }
}

impl Layer for Linear {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    fn forward(&self, inputs: &[Variable]) -> Result<Vec<Variable>> {
        let x = single_input(inputs, "Linear")?;
        let weight = self.weight()?;
        let y = linear_op(x, weight, self.bias().map(|b| b.variable()), self.workers.clone())?;
        Ok(vec![y])
    }
}
