//! Optimizers for training neural networks.
//!
//! This module provides the `Optimizer` trait with its shared bookkeeping
//! (`OptimizerBase`, `ParamGroup`, `StateStore`), the hook pipeline and the
//! concrete update rules.

pub mod adadelta;
pub mod adagrad;
pub mod adam;
pub mod grad_clipping;
pub mod hooks;
pub mod lookahead;
pub mod nadam;
pub mod novograd;
pub mod optimizer_state;
pub mod optimizer_trait;
pub mod param_group;
pub mod rmsprop;
pub mod sgd;
pub mod swa;

// Re-export key items for easier access
pub use adadelta::{AdaDelta, AdaDeltaConfig};
pub use adagrad::{AdaGrad, AdaGradConfig};
pub use adam::{Adam, AdamConfig, AdamW, AdamWConfig};
pub use grad_clipping::{clip_grad_norm_, clip_grad_value_};
pub use hooks::{FreezeParams, GradientClipping, Hook, WeightDecay};
pub use lookahead::{Lookahead, LookaheadConfig};
pub use nadam::{Nadam, NadamConfig};
pub use novograd::{NovoGrad, NovoGradConfig};
pub use optimizer_state::{ParamState, StateStore};
pub use optimizer_trait::{Optimizer, OptimizerBase};
pub use param_group::ParamGroup;
pub use rmsprop::{RmsProp, RmsPropConfig};
pub use sgd::{MomentumSgd, MomentumSgdConfig, Sgd, SgdConfig};
pub use swa::{Swa, SwaConfig};

use crate::error::{FerrogradError, Result};
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;

/// A parameter's value and gradient in host form, ready for an update rule.
pub(crate) struct Operands {
    pub value: Tensor,
    pub w: Vec<f64>,
    pub g: Vec<f64>,
}

impl Operands {
    /// `None` if the parameter holds no gradient. A gradient whose shape
    /// differs from the value is a `ShapeMismatch`.
    pub(crate) fn load(param: &Parameter, operation: &str) -> Result<Option<Self>> {
        let Some(grad) = param.grad_tensor()? else {
            return Ok(None);
        };
        let value = param.value()?;
        if grad.shape() != value.shape() {
            return Err(FerrogradError::ShapeMismatch {
                expected: value.shape().to_vec(),
                actual: grad.shape().to_vec(),
                operation: operation.to_string(),
            });
        }
        Ok(Some(Operands {
            w: value.to_f64_vec(),
            g: grad.to_f64_vec(),
            value,
        }))
    }

    /// Writes `w` back into the parameter's value cell.
    pub(crate) fn store(self, param: &Parameter) -> Result<()> {
        param.set_value(self.value.from_f64_like(self.w)?)
    }
}

pub(crate) fn positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FerrogradError::ConfigurationError(format!("{} must be positive, got {}", name, value)))
    }
}

pub(crate) fn non_negative(name: &str, value: f64) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FerrogradError::ConfigurationError(format!("{} must be non-negative, got {}", name, value)))
    }
}

/// Checks `value` lies in `[0, 1)`.
pub(crate) fn unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(FerrogradError::ConfigurationError(format!("{} must be in [0, 1), got {}", name, value)))
    }
}
