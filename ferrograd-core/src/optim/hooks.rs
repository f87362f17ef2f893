use std::collections::HashSet;
use std::fmt::Debug;

use crate::autograd::VariableId;
use crate::error::{FerrogradError, Result};
use crate::kernels;
use crate::nn::parameter::Parameter;
use crate::optim::grad_clipping::clip_grad_norm_;

/// A pre-update transformation over the full selected parameter set.
///
/// Hooks run in registration order before any per-parameter rule and see
/// only parameters that hold a gradient.
pub trait Hook: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, params: &[Parameter]) -> Result<()>;
}

/// Global-norm gradient clipping.
#[derive(Debug, Clone)]
pub struct GradientClipping {
    max_norm: f64,
}

impl GradientClipping {
    pub fn new(max_norm: f64) -> Result<Self> {
        if !(max_norm > 0.0) {
            return Err(FerrogradError::ConfigurationError(format!(
                "max_norm must be positive, got {}",
                max_norm
            )));
        }
        Ok(GradientClipping { max_norm })
    }
}

impl Hook for GradientClipping {
    fn name(&self) -> &'static str {
        "gradient_clipping"
    }

    fn apply(&self, params: &[Parameter]) -> Result<()> {
        clip_grad_norm_(params, self.max_norm).map(|_| ())
    }
}

/// L2 penalty folded into the gradient: `grad += rate * value`.
#[derive(Debug, Clone)]
pub struct WeightDecay {
    rate: f64,
}

impl WeightDecay {
    pub fn new(rate: f64) -> Result<Self> {
        if rate < 0.0 || !rate.is_finite() {
            return Err(FerrogradError::ConfigurationError(format!(
                "weight decay rate must be non-negative, got {}",
                rate
            )));
        }
        Ok(WeightDecay { rate })
    }
}

impl Hook for WeightDecay {
    fn name(&self) -> &'static str {
        "weight_decay"
    }

    fn apply(&self, params: &[Parameter]) -> Result<()> {
        for p in params {
            let Some(g) = p.grad_tensor()? else { continue };
            if !g.is_finite() {
                log::warn!("weight_decay: skipping non-finite gradient of {}", p.label());
                continue;
            }
            let decay = kernels::scale(&p.value()?, self.rate)?;
            p.set_grad(kernels::add(&g, &decay)?)?;
        }
        Ok(())
    }
}

/// Drops the gradients of a protected subset so no rule updates them.
#[derive(Debug, Clone, Default)]
pub struct FreezeParams {
    frozen: HashSet<VariableId>,
}

impl FreezeParams {
    pub fn new<'a>(params: impl IntoIterator<Item = &'a Parameter>) -> Self {
        FreezeParams {
            frozen: params.into_iter().map(|p| p.id()).collect(),
        }
    }

    pub fn is_frozen(&self, param: &Parameter) -> bool {
        self.frozen.contains(&param.id())
    }
}

impl Hook for FreezeParams {
    fn name(&self) -> &'static str {
        "freeze_params"
    }

    fn apply(&self, params: &[Parameter]) -> Result<()> {
        for p in params.iter().filter(|p| self.is_frozen(p)) {
            p.clear_grad()?;
        }
        Ok(())
    }
}
