use crate::error::Result;
use crate::nn::parameter::Parameter;
use crate::optim::optimizer_trait::{Optimizer, OptimizerBase};
use crate::optim::{positive, unit_interval, Operands};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RmsPropConfig {
    pub lr: f64,
    pub alpha: f64,
    pub eps: f64,
}

impl Default for RmsPropConfig {
    fn default() -> Self {
        RmsPropConfig {
            lr: 0.01,
            alpha: 0.99,
            eps: 1e-8,
        }
    }
}

/// RMSprop: `h = αh + (1-α)g²; value -= lr * g / (sqrt(h) + eps)`.
#[derive(Debug)]
pub struct RmsProp {
    base: OptimizerBase,
    config: RmsPropConfig,
}

impl RmsProp {
    pub fn new(config: RmsPropConfig) -> Result<Self> {
        positive("lr", config.lr)?;
        unit_interval("alpha", config.alpha)?;
        positive("eps", config.eps)?;
        Ok(RmsProp {
            base: OptimizerBase::new("rmsprop"),
            config,
        })
    }
}

impl Optimizer for RmsProp {
    fn name(&self) -> &'static str {
        "rmsprop"
    }

    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn update_one(&mut self, param: &Parameter) -> Result<()> {
        let Some(mut ops) = Operands::load(param, "rmsprop")? else {
            return Ok(());
        };
        let RmsPropConfig { lr, alpha, eps } = self.config;
        let state = self.base.state_mut().entry(param)?;
        let mut h = state.values_or_zeros("h", ops.w.len());
        for ((h, w), g) in h.iter_mut().zip(ops.w.iter_mut()).zip(&ops.g) {
            *h = alpha * *h + (1.0 - alpha) * g * g;
            *w -= lr * g / (h.sqrt() + eps);
        }
        state.set_values("h", &ops.value, h)?;
        ops.store(param)
    }
}

#[cfg(test)]
#[path = "rmsprop_test.rs"]
mod tests;
