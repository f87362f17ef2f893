use crate::error::Result;
use crate::nn::parameter::Parameter;
use crate::optim::optimizer_trait::{Optimizer, OptimizerBase};
use crate::optim::{positive, Operands};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaGradConfig {
    pub lr: f64,
    pub eps: f64,
}

impl Default for AdaGradConfig {
    fn default() -> Self {
        AdaGradConfig { lr: 0.001, eps: 1e-8 }
    }
}

/// AdaGrad: `h += g²; value -= lr * g / (sqrt(h) + eps)`.
#[derive(Debug)]
pub struct AdaGrad {
    base: OptimizerBase,
    config: AdaGradConfig,
}

impl AdaGrad {
    pub fn new(config: AdaGradConfig) -> Result<Self> {
        positive("lr", config.lr)?;
        positive("eps", config.eps)?;
        Ok(AdaGrad {
            base: OptimizerBase::new("adagrad"),
            config,
        })
    }
}

impl Optimizer for AdaGrad {
    fn name(&self) -> &'static str {
        "adagrad"
    }

    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn update_one(&mut self, param: &Parameter) -> Result<()> {
        let Some(mut ops) = Operands::load(param, "adagrad")? else {
            return Ok(());
        };
        let AdaGradConfig { lr, eps } = self.config;
        let state = self.base.state_mut().entry(param)?;
        let mut h = state.values_or_zeros("h", ops.w.len());
        for ((h, w), g) in h.iter_mut().zip(ops.w.iter_mut()).zip(&ops.g) {
            *h += g * g;
            *w -= lr * g / (h.sqrt() + eps);
        }
        state.set_values("h", &ops.value, h)?;
        ops.store(param)
    }
}

#[cfg(test)]
#[path = "adagrad_test.rs"]
mod tests;
