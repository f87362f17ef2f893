use crate::error::Result;
use crate::nn::parameter::Parameter;
use crate::optim::optimizer_trait::{Optimizer, OptimizerBase};
use crate::optim::{non_negative, positive, unit_interval, Operands};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NovoGradConfig {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub weight_decay: f64,
}

impl Default for NovoGradConfig {
    fn default() -> Self {
        NovoGradConfig {
            lr: 0.01,
            beta1: 0.95,
            beta2: 0.98,
            eps: 1e-8,
            weight_decay: 0.0,
        }
    }
}

/// NovoGrad: Adam-like, with a second moment kept per parameter tensor
/// (a running average of the squared gradient norm) rather than per element.
///
/// Non-finite gradients are skipped with a warning.
#[derive(Debug)]
pub struct NovoGrad {
    base: OptimizerBase,
    config: NovoGradConfig,
}

impl NovoGrad {
    pub fn new(config: NovoGradConfig) -> Result<Self> {
        positive("lr", config.lr)?;
        unit_interval("beta1", config.beta1)?;
        unit_interval("beta2", config.beta2)?;
        positive("eps", config.eps)?;
        non_negative("weight_decay", config.weight_decay)?;
        Ok(NovoGrad {
            base: OptimizerBase::new("novograd"),
            config,
        })
    }
}

impl Optimizer for NovoGrad {
    fn name(&self) -> &'static str {
        "novograd"
    }

    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn update_one(&mut self, param: &Parameter) -> Result<()> {
        let Some(mut ops) = Operands::load(param, "novograd")? else {
            return Ok(());
        };
        if ops.g.iter().any(|g| !g.is_finite()) {
            log::warn!("novograd: non-finite gradient for {}, update skipped", param.label());
            return Ok(());
        }
        let NovoGradConfig {
            lr,
            beta1,
            beta2,
            eps,
            weight_decay,
        } = self.config;
        let norm_sq: f64 = ops.g.iter().map(|g| g * g).sum();

        let state = self.base.state_mut().entry(param)?;
        // the first step seeds v with the raw norm
        let v = match state.scalar("v") {
            Some(prev) => beta2 * prev + (1.0 - beta2) * norm_sq,
            None => norm_sq,
        };
        let denom = v.sqrt() + eps;
        let mut m = state.values_or_zeros("m", ops.w.len());
        for ((m, w), g) in m.iter_mut().zip(ops.w.iter_mut()).zip(&ops.g) {
            *m = beta1 * *m + (g / denom + weight_decay * *w);
            *w -= lr * *m;
        }
        state.set_scalar("v", &ops.value, v)?;
        state.set_values("m", &ops.value, m)?;
        ops.store(param)
    }
}

#[cfg(test)]
#[path = "novograd_test.rs"]
mod tests;
