use crate::error::Result;
use crate::nn::parameter::Parameter;
use crate::optim::optimizer_trait::{Optimizer, OptimizerBase};
use crate::optim::{positive, unit_interval, Operands};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaDeltaConfig {
    pub rho: f64,
    pub eps: f64,
}

impl Default for AdaDeltaConfig {
    fn default() -> Self {
        AdaDeltaConfig { rho: 0.95, eps: 1e-6 }
    }
}

/// AdaDelta. Keeps running averages of squared gradients (`h`) and of
/// squared updates (`u`); there is no learning rate.
#[derive(Debug)]
pub struct AdaDelta {
    base: OptimizerBase,
    config: AdaDeltaConfig,
}

impl AdaDelta {
    pub fn new(config: AdaDeltaConfig) -> Result<Self> {
        unit_interval("rho", config.rho)?;
        positive("eps", config.eps)?;
        Ok(AdaDelta {
            base: OptimizerBase::new("adadelta"),
            config,
        })
    }
}

impl Optimizer for AdaDelta {
    fn name(&self) -> &'static str {
        "adadelta"
    }

    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn update_one(&mut self, param: &Parameter) -> Result<()> {
        let Some(mut ops) = Operands::load(param, "adadelta")? else {
            return Ok(());
        };
        let AdaDeltaConfig { rho, eps } = self.config;
        let state = self.base.state_mut().entry(param)?;
        let n = ops.w.len();
        let mut h = state.values_or_zeros("h", n);
        let mut u = state.values_or_zeros("u", n);
        for i in 0..n {
            let g = ops.g[i];
            h[i] = rho * h[i] + (1.0 - rho) * g * g;
            let dx = (u[i] + eps).sqrt() / (h[i] + eps).sqrt() * g;
            u[i] = rho * u[i] + (1.0 - rho) * dx * dx;
            ops.w[i] -= dx;
        }
        state.set_values("h", &ops.value, h)?;
        state.set_values("u", &ops.value, u)?;
        ops.store(param)
    }
}

#[cfg(test)]
#[path = "adadelta_test.rs"]
mod tests;
