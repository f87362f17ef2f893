use crate::error::Result;
use crate::nn::parameter::Parameter;
use crate::optim::optimizer_trait::{Optimizer, OptimizerBase};
use crate::optim::{positive, unit_interval, Operands};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SgdConfig {
    pub lr: f64,
}

impl Default for SgdConfig {
    fn default() -> Self {
        SgdConfig { lr: 0.01 }
    }
}

/// Implements plain Stochastic Gradient Descent: `value -= lr * grad`.
#[derive(Debug)]
pub struct Sgd {
    base: OptimizerBase,
    config: SgdConfig,
}

impl Sgd {
    pub fn new(config: SgdConfig) -> Result<Self> {
        positive("lr", config.lr)?;
        Ok(Sgd {
            base: OptimizerBase::new("sgd"),
            config,
        })
    }

    pub fn config(&self) -> &SgdConfig {
        &self.config
    }
}

impl Optimizer for Sgd {
    fn name(&self) -> &'static str {
        "sgd"
    }

    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn update_one(&mut self, param: &Parameter) -> Result<()> {
        let Some(mut ops) = Operands::load(param, "sgd")? else {
            return Ok(());
        };
        let lr = self.config.lr;
        for (w, g) in ops.w.iter_mut().zip(&ops.g) {
            *w -= lr * g;
        }
        ops.store(param)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumSgdConfig {
    pub lr: f64,
    pub momentum: f64,
}

impl Default for MomentumSgdConfig {
    fn default() -> Self {
        MomentumSgdConfig { lr: 0.01, momentum: 0.9 }
    }
}

/// SGD with a velocity buffer: `v = momentum*v - lr*grad; value += v`.
#[derive(Debug)]
pub struct MomentumSgd {
    base: OptimizerBase,
    config: MomentumSgdConfig,
}

impl MomentumSgd {
    pub fn new(config: MomentumSgdConfig) -> Result<Self> {
        positive("lr", config.lr)?;
        unit_interval("momentum", config.momentum)?;
        Ok(MomentumSgd {
            base: OptimizerBase::new("momentum_sgd"),
            config,
        })
    }
}

impl Optimizer for MomentumSgd {
    fn name(&self) -> &'static str {
        "momentum_sgd"
    }

    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn update_one(&mut self, param: &Parameter) -> Result<()> {
        let Some(mut ops) = Operands::load(param, "momentum_sgd")? else {
            return Ok(());
        };
        let MomentumSgdConfig { lr, momentum } = self.config;
        let state = self.base.state_mut().entry(param)?;
        let mut v = state.values_or_zeros("v", ops.w.len());
        for ((v, w), g) in v.iter_mut().zip(ops.w.iter_mut()).zip(&ops.g) {
            *v = momentum * *v - lr * g;
            *w += *v;
        }
        state.set_values("v", &ops.value, v)?;
        ops.store(param)
    }
}

#[cfg(test)]
#[path = "sgd_test.rs"]
mod tests;
