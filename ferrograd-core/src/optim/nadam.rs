use crate::error::{FerrogradError, Result};
use crate::nn::parameter::Parameter;
use crate::optim::adam::AdamConfig;
use crate::optim::optimizer_trait::{Optimizer, OptimizerBase};
use crate::optim::{non_negative, Operands};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NadamConfig {
    pub adam: AdamConfig,
    /// Decay rate ψ of the momentum schedule.
    pub momentum_decay: f64,
}

impl Default for NadamConfig {
    fn default() -> Self {
        NadamConfig {
            adam: AdamConfig {
                lr: 0.002,
                ..AdamConfig::default()
            },
            momentum_decay: 0.004,
        }
    }
}

/// Adam with Nesterov momentum.
///
/// The momentum coefficient follows `μ_t = β1 (1 - 0.5 · 0.96^(t ψ))` and its
/// running product is advanced once per step for all parameters, so only
/// [`Optimizer::update`] may step this optimizer.
#[derive(Debug)]
pub struct Nadam {
    base: OptimizerBase,
    config: NadamConfig,
}

const MU_PRODUCT: &str = "mu_product";

impl Nadam {
    pub fn new(config: NadamConfig) -> Result<Self> {
        config.adam.validate()?;
        non_negative("momentum_decay", config.momentum_decay)?;
        Ok(Nadam {
            base: OptimizerBase::new("nadam"),
            config,
        })
    }

    fn mu(&self, t: u64) -> f64 {
        self.config.adam.beta1 * (1.0 - 0.5 * 0.96f64.powf(t as f64 * self.config.momentum_decay))
    }

    fn step_param(&mut self, param: &Parameter, t: u64, mu_t: f64, mu_next: f64, mu_product: f64) -> Result<()> {
        let Some(mut ops) = Operands::load(param, "nadam")? else {
            return Ok(());
        };
        let AdamConfig { lr, beta1, beta2, eps } = self.config.adam;
        let bias2 = 1.0 - beta2.powi(t as i32);
        let state = self.base.state_mut().entry(param)?;
        let n = ops.w.len();
        let mut m = state.values_or_zeros("m", n);
        let mut v = state.values_or_zeros("v", n);
        for i in 0..n {
            let g = ops.g[i];
            m[i] = beta1 * m[i] + (1.0 - beta1) * g;
            v[i] = beta2 * v[i] + (1.0 - beta2) * g * g;
            let m_hat = mu_next * m[i] / (1.0 - mu_product * mu_next) + (1.0 - mu_t) * g / (1.0 - mu_product);
            let v_hat = v[i] / bias2;
            ops.w[i] -= lr * m_hat / (v_hat.sqrt() + eps);
        }
        state.set_values("m", &ops.value, m)?;
        state.set_values("v", &ops.value, v)?;
        ops.store(param)
    }
}

impl Optimizer for Nadam {
    fn name(&self) -> &'static str {
        "nadam"
    }

    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn update_one(&mut self, _param: &Parameter) -> Result<()> {
        Err(FerrogradError::InvalidUpdateCall(self.name().to_string()))
    }

    fn update(&mut self, selection: Option<&[Parameter]>) -> Result<()> {
        let params = self.prepare(selection)?;
        let t = self.base.steps();
        let mu_t = self.mu(t);
        let mu_next = self.mu(t + 1);
        let mu_product = self.base.state().global(MU_PRODUCT).unwrap_or(1.0) * mu_t;
        self.base.state_mut().set_global(MU_PRODUCT, mu_product);
        for p in &params {
            self.step_param(p, t, mu_t, mu_next, mu_product)?;
        }
        log::debug!("nadam: step {} updated {} parameters", t, params.len());
        Ok(())
    }
}

#[cfg(test)]
#[path = "nadam_test.rs"]
mod tests;
