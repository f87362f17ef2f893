use crate::error::Result;
use crate::nn::parameter::Parameter;
use crate::optim::optimizer_trait::{Optimizer, OptimizerBase};
use crate::optim::{non_negative, positive, unit_interval, Operands};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamConfig {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        AdamConfig {
            lr: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }
}

impl AdamConfig {
    pub fn validate(&self) -> Result<()> {
        positive("lr", self.lr)?;
        unit_interval("beta1", self.beta1)?;
        unit_interval("beta2", self.beta2)?;
        positive("eps", self.eps)
    }
}

/// Moment update shared by Adam and AdamW.
///
/// Updates `m` and `v` in place and returns the step direction
/// `lr_t * m / (sqrt(v) + eps)` with the bias-corrected rate for step `t`.
fn adam_direction(config: &AdamConfig, t: u64, m: &mut [f64], v: &mut [f64], g: &[f64]) -> Vec<f64> {
    let AdamConfig { lr, beta1, beta2, eps } = *config;
    let t = t.max(1) as i32;
    let lr_t = lr * (1.0 - beta2.powi(t)).sqrt() / (1.0 - beta1.powi(t));
    m.iter_mut()
        .zip(v.iter_mut())
        .zip(g)
        .map(|((m, v), g)| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            lr_t * *m / (v.sqrt() + eps)
        })
        .collect()
}

/// Adam optimizer. First and second moments are kept per parameter.
#[derive(Debug)]
pub struct Adam {
    base: OptimizerBase,
    config: AdamConfig,
}

impl Adam {
    pub fn new(config: AdamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Adam {
            base: OptimizerBase::new("adam"),
            config,
        })
    }
}

impl Optimizer for Adam {
    fn name(&self) -> &'static str {
        "adam"
    }

    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn update_one(&mut self, param: &Parameter) -> Result<()> {
        let Some(mut ops) = Operands::load(param, "adam")? else {
            return Ok(());
        };
        let t = self.base.steps();
        let state = self.base.state_mut().entry(param)?;
        let n = ops.w.len();
        let mut m = state.values_or_zeros("m", n);
        let mut v = state.values_or_zeros("v", n);
        let step = adam_direction(&self.config, t, &mut m, &mut v, &ops.g);
        for (w, d) in ops.w.iter_mut().zip(step) {
            *w -= d;
        }
        state.set_values("m", &ops.value, m)?;
        state.set_values("v", &ops.value, v)?;
        ops.store(param)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdamWConfig {
    pub adam: AdamConfig,
    pub weight_decay: f64,
    /// Cap on each parameter's gradient L2 norm.
    pub max_grad_norm: f64,
    /// Cap on each parameter's update L2 norm.
    pub max_update_norm: f64,
}

impl Default for AdamWConfig {
    fn default() -> Self {
        AdamWConfig {
            adam: AdamConfig::default(),
            weight_decay: 0.01,
            max_grad_norm: 1.0,
            max_update_norm: 1.0,
        }
    }
}

fn l2(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Scales `values` in place so their L2 norm is at most `cap`.
fn cap_norm(values: &mut [f64], cap: f64) {
    let norm = l2(values);
    if norm > cap {
        let scale = cap / norm;
        values.iter_mut().for_each(|v| *v *= scale);
    }
}

/// Adam with decoupled weight decay and per-parameter norm caps.
///
/// A parameter whose gradient has the wrong shape or contains non-finite
/// values is skipped with a warning instead of failing the step.
#[derive(Debug)]
pub struct AdamW {
    base: OptimizerBase,
    config: AdamWConfig,
}

impl AdamW {
    pub fn new(config: AdamWConfig) -> Result<Self> {
        config.adam.validate()?;
        non_negative("weight_decay", config.weight_decay)?;
        positive("max_grad_norm", config.max_grad_norm)?;
        positive("max_update_norm", config.max_update_norm)?;
        Ok(AdamW {
            base: OptimizerBase::new("adamw"),
            config,
        })
    }
}

impl Optimizer for AdamW {
    fn name(&self) -> &'static str {
        "adamw"
    }

    fn base(&self) -> &OptimizerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptimizerBase {
        &mut self.base
    }

    fn update_one(&mut self, param: &Parameter) -> Result<()> {
        let Some(grad) = param.grad_tensor()? else {
            return Ok(());
        };
        let value = param.value()?;
        if grad.shape() != value.shape() {
            log::warn!(
                "adamw: gradient shape {:?} does not match parameter {} shape {:?}, update skipped",
                grad.shape(),
                param.label(),
                value.shape()
            );
            return Ok(());
        }
        if !grad.is_finite() {
            log::warn!("adamw: non-finite gradient for {}, update skipped", param.label());
            return Ok(());
        }
        let Some(mut ops) = Operands::load(param, "adamw")? else {
            return Ok(());
        };
        cap_norm(&mut ops.g, self.config.max_grad_norm);

        let t = self.base.steps();
        let state = self.base.state_mut().entry(param)?;
        let n = ops.w.len();
        let mut m = state.values_or_zeros("m", n);
        let mut v = state.values_or_zeros("v", n);
        let mut step = adam_direction(&self.config.adam, t, &mut m, &mut v, &ops.g);
        let decay = self.config.adam.lr * self.config.weight_decay;
        for (d, w) in step.iter_mut().zip(&ops.w) {
            *d += decay * w;
        }
        cap_norm(&mut step, self.config.max_update_norm);
        for (w, d) in ops.w.iter_mut().zip(step) {
            *w -= d;
        }
        state.set_values("m", &ops.value, m)?;
        state.set_values("v", &ops.value, v)?;
        ops.store(param)
    }
}

#[cfg(test)]
#[path = "adam_test.rs"]
mod tests;
