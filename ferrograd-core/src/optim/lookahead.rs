use crate::error::{FerrogradError, Result};
use crate::nn::layer::Layer;
use crate::nn::parameter::Parameter;
use crate::optim::hooks::Hook;
use crate::optim::optimizer_trait::{
    base_state_tensors, load_base_state, partition_state, Optimizer, OptimizerBase,
};
use crate::optim::param_group::ParamGroup;
use crate::optim::unit_interval;
use crate::tensor::Tensor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookaheadConfig {
    /// Inner steps between synchronizations.
    pub k: u64,
    /// Weight of the slow copy in the blend.
    pub alpha: f64,
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        LookaheadConfig { k: 5, alpha: 0.5 }
    }
}

/// Lookahead wrapper around an inner optimizer.
///
/// The inner optimizer moves the fast weights on every step. Every `k`
/// steps the slow copy is blended, `slow = alpha * slow + (1 - alpha) * fast`,
/// and written back into the fast weights. The slow copy of a parameter is
/// taken the first time the parameter is stepped.
#[derive(Debug)]
pub struct Lookahead<O: Optimizer> {
    inner: O,
    base: OptimizerBase,
    config: LookaheadConfig,
}

impl<O: Optimizer> Lookahead<O> {
    pub fn new(inner: O, config: LookaheadConfig) -> Result<Self> {
        if config.k == 0 {
            return Err(FerrogradError::ConfigurationError("k must be at least 1".to_string()));
        }
        unit_interval("alpha", config.alpha)?;
        Ok(Lookahead {
            inner,
            base: OptimizerBase::new("lookahead"),
            config,
        })
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn into_inner(self) -> O {
        self.inner
    }

    fn scope(&self, selection: Option<&[Parameter]>) -> Vec<Parameter> {
        match selection {
            Some(params) => params.to_vec(),
            None => self.base.group().params().cloned().collect(),
        }
    }

    fn snapshot_missing(&mut self, params: &[Parameter]) -> Result<()> {
        for p in params {
            let state = self.base.state_mut().entry(p)?;
            if state.get("slow").is_none() {
                let value = p.value()?;
                state.set_values("slow", &value, value.to_f64_vec())?;
            }
        }
        Ok(())
    }

    fn synchronize(&mut self, params: &[Parameter]) -> Result<()> {
        let alpha = self.config.alpha;
        for p in params {
            let fast = p.value()?;
            let state = self.base.state_mut().entry(p)?;
            let slow = state.values_or_zeros("slow", fast.numel());
            let blended: Vec<f64> = slow
                .iter()
                .zip(fast.to_f64_vec())
                .map(|(s, f)| alpha * s + (1.0 - alpha) * f)
                .collect();
            state.set_values("slow", &fast, blended.clone())?;
            p.set_value(fast.from_f64_like(blended)?)?;
        }
        Ok(())
    }
}

impl<O: Optimizer> Optimizer for Lookahead<O> {
    fn name(&self) -> &'static str {
        "lookahead"
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

    fn setup(&mut self, target: &dyn Layer) -> Result<()> {
        self.inner.setup(target)?;
        self.base.set_group(ParamGroup::from_layer(target));
        Ok(())
    }

    /// Hooks belong to the inner optimizer, which runs them.
    fn add_hook(&mut self, hook: Box<dyn Hook>) {
        self.inner.add_hook(hook);
    }

    fn update(&mut self, selection: Option<&[Parameter]>) -> Result<()> {
        let params = self.scope(selection);
        self.snapshot_missing(&params)?;
        self.inner.update(selection)?;
        let t = self.base.begin_step();
        if t % self.config.k == 0 {
            log::debug!("lookahead: synchronizing {} parameters at step {}", params.len(), t);
            self.synchronize(&params)?;
        }
        Ok(())
    }

    fn state_tensors(&self) -> Result<Vec<(String, Tensor)>> {
        let mut out = base_state_tensors(self.name(), &self.base)?;
        out.extend(self.inner.state_tensors()?);
        Ok(out)
    }

    fn load_state_tensors(&mut self, tensors: &[(String, Tensor)]) -> Result<()> {
        let (own, inner) = partition_state(self.base.state(), tensors);
        self.inner.load_state_tensors(&inner)?;
        load_base_state("lookahead", &mut self.base, &own)
    }

    fn reset_state(&mut self) {
        self.inner.reset_state();
        self.base.state_mut().clear();
    }
}

#[cfg(test)]
#[path = "lookahead_test.rs"]
mod tests;
