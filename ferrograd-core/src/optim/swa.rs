use crate::error::{FerrogradError, Result};
use crate::nn::layer::Layer;
use crate::nn::parameter::Parameter;
use crate::optim::hooks::Hook;
use crate::optim::optimizer_trait::{
    base_state_tensors, load_base_state, partition_state, Optimizer, OptimizerBase,
};
use crate::optim::param_group::ParamGroup;
use crate::tensor::Tensor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwaConfig {
    /// First step whose weights enter the average.
    pub start_step: u64,
    /// Steps between snapshots once averaging has started.
    pub freq: u64,
}

impl Default for SwaConfig {
    fn default() -> Self {
        SwaConfig { start_step: 1, freq: 1 }
    }
}

/// Stochastic Weight Averaging over an inner optimizer.
///
/// From `start_step` on, every `freq` steps the current weights are folded
/// into a running average. [`Swa::swap_swa_weights`] exchanges the model
/// weights with the averages for evaluation; a second call swaps back.
#[derive(Debug)]
pub struct Swa<O: Optimizer> {
    inner: O,
    base: OptimizerBase,
    config: SwaConfig,
    swapped: bool,
}

impl<O: Optimizer> Swa<O> {
    pub fn new(inner: O, config: SwaConfig) -> Result<Self> {
        if config.freq == 0 {
            return Err(FerrogradError::ConfigurationError("freq must be at least 1".to_string()));
        }
        Ok(Swa {
            inner,
            base: OptimizerBase::new("swa"),
            config,
            swapped: false,
        })
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn into_inner(self) -> O {
        self.inner
    }

    /// Whether the averaged weights are currently in the model.
    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    /// Number of snapshots averaged for `param`.
    pub fn snapshot_count(&self, param: &Parameter) -> u64 {
        self.base
            .state()
            .get(param.id())
            .and_then(|s| s.scalar("n"))
            .map_or(0, |n| n as u64)
    }

    fn accumulate(&mut self, params: &[Parameter]) -> Result<()> {
        for p in params {
            let value = p.value()?;
            let w = value.to_f64_vec();
            let state = self.base.state_mut().entry(p)?;
            let n = state.scalar("n").unwrap_or(0.0);
            let avg: Vec<f64> = match state.get("avg") {
                Some(prev) => prev
                    .to_f64_vec()
                    .iter()
                    .zip(&w)
                    .map(|(a, w)| (a * n + w) / (n + 1.0))
                    .collect(),
                None => w,
            };
            state.set_values("avg", &value, avg)?;
            state.set_scalar("n", &value, n + 1.0)?;
        }
        Ok(())
    }

    /// Exchanges each parameter's value with its running average.
    /// Parameters with no average yet are left alone.
    pub fn swap_swa_weights(&mut self) -> Result<()> {
        let params: Vec<Parameter> = self.base.group().params().cloned().collect();
        let mut swapped = 0;
        for p in &params {
            let Some(state) = self.base.state().get(p.id()) else { continue };
            let Some(avg) = state.get("avg").cloned() else { continue };
            let current = p.value()?;
            p.set_value(current.from_f64_like(avg.to_f64_vec())?)?;
            let state = self.base.state_mut().entry(p)?;
            state.set_values("avg", &current, current.to_f64_vec())?;
            swapped += 1;
        }
        self.swapped = !self.swapped;
        log::debug!("swa: swapped {} parameters (averaged weights active: {})", swapped, self.swapped);
        Ok(())
    }

    fn scope(&self, selection: Option<&[Parameter]>) -> Vec<Parameter> {
        match selection {
            Some(params) => params.to_vec(),
            None => self.base.group().params().cloned().collect(),
        }
    }
}

impl<O: Optimizer> Optimizer for Swa<O> {
    fn name(&self) -> &'static str {
        "swa"
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

    fn add_hook(&mut self, hook: Box<dyn Hook>) {
        self.inner.add_hook(hook);
    }

    /// # Errors
    ///
    /// `ConfigurationError` while the averaged weights are swapped in.
    fn update(&mut self, selection: Option<&[Parameter]>) -> Result<()> {
        if self.swapped {
            return Err(FerrogradError::ConfigurationError(
                "swa: averaged weights are swapped in, swap back before updating".to_string(),
            ));
        }
        self.inner.update(selection)?;
        let t = self.base.begin_step();
        let SwaConfig { start_step, freq } = self.config;
        if t >= start_step && (t - start_step) % freq == 0 {
            let params = self.scope(selection);
            log::trace!("swa: snapshot of {} parameters at step {}", params.len(), t);
            self.accumulate(&params)?;
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
        load_base_state("swa", &mut self.base, &own)
    }

    fn reset_state(&mut self) {
        self.inner.reset_state();
        self.base.state_mut().clear();
        self.swapped = false;
    }
}

#[cfg(test)]
#[path = "swa_test.rs"]
mod tests;
