use std::path::Path;

use crate::error::{FerrogradError, Result};
use crate::nn::layer::Layer;
use crate::nn::parameter::Parameter;
use crate::optim::hooks::Hook;
use crate::optim::optimizer_state::StateStore;
use crate::optim::param_group::ParamGroup;
use crate::persist;
use crate::tensor::Tensor;

/// Bookkeeping shared by every optimizer: the target parameters, the hook
/// pipeline, auxiliary state and the step counter.
#[derive(Debug)]
pub struct OptimizerBase {
    group: ParamGroup,
    hooks: Vec<Box<dyn Hook>>,
    state: StateStore,
    steps: u64,
}

impl OptimizerBase {
    pub fn new(owner: &'static str) -> Self {
        OptimizerBase {
            group: ParamGroup::default(),
            hooks: Vec::new(),
            state: StateStore::new(owner),
            steps: 0,
        }
    }

    pub fn group(&self) -> &ParamGroup {
        &self.group
    }

    pub fn hooks(&self) -> &[Box<dyn Hook>] {
        &self.hooks
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateStore {
        &mut self.state
    }

    /// Number of completed `update` calls.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub(crate) fn set_group(&mut self, group: ParamGroup) {
        self.group = group;
        self.state.retain_group(&self.group);
    }

    pub(crate) fn begin_step(&mut self) -> u64 {
        self.steps += 1;
        self.steps
    }
}

/// Trait defining the common interface for all optimizers.
///
/// An optimizer is set up on one target layer, keeps a pipeline of
/// [`Hook`]s and applies its rule to each selected parameter. Per-parameter
/// auxiliary state lives in the base's [`StateStore`], keyed by parameter
/// identity.
pub trait Optimizer {
    /// Short lowercase name, also the owner tag of persisted state keys.
    fn name(&self) -> &'static str;

    fn base(&self) -> &OptimizerBase;

    fn base_mut(&mut self) -> &mut OptimizerBase;

    /// Applies the rule to a single parameter using its current gradient.
    ///
    /// # Errors
    ///
    /// `InvalidUpdateCall` for optimizers whose step couples parameters.
    fn update_one(&mut self, param: &Parameter) -> Result<()>;

    /// Registers the trainable parameters of `target`. State held for
    /// parameters no longer in the target is dropped.
    fn setup(&mut self, target: &dyn Layer) -> Result<()> {
        let group = ParamGroup::from_layer(target);
        log::debug!("{}: set up on {} parameters", self.name(), group.len());
        self.base_mut().set_group(group);
        Ok(())
    }

    /// Appends `hook` to the pipeline run by [`Optimizer::prepare`], after the
    /// hooks already registered.
    fn add_hook(&mut self, hook: Box<dyn Hook>) {
        self.base_mut().hooks.push(hook);
    }

    /// Selects parameters, runs the hook pipeline and advances the step
    /// counter. Returns the parameters that still hold a gradient.
    ///
    /// With no `selection`, every target parameter holding a gradient is
    /// selected.
    fn prepare(&mut self, selection: Option<&[Parameter]>) -> Result<Vec<Parameter>> {
        let selected = match selection {
            Some(params) => {
                let mut out = Vec::with_capacity(params.len());
                for p in params {
                    if p.grad_tensor()?.is_some() {
                        out.push(p.clone());
                    }
                }
                out
            }
            None => self.base().group.with_grads()?,
        };
        for hook in self.base().hooks() {
            log::trace!("{}: running hook {}", self.name(), hook.name());
            hook.apply(&selected)?;
        }
        self.base_mut().begin_step();

        let mut remaining = Vec::with_capacity(selected.len());
        for p in selected {
            if p.grad_tensor()?.is_some() {
                remaining.push(p);
            }
        }
        Ok(remaining)
    }

    /// One optimization step: [`Optimizer::prepare`] then
    /// [`Optimizer::update_one`] for each remaining parameter.
    ///
    /// # Arguments
    ///
    /// * `selection` - Parameters to step. `None` steps every target
    ///   parameter that currently holds a gradient.
    ///
    /// # Errors
    ///
    /// Whatever a hook or the update rule returns; `ShapeMismatch` from rules
    /// that do not skip a gradient of the wrong shape.
    fn update(&mut self, selection: Option<&[Parameter]>) -> Result<()> {
        let params = self.prepare(selection)?;
        for p in &params {
            self.update_one(p)?;
        }
        log::debug!("{}: step {} updated {} parameters", self.name(), self.base().steps(), params.len());
        Ok(())
    }

    /// Flattened auxiliary state, including the step counter.
    fn state_tensors(&self) -> Result<Vec<(String, Tensor)>> {
        base_state_tensors(self.name(), self.base())
    }

    /// Restores state produced by [`Optimizer::state_tensors`]. The
    /// optimizer must already be set up on a layer with the same parameter
    /// names.
    fn load_state_tensors(&mut self, tensors: &[(String, Tensor)]) -> Result<()> {
        let name = self.name();
        load_base_state(name, self.base_mut(), tensors)
    }

    /// Writes [`Optimizer::state_tensors`] to `dir` as an archive whose index
    /// records the step count.
    ///
    /// # Errors
    ///
    /// `Io` or `Serialization` when the directory cannot be written.
    fn save_state(&self, dir: &Path) -> Result<()> {
        persist::write_archive(dir, &self.state_tensors()?, Some(self.base().steps()))
    }

    /// Reads an archive written by [`Optimizer::save_state`].
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory holding `index.json` and the tensor files.
    ///
    /// # Errors
    ///
    /// `MissingKey` if a key names a parameter or owner this optimizer does
    /// not have, or if the step counter is absent.
    fn load_state(&mut self, dir: &Path) -> Result<()> {
        let archive = persist::read_archive(dir)?;
        let mut tensors = Vec::with_capacity(archive.len());
        for entry in &archive.entries {
            tensors.push((entry.name.clone(), entry.to_tensor(None)?));
        }
        self.load_state_tensors(&tensors)
    }

    /// Clears all auxiliary state. The step counter is kept.
    fn reset_state(&mut self) {
        log::debug!("{}: state reset", self.name());
        self.base_mut().state.clear();
    }
}

fn steps_key(name: &str) -> String {
    format!("@{}.steps", name)
}

/// The step counter and [`StateStore`] contents of `base` as named tensors.
pub(crate) fn base_state_tensors(name: &str, base: &OptimizerBase) -> Result<Vec<(String, Tensor)>> {
    let mut out = vec![(steps_key(name), Tensor::new_f64(vec![base.steps as f64], Vec::new())?)];
    out.extend(base.state.to_tensors(&base.group)?);
    Ok(out)
}

/// Inverse of [`base_state_tensors`]. The step counter key is required.
pub(crate) fn load_base_state(name: &str, base: &mut OptimizerBase, tensors: &[(String, Tensor)]) -> Result<()> {
    let key = steps_key(name);
    let steps = match tensors.iter().find(|(k, _)| *k == key) {
        Some((_, t)) => t.item()? as u64,
        None => return Err(FerrogradError::MissingKey(key)),
    };
    let rest: Vec<(String, Tensor)> = tensors.iter().filter(|(k, _)| *k != key).cloned().collect();
    base.state.load_tensors(&base.group, &rest)?;
    base.steps = steps;
    Ok(())
}

/// Splits a wrapper optimizer's tensors into the ones `own` owns and the rest.
pub(crate) fn partition_state(
    own: &StateStore,
    tensors: &[(String, Tensor)],
) -> (Vec<(String, Tensor)>, Vec<(String, Tensor)>) {
    tensors.iter().cloned().partition(|(k, _)| own.owns_key(k))
}
