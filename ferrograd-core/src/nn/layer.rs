use std::fmt;
use std::path::Path;
use std::slice;

use crate::autograd::{Variable, VariableId};
use crate::device::StorageDevice;
use crate::error::{FerrogradError, Result};
use crate::nn::parameter::Parameter;
use crate::persist;

/// One named attribute of a layer: a trainable parameter or a nested layer.
#[derive(Debug)]
pub enum Slot {
    Param(Parameter),
    Layer(Box<dyn Layer>),
}

impl From<Parameter> for Slot {
    fn from(p: Parameter) -> Self {
        Slot::Param(p)
    }
}

impl From<Box<dyn Layer>> for Slot {
    fn from(l: Box<dyn Layer>) -> Self {
        Slot::Layer(l)
    }
}

/// Ordered attribute table owned by every layer.
///
/// Registration order is traversal order, which keeps `params()` and the
/// weight archive layout deterministic. The recorded call ids are
/// diagnostic only and never keep the variables alive.
#[derive(Debug, Default)]
pub struct Registry {
    slots: Vec<(String, Slot)>,
    last_inputs: Vec<VariableId>,
    last_outputs: Vec<VariableId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under `name`. Re-registering a name replaces the
    /// slot in place and returns the previous value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Slot>) -> Option<Slot> {
        let name = name.into();
        let value = value.into();
        if let Slot::Param(p) = &value {
            let named = p.name().and_then(|existing| match existing {
                Some(_) => Ok(()),
                None => p.set_name(name.clone()),
            });
            if let Err(e) = named {
                log::warn!("could not name parameter registered as '{}': {}", name, e);
            }
        }
        match self.slots.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => {
                log::debug!("replacing layer attribute '{}'", name);
                Some(std::mem::replace(slot, value))
            }
            None => {
                self.slots.push((name, value));
                None
            }
        }
    }

    /// Alias of [`Registry::set_attribute`].
    pub fn register_trainable(&mut self, name: impl Into<String>, value: impl Into<Slot>) -> Option<Slot> {
        self.set_attribute(name, value)
    }

    pub fn register_param(&mut self, name: impl Into<String>, param: Parameter) -> Option<Slot> {
        self.set_attribute(name, Slot::Param(param))
    }

    pub fn register_layer<L: Layer + 'static>(&mut self, name: impl Into<String>, layer: L) -> Option<Slot> {
        self.set_attribute(name, Slot::Layer(Box::new(layer)))
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        match self.get(name) {
            Some(Slot::Param(p)) => Some(p),
            _ => None,
        }
    }

    /// Like [`Registry::param`] but a missing slot is a `MissingKey` error.
    pub fn require_param(&self, name: &str) -> Result<&Parameter> {
        self.param(name)
            .ok_or_else(|| FerrogradError::MissingKey(name.to_string()))
    }

    pub fn layer(&self, name: &str) -> Option<&dyn Layer> {
        match self.get(name) {
            Some(Slot::Layer(l)) => Some(l.as_ref()),
            _ => None,
        }
    }

    /// Direct child layers in registration order.
    pub fn layers(&self) -> impl Iterator<Item = (&str, &dyn Layer)> {
        self.slots.iter().filter_map(|(n, s)| match s {
            Slot::Layer(l) => Some((n.as_str(), l.as_ref())),
            Slot::Param(_) => None,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn params(&self) -> Params<'_> {
        Params {
            stack: vec![self.slots.iter()],
        }
    }

    pub fn named_params(&self) -> NamedParams<'_> {
        NamedParams {
            stack: vec![(String::new(), self.slots.iter())],
        }
    }

    pub fn last_inputs(&self) -> &[VariableId] {
        &self.last_inputs
    }

    pub fn last_outputs(&self) -> &[VariableId] {
        &self.last_outputs
    }

    pub(crate) fn record_call(&mut self, inputs: &[Variable], outputs: &[Variable]) {
        self.last_inputs = inputs.iter().map(Variable::id).collect();
        self.last_outputs = outputs.iter().map(Variable::id).collect();
    }
}

/// Depth-first walk over every reachable parameter.
pub struct Params<'a> {
    stack: Vec<slice::Iter<'a, (String, Slot)>>,
}

impl<'a> Iterator for Params<'a> {
    type Item = &'a Parameter;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.last_mut()?.next() {
                None => {
                    self.stack.pop();
                }
                Some((_, Slot::Param(p))) => return Some(p),
                Some((_, Slot::Layer(l))) => self.stack.push(l.registry().slots.iter()),
            }
        }
    }
}

/// Same walk as [`Params`], yielding dot-joined hierarchical names.
pub struct NamedParams<'a> {
    stack: Vec<(String, slice::Iter<'a, (String, Slot)>)>,
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

impl<'a> Iterator for NamedParams<'a> {
    type Item = (String, &'a Parameter);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (prefix, iter) = self.stack.last_mut()?;
            match iter.next() {
                None => {
                    self.stack.pop();
                }
                Some((name, Slot::Param(p))) => return Some((join(prefix.as_str(), name), p)),
                Some((name, Slot::Layer(l))) => {
                    let child = join(prefix.as_str(), name);
                    self.stack.push((child, l.registry().slots.iter()));
                }
            }
        }
    }
}

/// A named, nestable container of parameters and sub-layers.
///
/// Implementors own a [`Registry`] and provide the forward rule; everything
/// else (parameter enumeration, gradient clearing, device migration and
/// weight persistence) is derived from the registry.
pub trait Layer: fmt::Debug + Send + Sync {
    fn registry(&self) -> &Registry;

    fn registry_mut(&mut self) -> &mut Registry;

    /// The layer-specific forward rule.
    fn forward(&self, inputs: &[Variable]) -> Result<Vec<Variable>>;

    /// Runs [`Layer::forward`] and records the ids of this call's inputs and
    /// outputs.
    fn call(&mut self, inputs: &[Variable]) -> Result<Vec<Variable>> {
        let outputs = self.forward(inputs)?;
        self.registry_mut().record_call(inputs, &outputs);
        Ok(outputs)
    }

    /// Lazy depth-first sequence of every reachable parameter, in
    /// registration order. Each call starts a fresh walk.
    fn params(&self) -> Params<'_> {
        self.registry().params()
    }

    fn named_params(&self) -> NamedParams<'_> {
        self.registry().named_params()
    }

    /// Releases every parameter's gradient cell. Returns how many buffers
    /// were freed.
    fn clear_grads(&self) -> Result<usize> {
        let mut freed = 0;
        for p in self.params() {
            if p.clear_grad()? {
                freed += 1;
            }
        }
        Ok(freed)
    }

    /// Re-materializes every parameter on `device`.
    fn to_device(&self, device: StorageDevice) -> Result<()> {
        for p in self.params() {
            p.materialize_on(device)?;
        }
        log::debug!("moved layer parameters to {}", device.label());
        Ok(())
    }

    /// Writes the flattened name → value map under `dir`.
    fn save_weights(&self, dir: &Path) -> Result<()> {
        let mut tensors = Vec::new();
        for (name, p) in self.named_params() {
            tensors.push((name, p.value()?));
        }
        persist::write_archive(dir, &tensors, None)
    }

    /// Loads an archive written by [`Layer::save_weights`].
    ///
    /// Every archived key must name a current parameter (`MissingKey`) of the
    /// same shape and dtype. All keys are checked before any value is
    /// written, so a failed load leaves the layer untouched. Parameters the
    /// archive does not mention keep their values.
    fn load_weights(&self, dir: &Path) -> Result<()> {
        let archive = persist::read_archive(dir)?;
        let targets: Vec<(String, &Parameter)> = self.named_params().collect();

        let mut plan = Vec::with_capacity(archive.len());
        for entry in &archive.entries {
            let param = targets
                .iter()
                .find(|(n, _)| *n == entry.name)
                .map(|(_, p)| *p)
                .ok_or_else(|| FerrogradError::MissingKey(entry.name.clone()))?;
            let current = param.value()?;
            if current.shape() != entry.shape.as_slice() {
                return Err(FerrogradError::ShapeMismatch {
                    expected: current.shape().to_vec(),
                    actual: entry.shape.clone(),
                    operation: format!("load_weights({})", entry.name),
                });
            }
            if current.dtype() != entry.dtype() {
                return Err(FerrogradError::DtypeMismatch {
                    expected: current.dtype(),
                    actual: entry.dtype(),
                    operation: format!("load_weights({})", entry.name),
                });
            }
            plan.push((param, entry.to_tensor(Some(&current))?));
        }

        for (name, _) in &targets {
            if archive.get(name).is_none() {
                log::warn!("parameter '{}' not present in {}, left unchanged", name, dir.display());
            }
        }
        for (param, value) in plan {
            param.set_value(value)?;
        }
        Ok(())
    }
}

/// Layers that own one weight and an optional bias.
pub trait WeightOwner {
    fn weight(&self) -> Result<&Parameter>;

    fn bias(&self) -> Option<&Parameter>;
}

#[cfg(test)]
#[path = "layer_test.rs"]
mod tests;
