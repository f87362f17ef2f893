use std::collections::{BTreeMap, HashMap};

use crate::autograd::VariableId;
use crate::buffer::HostData;
use crate::error::{FerrogradError, Result};
use crate::nn::parameter::Parameter;
use crate::optim::param_group::ParamGroup;
use crate::tensor::Tensor;

/// Auxiliary tensors (moments, accumulators, snapshots) for one parameter.
///
/// Slots either match the parameter's shape or are rank-0 per-tensor
/// statistics. The entry remembers the shape it was built for so it can be
/// invalidated when the parameter changes shape.
#[derive(Debug, Clone, Default)]
pub struct ParamState {
    shape: Vec<usize>,
    slots: BTreeMap<String, Tensor>,
}

impl ParamState {
    pub fn get(&self, slot: &str) -> Option<&Tensor> {
        self.slots.get(slot)
    }

    /// Slot values as f64, or `n` zeros if the slot is new.
    pub fn values_or_zeros(&self, slot: &str, n: usize) -> Vec<f64> {
        self.slots
            .get(slot)
            .map(|t| t.to_f64_vec())
            .unwrap_or_else(|| vec![0.0; n])
    }

    pub fn scalar(&self, slot: &str) -> Option<f64> {
        self.slots.get(slot).and_then(|t| t.item().ok())
    }

    pub fn set(&mut self, slot: &str, value: Tensor) {
        self.slots.insert(slot.to_string(), value);
    }

    /// Stores `values` with the shape, dtype, device and pool of `template`.
    pub fn set_values(&mut self, slot: &str, template: &Tensor, values: Vec<f64>) -> Result<()> {
        self.set(slot, template.from_f64_like(values)?);
        Ok(())
    }

    pub fn set_scalar(&mut self, slot: &str, template: &Tensor, value: f64) -> Result<()> {
        let t = template.like(HostData::from_f64_vec(template.dtype(), vec![value]), Vec::new())?;
        self.set(slot, t);
        Ok(())
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Per-parameter optimizer state keyed by parameter identity, plus named
/// optimizer-wide scalars.
///
/// Persistence keys are `"{param}.{owner}.{slot}"` for parameter slots and
/// `"@{owner}.{name}"` for scalars, where `owner` is the optimizer name.
/// Parameter names may themselves contain dots.
#[derive(Debug, Clone)]
pub struct StateStore {
    owner: &'static str,
    entries: HashMap<VariableId, ParamState>,
    globals: BTreeMap<String, f64>,
}

impl StateStore {
    pub fn new(owner: &'static str) -> Self {
        StateStore {
            owner,
            entries: HashMap::new(),
            globals: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.globals.is_empty()
    }

    pub fn get(&self, id: VariableId) -> Option<&ParamState> {
        self.entries.get(&id)
    }

    /// State for `param`, created empty on first use. An entry built for a
    /// different shape is discarded first.
    pub fn entry(&mut self, param: &Parameter) -> Result<&mut ParamState> {
        let shape = param.shape()?;
        let entry = self.entries.entry(param.id()).or_default();
        if entry.shape != shape {
            if !entry.slots.is_empty() {
                log::debug!(
                    "{}: parameter {} changed shape {:?} -> {:?}, state reset",
                    self.owner,
                    param.id(),
                    entry.shape,
                    shape
                );
            }
            *entry = ParamState {
                shape,
                slots: BTreeMap::new(),
            };
        }
        Ok(entry)
    }

    pub fn remove(&mut self, id: VariableId) -> Option<ParamState> {
        self.entries.remove(&id)
    }

    /// Drops state for parameters that are no longer part of `group`.
    pub fn retain_group(&mut self, group: &ParamGroup) {
        let before = self.entries.len();
        self.entries.retain(|id, _| group.contains(*id));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            log::debug!("{}: dropped state for {} departed parameters", self.owner, dropped);
        }
    }

    pub fn global(&self, name: &str) -> Option<f64> {
        self.globals.get(name).copied()
    }

    pub fn set_global(&mut self, name: &str, value: f64) {
        self.globals.insert(name.to_string(), value);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.globals.clear();
    }

    /// Flattened key → tensor view for persistence, in group order.
    pub fn to_tensors(&self, group: &ParamGroup) -> Result<Vec<(String, Tensor)>> {
        let mut out = Vec::new();
        for (name, value) in &self.globals {
            out.push((format!("@{}.{}", self.owner, name), Tensor::new_f64(vec![*value], Vec::new())?));
        }
        for (name, p) in group.iter() {
            if let Some(state) = self.entries.get(&p.id()) {
                for (slot, t) in state.slots() {
                    out.push((format!("{}.{}.{}", name, self.owner, slot), t.clone()));
                }
            }
        }
        Ok(out)
    }

    /// Whether `key` was produced by a store with this owner.
    pub fn owns_key(&self, key: &str) -> bool {
        match parse_key(key) {
            Some(StateKey::Global { owner, .. }) | Some(StateKey::Slot { owner, .. }) => owner == self.owner,
            None => false,
        }
    }

    /// Replaces the whole state with `tensors`.
    ///
    /// Every key must belong to this owner and name a parameter of `group`
    /// (`MissingKey`), and every slot must match its parameter's shape or
    /// be rank-0 (`ShapeMismatch`). Nothing is replaced unless all keys
    /// validate.
    pub fn load_tensors(&mut self, group: &ParamGroup, tensors: &[(String, Tensor)]) -> Result<()> {
        let mut entries: HashMap<VariableId, ParamState> = HashMap::new();
        let mut globals = BTreeMap::new();
        for (key, tensor) in tensors {
            match parse_key(key) {
                Some(StateKey::Global { owner, name }) if owner == self.owner => {
                    globals.insert(name.to_string(), tensor.item()?);
                }
                Some(StateKey::Slot { param, owner, slot }) if owner == self.owner => {
                    let p = group
                        .find(param)
                        .ok_or_else(|| FerrogradError::MissingKey(key.clone()))?;
                    let current = p.value()?;
                    if tensor.rank() != 0 && tensor.shape() != current.shape() {
                        return Err(FerrogradError::ShapeMismatch {
                            expected: current.shape().to_vec(),
                            actual: tensor.shape().to_vec(),
                            operation: format!("load_state({})", key),
                        });
                    }
                    let data = HostData::from_f64_vec(current.dtype(), tensor.to_f64_vec());
                    let value = current.like(data, tensor.shape().to_vec())?;
                    entries
                        .entry(p.id())
                        .or_insert_with(|| ParamState {
                            shape: current.shape().to_vec(),
                            slots: BTreeMap::new(),
                        })
                        .set(slot, value);
                }
                _ => return Err(FerrogradError::MissingKey(key.clone())),
            }
        }
        self.entries = entries;
        self.globals = globals;
        Ok(())
    }
}

enum StateKey<'a> {
    Global { owner: &'a str, name: &'a str },
    Slot { param: &'a str, owner: &'a str, slot: &'a str },
}

fn parse_key(key: &str) -> Option<StateKey<'_>> {
    if let Some(rest) = key.strip_prefix('@') {
        let (owner, name) = rest.split_once('.')?;
        return Some(StateKey::Global { owner, name });
    }
    let (head, slot) = key.rsplit_once('.')?;
    let (param, owner) = head.rsplit_once('.')?;
    Some(StateKey::Slot { param, owner, slot })
}
