//! Reverse-mode gradient propagation.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::autograd::function::{Function, FunctionId};
use crate::autograd::variable::{Variable, VariableId, WeakVariable};
use crate::buffer::HostData;
use crate::error::{FerrogradError, Result};
use crate::kernels;
use crate::tensor::{ones_like, Tensor};

/// Heap entry for a function whose outputs are complete: the highest
/// generation pops first, and among equal generations the most recently
/// created function.
struct Pending {
    generation: u64,
    function: Function,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation && self.function.id() == other.function.id()
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.generation
            .cmp(&other.generation)
            .then_with(|| self.function.id().cmp(&other.function.id()))
    }
}

/// Dependency bookkeeping for one backward pass.
///
/// A function may run once every variable it produces (as creator or as a
/// secondary creator) has received the gradients of all its consumers in the
/// reachable graph. Counts are per edge, so an input used twice by the same
/// function counts twice.
struct Schedule {
    functions: HashMap<FunctionId, Function>,
    /// Inputs of each function that take part in backward, one entry per edge.
    inputs_of: HashMap<FunctionId, Vec<VariableId>>,
    /// Live outputs of each function, one entry per edge.
    outputs_of: HashMap<FunctionId, Vec<WeakVariable>>,
    /// Consumer edges per variable whose function has not run yet.
    consumers: HashMap<VariableId, usize>,
    /// Producer edges per variable.
    producers: HashMap<VariableId, Vec<FunctionId>>,
    /// Producer edges per variable whose function has not run yet.
    unfinished: HashMap<VariableId, usize>,
    /// Outputs of each function still waiting on a consumer.
    blocked: HashMap<FunctionId, usize>,
    ready: BinaryHeap<Pending>,
    done: HashSet<FunctionId>,
}

fn creators_of(variable: &Variable) -> Result<Vec<Function>> {
    let g = variable.read()?;
    Ok(g.creator.iter().chain(g.creator_list.iter()).cloned().collect())
}

impl Schedule {
    /// Walks every function reachable from `root` through creator and
    /// secondary creator edges of grad-requiring variables.
    fn discover(root: &Variable) -> Result<Self> {
        let mut schedule = Schedule {
            functions: HashMap::new(),
            inputs_of: HashMap::new(),
            outputs_of: HashMap::new(),
            consumers: HashMap::new(),
            producers: HashMap::new(),
            unfinished: HashMap::new(),
            blocked: HashMap::new(),
            ready: BinaryHeap::new(),
            done: HashSet::new(),
        };

        let mut stack = creators_of(root)?;
        while let Some(function) = stack.pop() {
            if schedule.functions.contains_key(&function.id()) {
                continue;
            }
            let (inputs, outputs) = {
                let g = function.read()?;
                (g.inputs.clone(), g.outputs.clone())
            };
            let mut input_ids = Vec::with_capacity(inputs.len());
            for input in &inputs {
                if !input.requires_grad()? {
                    continue;
                }
                input_ids.push(input.id());
                *schedule.consumers.entry(input.id()).or_default() += 1;
                stack.extend(creators_of(input)?);
            }
            let live: Vec<WeakVariable> = outputs.into_iter().filter(|w| w.upgrade().is_some()).collect();
            for out in &live {
                schedule.producers.entry(out.id()).or_default().push(function.id());
                *schedule.unfinished.entry(out.id()).or_default() += 1;
            }
            schedule.inputs_of.insert(function.id(), input_ids);
            schedule.outputs_of.insert(function.id(), live);
            schedule.functions.insert(function.id(), function);
        }

        for (vid, fids) in &schedule.producers {
            if schedule.consumers.get(vid).copied().unwrap_or(0) > 0 {
                for fid in fids {
                    *schedule.blocked.entry(*fid).or_default() += 1;
                }
            }
        }
        let unblocked: Vec<FunctionId> = schedule
            .functions
            .keys()
            .filter(|fid| schedule.blocked.get(fid).copied().unwrap_or(0) == 0)
            .copied()
            .collect();
        for fid in unblocked {
            schedule.make_ready(fid)?;
        }
        log::trace!("backward graph from {}: {} functions", root.id(), schedule.functions.len());
        Ok(schedule)
    }

    fn make_ready(&mut self, fid: FunctionId) -> Result<()> {
        if let Some(function) = self.functions.get(&fid) {
            let generation = function.generation()?;
            self.ready.push(Pending {
                generation,
                function: function.clone(),
            });
        }
        Ok(())
    }

    /// Next function to run. A dependency cycle, which only `add_creator`
    /// can introduce, is broken at its highest-generation function.
    fn next(&mut self) -> Result<Option<Function>> {
        while let Some(Pending { function, .. }) = self.ready.pop() {
            if !self.done.contains(&function.id()) {
                return Ok(Some(function));
            }
        }
        let mut best: Option<(u64, FunctionId)> = None;
        for (fid, function) in &self.functions {
            if self.done.contains(fid) {
                continue;
            }
            let key = (function.generation()?, *fid);
            if best.map_or(true, |b| key > b) {
                best = Some(key);
            }
        }
        Ok(best.and_then(|(_, fid)| {
            log::warn!("backward: dependency cycle, forcing {}", fid);
            self.functions.get(&fid).cloned()
        }))
    }

    /// Marks `function` as run. Returns the outputs whose producers have all
    /// run, and unblocks producers of inputs that have no consumer left.
    fn finish(&mut self, function: &Function) -> Result<Vec<Variable>> {
        let fid = function.id();
        self.done.insert(fid);

        let mut unblocked = Vec::new();
        for vid in self.inputs_of.get(&fid).cloned().unwrap_or_default() {
            let Some(count) = self.consumers.get_mut(&vid) else { continue };
            *count = count.saturating_sub(1);
            if *count == 0 {
                for producer in self.producers.get(&vid).into_iter().flatten() {
                    if let Some(b) = self.blocked.get_mut(producer) {
                        *b = b.saturating_sub(1);
                        if *b == 0 {
                            unblocked.push(*producer);
                        }
                    }
                }
            }
        }
        for producer in unblocked {
            self.make_ready(producer)?;
        }

        let mut complete = Vec::new();
        for out in self.outputs_of.get(&fid).into_iter().flatten() {
            let Some(count) = self.unfinished.get_mut(&out.id()) else { continue };
            *count = count.saturating_sub(1);
            if *count == 0 {
                complete.extend(out.upgrade());
            }
        }
        Ok(complete)
    }
}

fn zeros_shaped_like(reference: &Tensor, shape: &[usize]) -> Result<Tensor> {
    let numel: usize = shape.iter().product();
    reference.like(HostData::from_f64_vec(reference.dtype(), vec![0.0; numel]), shape.to_vec())
}

/// Runs the backward rule of one function and accumulates into its inputs.
/// Returns `false` when no gradient reached any of its outputs.
fn run_function(function: &Function) -> Result<bool> {
    let (op, inputs, weak_outputs, output_slots, output_shapes) = {
        let g = function.read()?;
        (
            g.op.clone(),
            g.inputs.clone(),
            g.outputs.clone(),
            g.output_slots.clone(),
            g.output_shapes.clone(),
        )
    };
    if inputs.is_empty() && weak_outputs.is_empty() {
        log::trace!("skipping detached function {}", function.id());
        return Ok(false);
    }

    let mut received: Vec<Option<Tensor>> = vec![None; output_shapes.len()];
    let mut any_grad = None;
    for (weak, &slot) in weak_outputs.iter().zip(output_slots.iter()) {
        let grad = match weak.upgrade() {
            Some(out) => out.grad_tensor()?,
            None => None,
        };
        if let Some(g) = grad {
            if any_grad.is_none() {
                any_grad = Some(g.clone());
            }
            received[slot] = Some(match received[slot].take() {
                Some(prev) => kernels::add(&prev, &g)?,
                None => g,
            });
        }
    }
    let reference = match any_grad {
        Some(t) => t,
        None => {
            log::trace!("no gradient reached {} {}", op.name(), function.id());
            return Ok(false);
        }
    };
    let grad_outputs = received
        .into_iter()
        .zip(output_shapes.iter())
        .map(|(g, shape)| match g {
            Some(t) => Ok(t),
            None => zeros_shaped_like(&reference, shape),
        })
        .collect::<Result<Vec<_>>>()?;

    let input_values = inputs.iter().map(Variable::value).collect::<Result<Vec<_>>>()?;
    let input_grads = op.backward(&input_values, &grad_outputs)?;
    if input_grads.len() != inputs.len() {
        return Err(FerrogradError::InternalError(format!(
            "{} returned {} gradients for {} inputs",
            op.name(),
            input_grads.len(),
            inputs.len()
        )));
    }
    log::trace!("backward through {} {}", op.name(), function.id());

    for (input, grad) in inputs.iter().zip(input_grads) {
        let Some(grad) = grad else { continue };
        if input.requires_grad()? {
            input.accumulate_grad(grad)?;
        }
    }
    Ok(true)
}

impl Variable {
    /// Propagates gradients from this variable to every reachable input that
    /// requires grad.
    ///
    /// A function runs only after every consumer of each variable it produces
    /// has run, so its backward rule sees the complete gradient even when the
    /// variable has secondary creators. Among functions that are ready, the
    /// highest generation runs first. Gradients arriving at a shared input
    /// from several consumers are summed.
    ///
    /// # Arguments
    /// * `retain_grad`: keep the gradients of intermediate variables. When
    ///   `false` a variable's gradient is released once all of its creators
    ///   have consumed it.
    /// * `initialize_grad`: seed an all-ones gradient when none is set.
    ///
    /// # Errors
    /// `MissingGradSeed` if this variable has no gradient, `initialize_grad`
    /// is `false` and it is not a scalar. `ReleasedValue` if an input value
    /// needed by a backward rule has been released.
    pub fn backward(&self, retain_grad: bool, initialize_grad: bool) -> Result<()> {
        if self.grad_tensor()?.is_none() {
            let value = self.value()?;
            if initialize_grad || value.numel() == 1 {
                self.set_grad(ones_like(&value)?)?;
            } else {
                return Err(FerrogradError::MissingGradSeed {
                    shape: value.shape().to_vec(),
                });
            }
        }

        let mut schedule = Schedule::discover(self)?;
        let mut steps = 0usize;
        while let Some(function) = schedule.next()? {
            if run_function(&function)? {
                steps += 1;
            }
            for out in schedule.finish(&function)? {
                if !retain_grad && out != *self {
                    out.clear_grad()?;
                }
            }
        }
        log::debug!("backward from {} ran {} functions", self.id(), steps);
        Ok(())
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
