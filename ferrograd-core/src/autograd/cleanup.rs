//! Graph teardown.
//!
//! Nodes hold externally-allocated buffers, and the edge kinds a variable
//! carries (creator, secondary creators, origins) can reach the same node
//! along several paths or form cycles. Teardown therefore runs in two
//! phases: a breadth-first enumeration with identity-keyed visited sets,
//! then a release pass over the enumerated variables in reverse order.

use std::collections::{HashSet, VecDeque};
use std::mem;

use crate::autograd::function::{upgrade_outputs, Function, FunctionId};
use crate::autograd::variable::{Variable, VariableId};

/// Counters returned by a teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub variables_visited: usize,
    pub functions_visited: usize,
    /// Value or gradient cells that actually held a buffer when released.
    pub buffers_released: usize,
}

impl CleanupReport {
    fn merge(&mut self, other: CleanupReport) {
        self.variables_visited += other.variables_visited;
        self.functions_visited += other.functions_visited;
        self.buffers_released += other.buffers_released;
    }
}

/// Tears down one or more graphs sharing a single pair of visited sets, so a
/// subgraph reachable from several roots is released once.
#[derive(Default)]
pub struct GraphCleaner {
    seen_variables: HashSet<VariableId>,
    seen_functions: HashSet<FunctionId>,
    queue: VecDeque<Variable>,
    disposal: Vec<Variable>,
    report: CleanupReport,
}

impl GraphCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerates everything reachable from `root` and releases it.
    pub fn release(&mut self, root: &Variable) -> CleanupReport {
        let before = self.report;
        self.queue.push_back(root.clone());
        self.enumerate();
        let disposal = mem::take(&mut self.disposal);
        for variable in disposal.iter().rev() {
            self.dispose(variable);
        }
        let mut delta = self.report;
        delta.variables_visited -= before.variables_visited;
        delta.functions_visited -= before.functions_visited;
        delta.buffers_released -= before.buffers_released;
        log::debug!(
            "cleanup from {}: {} variables, {} functions, {} buffers released",
            root.id(),
            delta.variables_visited,
            delta.functions_visited,
            delta.buffers_released
        );
        delta
    }

    /// Totals over every root released by this cleaner.
    pub fn report(&self) -> CleanupReport {
        self.report
    }

    fn enumerate(&mut self) {
        while let Some(variable) = self.queue.pop_front() {
            if !self.seen_variables.insert(variable.id()) {
                continue;
            }
            let functions: Vec<Function> = match variable.data.read() {
                Ok(g) => g
                    .creator
                    .iter()
                    .chain(g.creator_list.iter())
                    .chain(g.origins.iter())
                    .cloned()
                    .collect(),
                Err(_) => {
                    log::warn!("variable {} lock poisoned during cleanup, skipping", variable.id());
                    continue;
                }
            };
            log::trace!("cleanup visits {}", variable.id());
            self.report.variables_visited += 1;
            self.disposal.push(variable.clone());
            for function in functions {
                self.enqueue_function(&function, variable.id());
            }
        }
    }

    /// Marks `function` and queues its inputs and every output other than
    /// the variable the traversal came from.
    fn enqueue_function(&mut self, function: &Function, source: VariableId) {
        if !self.seen_functions.insert(function.id()) {
            return;
        }
        let (inputs, outputs) = match function.data.read() {
            Ok(g) => (g.inputs.clone(), upgrade_outputs(&g.outputs)),
            Err(_) => {
                log::warn!("function {} lock poisoned during cleanup, skipping", function.id());
                return;
            }
        };
        self.report.functions_visited += 1;
        self.queue.extend(inputs);
        self.queue.extend(outputs.into_iter().filter(|o| o.id() != source));
    }

    fn dispose(&mut self, variable: &Variable) {
        let (functions, own_grad, is_parameter) = match variable.data.write() {
            Ok(mut g) => {
                let mut functions: Vec<Function> = g.creator.take().into_iter().collect();
                functions.append(&mut g.creator_list);
                functions.append(&mut g.origins);
                g.clone_source = None;
                // Parameters keep their value and gradient for the optimizer.
                let grad = if g.is_parameter { None } else { g.grad.take() };
                (functions, grad, g.is_parameter)
            }
            Err(_) => {
                log::warn!("variable {} lock poisoned during release, skipping", variable.id());
                return;
            }
        };
        for function in &functions {
            self.release_function(function);
        }
        if is_parameter {
            return;
        }
        if let Some(grad) = own_grad {
            self.release_cell(&grad);
        }
        self.release_cell(variable);
    }

    fn release_function(&mut self, function: &Function) {
        let (inputs, outputs) = match function.data.write() {
            Ok(mut g) => (mem::take(&mut g.inputs), mem::take(&mut g.outputs)),
            Err(_) => {
                log::warn!("function {} lock poisoned during release, skipping", function.id());
                return;
            }
        };
        for input in &inputs {
            let is_parameter = match input.data.read() {
                Ok(g) => g.is_parameter,
                Err(_) => continue,
            };
            if !is_parameter {
                self.release_cell(input);
            }
        }
        for output in upgrade_outputs(&outputs) {
            self.release_cell(&output);
        }
    }

    fn release_cell(&mut self, variable: &Variable) {
        match variable.data.write() {
            Ok(mut g) => {
                if g.value.release() {
                    self.report.buffers_released += 1;
                }
            }
            Err(_) => log::warn!("variable {} lock poisoned during release, skipping", variable.id()),
        }
    }
}

/// Tears down the graph reachable from `root`. A `None` root is a no-op.
///
/// # Returns
/// Counts of visited variables and functions and of buffers actually freed.
/// Failures on individual nodes are logged and skipped, never returned.
pub fn cleanup_graph(root: Option<&Variable>) -> CleanupReport {
    match root {
        Some(root) => GraphCleaner::new().release(root),
        None => CleanupReport::default(),
    }
}

/// Tears down several graphs, visiting shared nodes once.
pub fn cleanup_roots<'a, I>(roots: I) -> CleanupReport
where
    I: IntoIterator<Item = &'a Variable>,
{
    let mut cleaner = GraphCleaner::new();
    let mut total = CleanupReport::default();
    for root in roots {
        total.merge(cleaner.release(root));
    }
    total
}

impl Variable {
    /// Releases every buffer reachable from this variable and clears all
    /// graph edges. Trainable parameters keep their value and gradient.
    /// Calling it again is a no-op.
    pub fn cleanup_graph(&self) -> CleanupReport {
        cleanup_graph(Some(self))
    }
}

#[cfg(test)]
#[path = "cleanup_test.rs"]
mod tests;
