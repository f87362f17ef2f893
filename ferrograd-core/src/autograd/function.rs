use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::autograd::variable::{Variable, WeakVariable};
use crate::error::{FerrogradError, Result};
use crate::tensor::Tensor;

static NEXT_FUNCTION_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a [`Function`], increasing in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u64);

impl FunctionId {
    fn next() -> Self {
        FunctionId(NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Forward and backward rules of a differentiable computation.
///
/// Implementations are stateless with respect to the graph: everything the
/// backward rule needs is handed back to it as the forward input values.
pub trait Operation: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of inputs, fixed for the operation.
    fn arity(&self) -> usize;

    /// Computes the output values. Must validate the shape and dtype contract
    /// of `inputs`.
    fn forward(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>>;

    /// Given dL/d(output) for every output, returns dL/d(input) for every
    /// input, in input order. `None` marks an input that receives no gradient.
    fn backward(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>>;
}

pub(crate) struct FunctionData {
    pub(crate) op: Arc<dyn Operation>,
    pub(crate) inputs: Vec<Variable>,
    pub(crate) outputs: Vec<WeakVariable>,
    /// Result slot each entry of `outputs` receives its value from. Outputs
    /// added through `Variable::add_creator` alias slot 0.
    pub(crate) output_slots: Vec<usize>,
    /// Shape of each forward result.
    pub(crate) output_shapes: Vec<Vec<usize>>,
    pub(crate) generation: u64,
}

/// A graph node applying one [`Operation`].
///
/// A function holds its inputs strongly and its outputs weakly; each output
/// holds the function as its creator.
#[derive(Clone)]
pub struct Function {
    pub(crate) data: Arc<RwLock<FunctionData>>,
    pub(crate) id: FunctionId,
}

impl Function {
    /// Applies `op` to `inputs`, recording the function in the graph.
    ///
    /// # Arguments
    /// * `op` - The operation; its arity must equal `inputs.len()`.
    /// * `inputs` - Input variables, in the order the operation expects.
    ///
    /// # Returns
    /// One fresh variable per forward result, each with this function as its
    /// creator. They require grad when any input does.
    ///
    /// # Errors
    /// `ArityMismatch` for a wrong input count, `ReleasedValue` if an input
    /// has been released, and whatever the operation's forward returns for
    /// shape or dtype violations.
    pub fn invoke<O: Operation + 'static>(op: O, inputs: &[&Variable]) -> Result<Vec<Variable>> {
        if inputs.len() != op.arity() {
            return Err(FerrogradError::ArityMismatch {
                expected: op.arity(),
                actual: inputs.len(),
                operation: op.name().to_string(),
            });
        }
        let mut values = Vec::with_capacity(inputs.len());
        let mut generation = 0;
        let mut requires_grad = false;
        for input in inputs {
            values.push(input.value()?);
            let g = input.read()?;
            generation = generation.max(g.generation);
            requires_grad |= g.requires_grad;
        }

        let results = op.forward(&values)?;
        let output_shapes = results.iter().map(|t| t.shape().to_vec()).collect();

        let id = FunctionId::next();
        let function = Function {
            data: Arc::new(RwLock::new(FunctionData {
                op: Arc::new(op),
                inputs: inputs.iter().map(|v| (*v).clone()).collect(),
                outputs: Vec::new(),
                output_slots: Vec::new(),
                output_shapes,
                generation,
            })),
            id,
        };

        let outputs: Vec<Variable> = results
            .into_iter()
            .map(|t| Variable::from_parts(Some(t), generation + 1, requires_grad, Some(function.clone())))
            .collect();
        {
            let mut g = function.write()?;
            g.outputs = outputs.iter().map(Variable::downgrade).collect();
            g.output_slots = (0..outputs.len()).collect();
        }

        log::trace!(
            "{} {} applied to [{}] -> [{}]",
            function.name(),
            id,
            inputs.iter().map(|v| v.id().to_string()).collect::<Vec<_>>().join(", "),
            outputs.iter().map(|v| v.id().to_string()).collect::<Vec<_>>().join(", "),
        );
        Ok(outputs)
    }

    /// [`Function::invoke`] for single-output operations.
    pub fn invoke_single<O: Operation + 'static>(op: O, inputs: &[&Variable]) -> Result<Variable> {
        let name = op.name();
        Function::invoke(op, inputs)?
            .into_iter()
            .next()
            .ok_or_else(|| FerrogradError::InternalError(format!("{} produced no output", name)))
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, FunctionData>> {
        self.data
            .read()
            .map_err(|_| FerrogradError::LockPoisoned(format!("function {}", self.id)))
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, FunctionData>> {
        self.data
            .write()
            .map_err(|_| FerrogradError::LockPoisoned(format!("function {}", self.id)))
    }

    pub fn id(&self) -> FunctionId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        match self.data.read() {
            Ok(g) => g.op.name(),
            Err(_) => "<poisoned>",
        }
    }

    pub fn generation(&self) -> Result<u64> {
        Ok(self.read()?.generation)
    }

    pub fn inputs(&self) -> Result<Vec<Variable>> {
        Ok(self.read()?.inputs.clone())
    }

    /// Outputs that are still alive.
    pub fn outputs(&self) -> Result<Vec<Variable>> {
        Ok(upgrade_outputs(&self.read()?.outputs))
    }

    /// Whether both edge lists have been cleared by the cleanup engine.
    pub fn is_detached(&self) -> Result<bool> {
        let g = self.read()?;
        Ok(g.inputs.is_empty() && g.outputs.is_empty())
    }

    /// Records `output` as an alias of this function's first result.
    pub(crate) fn push_output(&self, output: &Variable) -> Result<()> {
        let shape = output.shape()?;
        let mut g = self.write()?;
        if g.outputs.iter().any(|o| o.id() == output.id()) {
            return Ok(());
        }
        match g.output_shapes.first() {
            Some(expected) if *expected == shape => {}
            other => {
                return Err(FerrogradError::ShapeMismatch {
                    expected: other.cloned().unwrap_or_default(),
                    actual: shape,
                    operation: format!("add_creator({})", g.op.name()),
                })
            }
        }
        g.outputs.push(output.downgrade());
        g.output_slots.push(0);
        Ok(())
    }
}

pub(crate) fn upgrade_outputs(outputs: &[WeakVariable]) -> Vec<Variable> {
    outputs.iter().filter_map(WeakVariable::upgrade).collect()
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Function {}

impl Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Function");
        s.field("id", &self.id);
        match self.data.try_read() {
            Ok(g) => {
                s.field("op", &g.op.name())
                    .field("generation", &g.generation)
                    .field("inputs", &g.inputs.iter().map(|v| v.id()).collect::<Vec<_>>())
                    .field("outputs", &g.outputs.len());
            }
            Err(_) => {
                s.field("state", &"<locked>");
            }
        }
        s.finish()
    }
}
