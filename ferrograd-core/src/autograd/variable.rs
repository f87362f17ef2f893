use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::autograd::function::Function;
use crate::device::StorageDevice;
use crate::error::{FerrogradError, Result};
use crate::kernels;
use crate::tensor::Tensor;
use crate::types::DType;
use crate::value_cell::ValueCell;

static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a [`Variable`]. Two variables wrapping equal values
/// still have distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(u64);

impl VariableId {
    fn next() -> Self {
        VariableId(NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Node state behind a [`Variable`] handle.
#[derive(Debug)]
pub(crate) struct VariableData {
    pub(crate) name: Option<String>,
    pub(crate) value: ValueCell,
    pub(crate) grad: Option<Variable>,
    pub(crate) creator: Option<Function>,
    pub(crate) creator_list: Vec<Function>,
    pub(crate) origins: Vec<Function>,
    pub(crate) clone_source: Option<Variable>,
    pub(crate) generation: u64,
    pub(crate) requires_grad: bool,
    pub(crate) is_parameter: bool,
}

/// A graph node holding a value, its gradient and the edges to the
/// functions that produced it.
///
/// `Variable` is a shared handle: cloning it yields another handle to the
/// same node. Equality and hashing use the [`VariableId`].
#[derive(Clone)]
pub struct Variable {
    pub(crate) data: Arc<RwLock<VariableData>>,
    pub(crate) id: VariableId,
}

impl Variable {
    pub(crate) fn from_parts(value: Option<Tensor>, generation: u64, requires_grad: bool, creator: Option<Function>) -> Self {
        let id = VariableId::next();
        let data = VariableData {
            name: None,
            value: value.map(ValueCell::new).unwrap_or_default(),
            grad: None,
            creator,
            creator_list: Vec::new(),
            origins: Vec::new(),
            clone_source: None,
            generation,
            requires_grad,
            is_parameter: false,
        };
        Variable {
            data: Arc::new(RwLock::new(data)),
            id,
        }
    }

    /// Creates a leaf variable that does not require grad.
    pub fn new(value: Tensor) -> Self {
        Self::from_parts(Some(value), 0, false, None)
    }

    /// Creates a named leaf variable.
    pub fn named(value: Tensor, name: impl Into<String>) -> Self {
        let v = Self::new(value);
        v.write_unchecked().name = Some(name.into());
        v
    }

    /// Builder-style toggle of `requires_grad`.
    pub fn requires_grad_(self, flag: bool) -> Self {
        self.write_unchecked().requires_grad = flag;
        self
    }

    // Only used on handles that cannot have been shared yet.
    fn write_unchecked(&self) -> RwLockWriteGuard<'_, VariableData> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, VariableData>> {
        self.data
            .read()
            .map_err(|_| FerrogradError::LockPoisoned(format!("variable {}", self.id)))
    }

    pub(crate) fn write(&self) -> Result<RwLockWriteGuard<'_, VariableData>> {
        self.data
            .write()
            .map_err(|_| FerrogradError::LockPoisoned(format!("variable {}", self.id)))
    }

    pub fn id(&self) -> VariableId {
        self.id
    }

    pub(crate) fn downgrade(&self) -> WeakVariable {
        WeakVariable {
            data: Arc::downgrade(&self.data),
            id: self.id,
        }
    }

    pub fn name(&self) -> Result<Option<String>> {
        Ok(self.read()?.name.clone())
    }

    pub fn set_name(&self, name: impl Into<String>) -> Result<()> {
        self.write()?.name = Some(name.into());
        Ok(())
    }

    /// Name for log messages: the given name or the id.
    pub(crate) fn label(&self) -> String {
        match self.data.read() {
            Ok(g) => g.name.clone().unwrap_or_else(|| self.id.to_string()),
            Err(_) => self.id.to_string(),
        }
    }

    /// Current value.
    ///
    /// # Errors
    /// `ReleasedValue` if the value cell has been released.
    pub fn value(&self) -> Result<Tensor> {
        self.read()?
            .value
            .get()
            .cloned()
            .ok_or_else(|| FerrogradError::ReleasedValue(self.label()))
    }

    pub fn has_value(&self) -> Result<bool> {
        Ok(!self.read()?.value.is_released())
    }

    /// Swaps the value buffer in place. Identity and edges are unchanged.
    pub fn set_value(&self, value: Tensor) -> Result<()> {
        self.write()?.value.set(value);
        Ok(())
    }

    /// Moves the value (and gradient, if any) to `device` without changing
    /// identity. Empty cells stay empty.
    ///
    /// # Errors
    /// `ResourceExhausted` if the target device's pool capacity would be
    /// exceeded.
    pub fn materialize_on(&self, device: StorageDevice) -> Result<()> {
        let grad = {
            let mut g = self.write()?;
            g.value.materialize_on(device)?;
            g.grad.clone()
        };
        if let Some(grad) = grad {
            grad.write()?.value.materialize_on(device)?;
        }
        Ok(())
    }

    pub fn shape(&self) -> Result<Vec<usize>> {
        Ok(self.value()?.shape().to_vec())
    }

    pub fn dtype(&self) -> Result<DType> {
        Ok(self.value()?.dtype())
    }

    pub fn device(&self) -> Result<StorageDevice> {
        Ok(self.value()?.device())
    }

    pub fn requires_grad(&self) -> Result<bool> {
        Ok(self.read()?.requires_grad)
    }

    pub fn set_requires_grad(&self, flag: bool) -> Result<()> {
        self.write()?.requires_grad = flag;
        Ok(())
    }

    pub fn is_parameter(&self) -> Result<bool> {
        Ok(self.read()?.is_parameter)
    }

    pub(crate) fn mark_parameter(&self) -> Result<()> {
        let mut g = self.write()?;
        g.is_parameter = true;
        g.requires_grad = true;
        Ok(())
    }

    pub fn generation(&self) -> Result<u64> {
        Ok(self.read()?.generation)
    }

    /// The gradient node, if one has been populated.
    pub fn grad(&self) -> Result<Option<Variable>> {
        Ok(self.read()?.grad.clone())
    }

    /// The gradient value, if present and not released.
    pub fn grad_tensor(&self) -> Result<Option<Tensor>> {
        match self.grad()? {
            Some(g) => Ok(g.read()?.value.get().cloned()),
            None => Ok(None),
        }
    }

    /// Replaces the gradient with a fresh node holding `grad`.
    pub fn set_grad(&self, grad: Tensor) -> Result<()> {
        self.write()?.grad = Some(Variable::new(grad));
        Ok(())
    }

    /// Sums `grad` into the existing gradient, or sets it if there is none.
    pub fn accumulate_grad(&self, grad: Tensor) -> Result<()> {
        let summed = match self.grad_tensor()? {
            Some(existing) => kernels::add(&existing, &grad)?,
            None => grad,
        };
        self.set_grad(summed)
    }

    /// Releases the gradient cell. Returns whether a buffer was freed.
    pub fn clear_grad(&self) -> Result<bool> {
        let grad = self.write()?.grad.take();
        match grad {
            Some(g) => g.release(),
            None => Ok(false),
        }
    }

    /// Releases this variable's value cell. Returns whether a buffer was freed.
    pub fn release(&self) -> Result<bool> {
        Ok(self.write()?.value.release())
    }

    pub fn creator(&self) -> Result<Option<Function>> {
        Ok(self.read()?.creator.clone())
    }

    pub(crate) fn set_creator(&self, creator: Function) -> Result<()> {
        self.write()?.creator = Some(creator);
        Ok(())
    }

    pub fn creator_list(&self) -> Result<Vec<Function>> {
        Ok(self.read()?.creator_list.clone())
    }

    /// Registers `function` as a secondary producer of this variable. The
    /// function also records this variable as one of its outputs, so the
    /// gradient flowing into this variable reaches it during backward.
    ///
    /// Backward runs `function` only once every consumer of this variable
    /// has contributed, so it may be attached after those consumers exist.
    ///
    /// # Errors
    /// `ShapeMismatch` if the function's first result does not have this
    /// variable's shape.
    pub fn add_creator(&self, function: &Function) -> Result<()> {
        function.push_output(self)?;
        let generation = function.generation()? + 1;
        let mut g = self.write()?;
        g.generation = g.generation.max(generation);
        if !g.creator_list.contains(function) {
            g.creator_list.push(function.clone());
        }
        Ok(())
    }

    pub fn origins(&self) -> Result<Vec<Function>> {
        Ok(self.read()?.origins.clone())
    }

    /// Records `function` as auxiliary provenance. Origins are walked by the
    /// cleanup engine but not by backward.
    pub fn add_origin(&self, function: &Function) -> Result<()> {
        self.write()?.origins.push(function.clone());
        Ok(())
    }

    pub fn clone_source(&self) -> Result<Option<Variable>> {
        Ok(self.read()?.clone_source.clone())
    }

    pub(crate) fn set_clone_source(&self, source: &Variable) -> Result<()> {
        self.write()?.clone_source = Some(source.clone());
        Ok(())
    }

    /// A variable with no creator: an input or a trainable parameter.
    pub fn is_leaf(&self) -> Result<bool> {
        let g = self.read()?;
        Ok(g.creator.is_none() && g.creator_list.is_empty())
    }

    /// Whether a node currently holds any edge to a function.
    pub fn has_graph_refs(&self) -> Result<bool> {
        let g = self.read()?;
        Ok(g.creator.is_some() || !g.creator_list.is_empty() || !g.origins.is_empty())
    }
}

/// Non-owning handle a function keeps to each of its outputs.
#[derive(Debug, Clone)]
pub(crate) struct WeakVariable {
    data: Weak<RwLock<VariableData>>,
    id: VariableId,
}

impl WeakVariable {
    pub(crate) fn id(&self) -> VariableId {
        self.id
    }

    pub(crate) fn upgrade(&self) -> Option<Variable> {
        self.data.upgrade().map(|data| Variable { data, id: self.id })
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Variable");
        s.field("id", &self.id);
        match self.data.try_read() {
            Ok(g) => {
                s.field("name", &g.name)
                    .field("shape", &g.value.shape())
                    .field("requires_grad", &g.requires_grad)
                    .field("generation", &g.generation)
                    .field("has_creator", &g.creator.is_some());
            }
            Err(_) => {
                s.field("state", &"<locked>");
            }
        }
        s.finish()
    }
}

#[cfg(test)]
#[path = "variable_test.rs"]
mod tests;
