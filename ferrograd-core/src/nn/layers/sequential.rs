use crate::autograd::Variable;
use crate::error::Result;
use crate::nn::layer::{Layer, Registry};

/// Ordered chain of named child layers. Each child's outputs are the next
/// child's inputs.
#[derive(Debug, Default)]
pub struct Sequential {
    registry: Registry,
}

impl Sequential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `layer` under `name`. Reusing a name replaces that child in
    /// its original position.
    pub fn add<L: Layer + 'static>(mut self, name: impl Into<String>, layer: L) -> Self {
        self.registry.register_layer(name, layer);
        self
    }

    pub fn len(&self) -> usize {
        self.registry.layers().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Layer for Sequential {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    fn forward(&self, inputs: &[Variable]) -> Result<Vec<Variable>> {
        let mut current = inputs.to_vec();
        for (name, layer) in self.registry.layers() {
            log::trace!("sequential: running '{}'", name);
            current = layer.forward(&current)?;
        }
        Ok(current)
    }
}
