use crate::autograd::Variable;
use crate::error::{FerrogradError, Result};
use crate::nn::layer::{Layer, Registry};
use crate::nn::layers::single_input;
use crate::ops::add_op;

/// Skip connection: `y = f(x) + x`.
///
/// The skip input is a fork of `x`, and the inner branch's creator is
/// recorded as an origin of `y`. The inner layer must preserve the input
/// shape.
#[derive(Debug)]
pub struct Residual {
    registry: Registry,
}

impl Residual {
    pub fn new<L: Layer + 'static>(inner: L) -> Self {
        let mut registry = Registry::new();
        registry.register_layer("inner", inner);
        Residual { registry }
    }

    fn inner(&self) -> Result<&dyn Layer> {
        self.registry
            .layer("inner")
            .ok_or_else(|| FerrogradError::MissingKey("inner".to_string()))
    }
}

impl Layer for Residual {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    fn forward(&self, inputs: &[Variable]) -> Result<Vec<Variable>> {
        let x = single_input(inputs, "Residual")?;
        let branch = self.inner()?.forward(std::slice::from_ref(x))?;
        let fx = single_input(&branch, "Residual(inner)")?;
        let y = add_op(fx, &x.fork()?)?;
        if let Some(creator) = fx.creator()? {
            y.add_origin(&creator)?;
        }
        Ok(vec![y])
    }
}
