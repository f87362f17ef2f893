pub mod linear;
pub mod relu;
pub mod residual;
pub mod sequential;

// Re-export key layer structs
pub use linear::Linear;
pub use relu::ReLU;
pub use residual::Residual;
pub use sequential::Sequential;

use crate::autograd::Variable;
use crate::error::{FerrogradError, Result};

/// The single input of a one-in layer, or `ArityMismatch`.
pub(crate) fn single_input<'a>(inputs: &'a [Variable], layer: &str) -> Result<&'a Variable> {
    match inputs {
        [x] => Ok(x),
        _ => Err(FerrogradError::ArityMismatch {
            expected: 1,
            actual: inputs.len(),
            operation: layer.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "layers_test.rs"]
mod tests;
