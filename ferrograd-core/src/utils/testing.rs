use std::path::PathBuf;

use crate::autograd::Variable;
use crate::nn::layers::Linear;
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;

/// Checks if a tensor is approximately equal to the expected shape and data.
/// Panics if shapes differ or data differs by more than `tolerance`.
pub fn check_tensor_near(actual: &Tensor, expected_shape: &[usize], expected_data: &[f64], tolerance: f64) {
    assert_eq!(actual.shape(), expected_shape, "Shape mismatch");
    let actual_data = actual.to_f64_vec();
    assert_eq!(actual_data.len(), expected_data.len(), "Data length mismatch");
    for (i, (a, e)) in actual_data.iter().zip(expected_data.iter()).enumerate() {
        let diff = (a - e).abs();
        if diff > tolerance {
            panic!(
                "Data mismatch at index {}: actual={:?}, expected={:?}, diff={:?}, tolerance={:?}",
                i, a, e, diff, tolerance
            );
        }
    }
}

/// An f64 leaf that requires grad.
pub(crate) fn grad_var(data: Vec<f64>, shape: Vec<usize>) -> Variable {
    let t = Tensor::new_f64(data, shape).expect("Failed to create test tensor");
    Variable::new(t).requires_grad_(true)
}

/// A fresh, empty per-process directory under the system temp dir.
pub(crate) fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ferrograd-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// A rank-1 f64 parameter named `name` holding `grad`.
pub(crate) fn param_with_grad(name: &str, value: Vec<f64>, grad: Vec<f64>) -> Parameter {
    let n = value.len();
    let p = Parameter::new(Tensor::new_f64(value, vec![n]).expect("value"), name).expect("parameter");
    let m = grad.len();
    p.set_grad(Tensor::new_f64(grad, vec![m]).expect("grad")).expect("set_grad");
    p
}

/// A single-weight linear layer, `W = [[w]]`, without bias.
pub(crate) fn scalar_linear(w: f64) -> Linear {
    Linear::from_tensors(Tensor::new_f64(vec![w], vec![1, 1]).expect("weight"), None).expect("linear")
}

pub(crate) fn values(p: &Parameter) -> Vec<f64> {
    p.value().expect("value").to_f64_vec()
}
