use crate::error::{FerrogradError, Result};
use crate::kernels;
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;

/// Offset added to the total norm before dividing.
pub const CLIP_EPS: f64 = 1e-6;

/// Gradients that can be clipped: present and finite. Non-finite
/// gradients are left alone and reported at `warn`.
fn finite_grads(parameters: &[Parameter], operation: &str) -> Result<Vec<(Parameter, Tensor)>> {
    let mut out = Vec::with_capacity(parameters.len());
    for p in parameters {
        if let Some(g) = p.grad_tensor()? {
            if g.is_finite() {
                out.push((p.clone(), g));
            } else {
                log::warn!("{}: skipping non-finite gradient of {}", operation, p.label());
            }
        }
    }
    Ok(out)
}

/// Clips gradient of a set of parameters in place.
///
/// The gradients are clipped element-wise into `[-clip_value, clip_value]`.
///
/// # Errors
///
/// `ConfigurationError` if `clip_value` is negative.
pub fn clip_grad_value_(parameters: &[Parameter], clip_value: f64) -> Result<()> {
    if clip_value < 0.0 {
        return Err(FerrogradError::ConfigurationError(
            "clip_value must be non-negative".to_string(),
        ));
    }
    for (p, g) in finite_grads(parameters, "clip_grad_value_")? {
        let clipped: Vec<f64> = g
            .to_f64_vec()
            .into_iter()
            .map(|v| v.clamp(-clip_value, clip_value))
            .collect();
        p.set_grad(g.from_f64_like(clipped)?)?;
    }
    Ok(())
}

/// L2 norm of all finite gradients, viewed as one concatenated vector.
pub fn total_grad_norm(parameters: &[Parameter]) -> Result<f64> {
    let mut sum_sq = 0.0;
    for (_, g) in finite_grads(parameters, "total_grad_norm")? {
        sum_sq += g.to_f64_vec().iter().map(|v| v * v).sum::<f64>();
    }
    Ok(sum_sq.sqrt())
}

/// Clips the overall L2 norm of the gradients in place.
///
/// Every finite gradient is scaled by `min(1, max_norm / (norm + eps))`.
/// Returns the norm measured before scaling.
///
/// # Errors
///
/// `ConfigurationError` if `max_norm` is negative.
pub fn clip_grad_norm_(parameters: &[Parameter], max_norm: f64) -> Result<f64> {
    if max_norm < 0.0 {
        return Err(FerrogradError::ConfigurationError(
            "max_norm must be non-negative".to_string(),
        ));
    }
    let grads = finite_grads(parameters, "clip_grad_norm_")?;
    let total_norm = grads
        .iter()
        .map(|(_, g)| g.to_f64_vec().iter().map(|v| v * v).sum::<f64>())
        .sum::<f64>()
        .sqrt();

    let coef = (max_norm / (total_norm + CLIP_EPS)).min(1.0);
    if coef < 1.0 {
        for (p, g) in grads {
            p.set_grad(kernels::scale(&g, coef)?)?;
        }
        log::trace!("clip_grad_norm_: norm {:.4e} scaled by {:.4e}", total_norm, coef);
    }
    Ok(total_norm)
}

#[cfg(test)]
#[path = "grad_clipping_test.rs"]
mod tests;
