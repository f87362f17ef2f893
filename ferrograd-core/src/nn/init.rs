use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::Normal;

use crate::error::{FerrogradError, Result};
use crate::nn::layer::WeightOwner;
use crate::nn::parameter::Parameter;

/// Value distributions for parameter initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    Constant(f64),
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std: f64 },
    /// Glorot uniform: `U(-a, a)` with `a = sqrt(6 / (fan_in + fan_out))`.
    XavierUniform,
    /// He uniform for ReLU networks: `U(-a, a)` with `a = sqrt(6 / fan_in)`.
    KaimingUniform,
}

/// `(fan_in, fan_out)` for a weight of the given shape. Linear weights are
/// laid out `[out, in]`.
pub fn fan_in_out(shape: &[usize]) -> (usize, usize) {
    match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [out, inp, rest @ ..] => {
            let receptive: usize = rest.iter().product();
            (inp * receptive, out * receptive)
        }
    }
}

fn uniform<R: Rng + ?Sized>(low: f64, high: f64, n: usize, rng: &mut R) -> Result<Vec<f64>> {
    if !(low < high) {
        return Err(FerrogradError::ConfigurationError(format!(
            "uniform init needs low < high, got [{}, {})",
            low, high
        )));
    }
    let dist = Uniform::new(low, high);
    Ok((0..n).map(|_| dist.sample(rng)).collect())
}

/// Draws `numel(shape)` values from `init`.
pub fn sample<R: Rng + ?Sized>(init: &Init, shape: &[usize], rng: &mut R) -> Result<Vec<f64>> {
    let n: usize = shape.iter().product();
    match *init {
        Init::Constant(c) => Ok(vec![c; n]),
        Init::Uniform { low, high } => uniform(low, high, n, rng),
        Init::Normal { mean, std } => {
            let dist = Normal::new(mean, std)
                .map_err(|e| FerrogradError::ConfigurationError(format!("normal init: {}", e)))?;
            Ok((0..n).map(|_| dist.sample(rng)).collect())
        }
        Init::XavierUniform => {
            let (fan_in, fan_out) = fan_in_out(shape);
            let a = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
            uniform(-a, a, n, rng)
        }
        Init::KaimingUniform => {
            let (fan_in, _) = fan_in_out(shape);
            let a = (6.0 / fan_in.max(1) as f64).sqrt();
            uniform(-a, a, n, rng)
        }
    }
}

/// Overwrites `param`'s value in place, keeping its shape, dtype, device
/// and pool.
pub fn fill<R: Rng + ?Sized>(param: &Parameter, init: &Init, rng: &mut R) -> Result<()> {
    let current = param.value()?;
    let values = sample(init, current.shape(), rng)?;
    param.set_value(current.from_f64_like(values)?)
}

/// Initializes a layer's weight and, if present, its bias.
pub fn init_weights<L, R>(layer: &L, weight: &Init, bias: &Init, rng: &mut R) -> Result<()>
where
    L: WeightOwner + ?Sized,
    R: Rng + ?Sized,
{
    fill(layer.weight()?, weight, rng)?;
    if let Some(b) = layer.bias() {
        fill(b, bias, rng)?;
    }
    Ok(())
}

// --- Tests ---
#[cfg(test)]
#[path = "init_test.rs"]
mod tests;
