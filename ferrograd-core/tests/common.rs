use ferrograd_core::nn::layers::Linear;
use ferrograd_core::{Context, DType, EngineConfig, Result, Tensor, Variable};

/// Routes `log` output through the test harness. Safe to call from every test.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An f64 CPU context without a worker pool.
#[allow(dead_code)]
pub fn f64_context() -> Result<Context> {
    Context::new(EngineConfig {
        dtype: DType::F64,
        max_workers: 1,
        ..EngineConfig::default()
    })
}

/// `W = [[1, 2]]`, `b = [0.5]`, allocated in the context pool.
#[allow(dead_code)]
pub fn small_linear(ctx: &Context) -> Result<Linear> {
    Linear::from_tensors(
        ctx.tensor_from_f64(vec![1.0, 2.0], vec![1, 2])?,
        Some(ctx.tensor_from_f64(vec![0.5], vec![1])?),
    )
}

#[allow(dead_code)]
pub fn input(ctx: &Context, data: Vec<f64>, shape: Vec<usize>) -> Result<Variable> {
    Ok(Variable::new(ctx.tensor_from_f64(data, shape)?))
}

#[allow(dead_code)]
pub fn host(t: &Tensor) -> Vec<f64> {
    t.to_f64_vec()
}
