// examples/train_linear.rs
//!
//! Fits a small MLP to `y = 2x₀ - x₁ + 1` with Adam wrapped in Lookahead.
//! Each batch runs inside a `BatchScope`, so the graph built for the batch is
//! released before the optimizer step. Run with `RUST_LOG=debug` to see the
//! engine's logs.

use ferrograd_core::autograd::with_scope;
use ferrograd_core::nn::{Layer, Linear, ReLU, Sequential};
use ferrograd_core::ops::mse_op;
use ferrograd_core::optim::{Adam, AdamConfig, GradientClipping, Lookahead, LookaheadConfig, Optimizer};
use ferrograd_core::{Context, DType, EngineConfig, FerrogradError, StorageDevice, Variable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> Result<(), FerrogradError> {
    env_logger::init();

    let ctx = Context::new(EngineConfig {
        dtype: DType::F64,
        ..EngineConfig::default()
    })?;
    let mut rng = StdRng::seed_from_u64(42);

    let model = Sequential::new()
        .add("fc1", Linear::new(&ctx, 2, 8, true, &mut rng)?)
        .add("act", ReLU::new())
        .add("fc2", Linear::new(&ctx, 8, 1, true, &mut rng)?);

    let mut optimizer = Lookahead::new(Adam::new(AdamConfig { lr: 0.01, ..AdamConfig::default() })?, LookaheadConfig::default())?;
    optimizer.setup(&model)?;
    optimizer.add_hook(Box::new(GradientClipping::new(5.0)?));

    let batch_size = 32;
    for epoch in 0..200 {
        let mut xs = Vec::with_capacity(batch_size * 2);
        let mut ts = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let (a, b): (f64, f64) = (rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            xs.extend([a, b]);
            ts.push(2.0 * a - b + 1.0);
        }

        let loss = with_scope("train-batch", |scope| {
            let x = scope.track(Variable::new(ctx.tensor_from_f64(xs, vec![batch_size, 2])?));
            let t = scope.track(Variable::new(ctx.tensor_from_f64(ts, vec![batch_size, 1])?));
            let y = scope.track(model.forward(&[x])?.remove(0));
            let loss = scope.track(mse_op(&y, &t)?);
            loss.backward(false, false)?;
            loss.value()?.item()
        })?;

        optimizer.update(None)?;
        model.clear_grads()?;

        if epoch % 20 == 0 {
            println!(
                "epoch {:>3}  loss {:.5}  live bytes {}",
                epoch,
                loss,
                ctx.pool().live_bytes(StorageDevice::Cpu)
            );
        }
    }

    let dir = std::env::temp_dir().join("ferrograd-train-linear");
    model.save_weights(&dir)?;
    optimizer.save_state(&dir.join("optimizer"))?;
    println!("weights and optimizer state written to {}", dir.display());
    Ok(())
}
