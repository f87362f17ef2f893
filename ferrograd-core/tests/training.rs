use approx::assert_relative_eq;
use ferrograd_core::autograd::with_scope;
use ferrograd_core::nn::{Layer, Linear, WeightOwner};
use ferrograd_core::ops::squared_error_op;
use ferrograd_core::optim::{
    AdamW, AdamWConfig, Lookahead, LookaheadConfig, Nadam, NadamConfig, Optimizer, Sgd, SgdConfig, Swa,
    SwaConfig,
};
use ferrograd_core::{Context, DType, EngineConfig, FerrogradError, Result, StorageDevice, Tensor};

mod common;
use common::{f64_context, host, init_logger, input, small_linear};

#[test]
fn test_linear_regression_step() -> Result<()> {
    init_logger();
    let ctx = f64_context()?;
    let mut model = small_linear(&ctx)?;
    let mut opt = Sgd::new(SgdConfig { lr: 0.1 })?;
    opt.setup(&model)?;

    let x = input(&ctx, vec![1.0, 1.0], vec![1, 2])?;
    let t = input(&ctx, vec![2.0], vec![1, 1])?;
    let y = model.call(&[x])?.remove(0);
    assert_eq!(host(&y.value()?), vec![3.5]);

    let loss = squared_error_op(&y, &t)?;
    assert_relative_eq!(loss.value()?.item()?, 2.25);
    loss.backward(false, false)?;

    // dL/dW = 2 (y - t) xᵀ
    let w = model.weight()?.clone();
    let b = model.bias().cloned().expect("bias");
    assert_eq!(w.grad_tensor()?.map(|g| host(&g)), Some(vec![3.0, 3.0]));
    assert_eq!(b.grad_tensor()?.map(|g| host(&g)), Some(vec![3.0]));

    opt.update(None)?;
    let w_after = host(&w.value()?);
    assert_relative_eq!(w_after[0], 0.7, epsilon = 1e-12);
    assert_relative_eq!(w_after[1], 1.7, epsilon = 1e-12);
    assert_relative_eq!(host(&b.value()?)[0], 0.2, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_retained_step_then_cleanup() -> Result<()> {
    init_logger();
    let ctx = f64_context()?;
    let model = small_linear(&ctx)?;
    let baseline = ctx.pool().live_bytes(StorageDevice::Cpu);
    let mut opt = Sgd::new(SgdConfig { lr: 0.1 })?;
    opt.setup(&model)?;

    let x = input(&ctx, vec![1.0, 1.0], vec![1, 2])?;
    let t = input(&ctx, vec![2.0], vec![1, 1])?;
    let y = model.forward(&[x])?.remove(0);
    let loss = squared_error_op(&y, &t)?;
    loss.backward(true, true)?;

    // intermediate gradient kept: dL/dy = 2 (y - t)
    assert_eq!(y.grad_tensor()?.map(|g| host(&g)), Some(vec![3.0]));
    assert_eq!(loss.grad_tensor()?.map(|g| host(&g)), Some(vec![1.0]));
    let w = model.weight()?.clone();
    assert_eq!(w.grad_tensor()?.map(|g| host(&g)), Some(vec![3.0, 3.0]));

    let report = loss.cleanup_graph();
    assert_eq!(report.functions_visited, 2);
    assert!(y.grad_tensor()?.is_none());
    // parameters and their gradients are all that is left
    assert_eq!(ctx.pool().live_bytes(StorageDevice::Cpu), baseline * 2);

    opt.update(None)?;
    let w_after = host(&w.value()?);
    assert_relative_eq!(w_after[0], 0.7, epsilon = 1e-12);
    assert_relative_eq!(w_after[1], 1.7, epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_gradients_accumulate_until_cleared() -> Result<()> {
    init_logger();
    let ctx = f64_context()?;
    let model = small_linear(&ctx)?;
    for _ in 0..2 {
        let x = input(&ctx, vec![1.0, 1.0], vec![1, 2])?;
        let t = input(&ctx, vec![2.0], vec![1, 1])?;
        let y = model.forward(&[x])?.remove(0);
        let loss = squared_error_op(&y, &t)?;
        loss.backward(false, false)?;
        loss.cleanup_graph();
    }
    let w = model.weight()?;
    assert_eq!(w.grad_tensor()?.map(|g| host(&g)), Some(vec![6.0, 6.0]));
    assert_eq!(model.clear_grads()?, 2);
    assert!(w.grad_tensor()?.is_none());
    Ok(())
}

#[test]
fn test_training_loop_reduces_loss() -> Result<()> {
    init_logger();
    let ctx = f64_context()?;
    let model = small_linear(&ctx)?;
    let mut opt = AdamW::new(AdamWConfig {
        weight_decay: 0.0,
        ..AdamWConfig::default()
    })?;
    opt.setup(&model)?;

    let batch = |_: usize| -> Result<f64> {
        with_scope("step", |scope| {
            let x = scope.track(input(&ctx, vec![1.0, 2.0, 3.0, -1.0], vec![2, 2])?);
            let t = scope.track(input(&ctx, vec![0.0, 1.0], vec![2, 1])?);
            let y = scope.track(model.forward(&[x])?.remove(0));
            let loss = scope.track(squared_error_op(&y, &t)?);
            loss.backward(false, false)?;
            loss.value()?.item()
        })
    };
    let first = batch(0)?;
    opt.update(None)?;
    model.clear_grads()?;
    let mut last = first;
    for i in 1..50 {
        last = batch(i)?;
        opt.update(None)?;
        model.clear_grads()?;
    }
    assert!(last < first, "loss went from {} to {}", first, last);
    Ok(())
}

#[test]
fn test_coupled_optimizers_reject_update_one() -> Result<()> {
    let ctx = f64_context()?;
    let model = small_linear(&ctx)?;
    let w = model.weight()?;
    w.set_grad(ctx.tensor_from_f64(vec![1.0, 1.0], vec![1, 2])?)?;

    let mut nadam = Nadam::new(NadamConfig::default())?;
    let mut lookahead = Lookahead::new(Sgd::new(SgdConfig::default())?, LookaheadConfig::default())?;
    let mut swa = Swa::new(Sgd::new(SgdConfig::default())?, SwaConfig::default())?;
    for err in [nadam.update_one(w), lookahead.update_one(w), swa.update_one(w)] {
        assert!(matches!(err, Err(FerrogradError::InvalidUpdateCall(_))));
    }
    assert_eq!(host(&w.value()?), vec![1.0, 2.0]);
    Ok(())
}

#[test]
fn test_adamw_ignores_wrongly_shaped_gradient() -> Result<()> {
    let ctx = f64_context()?;
    let model = small_linear(&ctx)?;
    let w = model.weight()?;
    w.set_grad(Tensor::new_f64(vec![1.0, 1.0, 1.0], vec![3])?)?;
    let mut opt = AdamW::new(AdamWConfig::default())?;
    opt.setup(&model)?;
    opt.update(None)?;
    assert_eq!(host(&w.value()?), vec![1.0, 2.0]);
    Ok(())
}

#[test]
fn test_parallel_linear_matches_serial() -> Result<()> {
    init_logger();
    let ctx = Context::new(EngineConfig {
        dtype: DType::F64,
        max_workers: 3,
        parallel_threshold: 2,
        ..EngineConfig::default()
    })?;
    let rows = 9;
    let data: Vec<f64> = (0..rows * 2).map(|i| i as f64 * 0.25 - 1.0).collect();
    let serial = small_linear(&ctx)?;
    let parallel = small_linear(&ctx)?.with_workers(Some(ctx.workers()?));
    assert_eq!(parallel.in_features(), 2);

    let xs = input(&ctx, data.clone(), vec![rows, 2])?;
    let xp = input(&ctx, data, vec![rows, 2])?;
    let ys = serial.forward(&[xs])?.remove(0);
    let yp = parallel.forward(&[xp])?.remove(0);
    assert_eq!(yp.shape()?, vec![rows, 1]);
    assert!(ys.value()?.all_close(&yp.value()?, 1e-12));

    let p = Linear::new(&ctx, 2, 1, true, &mut rand::thread_rng())?;
    assert_eq!(p.weight()?.dtype()?, DType::F64);
    Ok(())
}
