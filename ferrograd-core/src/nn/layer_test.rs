use super::*;
use crate::buffer::HostData;
use crate::memory::MemoryPool;
use crate::nn::layers::{Linear, ReLU, Sequential};
use crate::ops::{mse_op, sum_op};
use crate::tensor::Tensor;
use crate::utils::testing::scratch_dir;
use std::sync::Arc;

fn linear(w: Vec<f64>, b: Vec<f64>) -> Result<Linear> {
    let out = b.len();
    let inp = w.len() / out;
    Linear::from_tensors(Tensor::new_f64(w, vec![out, inp])?, Some(Tensor::new_f64(b, vec![out])?))
}

fn mlp() -> Result<Sequential> {
    Ok(Sequential::new()
        .add("fc1", linear(vec![1.0, 2.0, 3.0, 4.0], vec![0.5, -0.5])?)
        .add("act", ReLU::new())
        .add("fc2", linear(vec![1.0, -1.0], vec![0.0])?))
}

fn values(layer: &dyn Layer) -> Result<Vec<Vec<f64>>> {
    layer.params().map(|p| Ok(p.value()?.to_f64_vec())).collect()
}

#[test]
fn test_set_attribute_replaces_in_place() -> Result<()> {
    let mut registry = Registry::new();
    registry.set_attribute("a", Parameter::new(Tensor::scalar(1.0), "a")?);
    registry.set_attribute("b", Parameter::new(Tensor::scalar(2.0), "b")?);
    let replaced = registry.set_attribute("a", Parameter::new(Tensor::scalar(3.0), "a")?);
    assert!(matches!(replaced, Some(Slot::Param(_))));
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
    let a = registry.require_param("a")?;
    assert_eq!(a.value()?.item()?, 3.0);
    assert!(matches!(registry.require_param("zz"), Err(FerrogradError::MissingKey(_))));
    Ok(())
}

#[test]
fn test_unnamed_parameter_takes_attribute_name() -> Result<()> {
    let mut registry = Registry::new();
    let p = Parameter::from_variable(Variable::new(Tensor::scalar(1.0)))?;
    registry.register_trainable("gain", p.clone());
    assert_eq!(p.name()?, Some("gain".to_string()));
    Ok(())
}

#[test]
fn test_poisoned_parameter_is_still_registered() -> Result<()> {
    let p = Parameter::from_variable(Variable::new(Tensor::scalar(1.0)))?;
    let shared = p.clone();
    let _ = std::thread::spawn(move || {
        let _guard = shared.variable().data.write();
        panic!("poisoning the parameter lock");
    })
    .join();
    let mut registry = Registry::new();
    registry.register_trainable("gain", p.clone());
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["gain"]);
    assert!(matches!(p.name(), Err(FerrogradError::LockPoisoned(_))));
    Ok(())
}

#[test]
fn test_named_params_are_dot_joined_depth_first() -> Result<()> {
    let model = mlp()?;
    let names: Vec<String> = model.named_params().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["fc1.W", "fc1.b", "fc2.W", "fc2.b"]);
    // restartable: a second walk sees the same parameters
    let first: Vec<VariableId> = model.params().map(|p| p.id()).collect();
    let second: Vec<VariableId> = model.params().map(|p| p.id()).collect();
    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_nested_containers() -> Result<()> {
    let inner = Sequential::new().add("fc", linear(vec![1.0, 1.0], vec![0.0])?);
    let outer = Sequential::new().add("block", inner).add("head", linear(vec![2.0], vec![1.0])?);
    let names: Vec<String> = outer.named_params().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["block.fc.W", "block.fc.b", "head.W", "head.b"]);
    Ok(())
}

#[test]
fn test_call_records_ids_and_clear_grads() -> Result<()> {
    let mut model = mlp()?;
    let x = Variable::new(Tensor::new_f64(vec![1.0, 1.0], vec![1, 2])?);
    let y = model.call(&[x.clone()])?;
    assert_eq!(model.registry().last_inputs(), &[x.id()]);
    assert_eq!(model.registry().last_outputs(), &[y[0].id()]);

    sum_op(&y[0])?.backward(false, false)?;
    assert!(model.params().all(|p| matches!(p.grad_tensor(), Ok(Some(_)))));
    assert_eq!(model.clear_grads()?, 4);
    assert!(model.params().all(|p| matches!(p.grad_tensor(), Ok(None))));
    assert_eq!(model.clear_grads()?, 0);
    Ok(())
}

#[test]
fn test_to_device_moves_every_parameter() -> Result<()> {
    let pool = Arc::new(MemoryPool::new());
    let w = Tensor::from_host(HostData::F64(vec![1.0, 2.0]), vec![1, 2], StorageDevice::Cpu, Some(&pool))?;
    let b = Tensor::from_host(HostData::F64(vec![0.0]), vec![1], StorageDevice::Cpu, Some(&pool))?;
    let layer = Linear::from_tensors(w, Some(b))?;
    layer.to_device(StorageDevice::Gpu)?;
    assert!(layer.params().all(|p| matches!(p.device(), Ok(StorageDevice::Gpu))));
    assert_eq!(pool.live_bytes(StorageDevice::Cpu), 0);
    assert_eq!(pool.live_bytes(StorageDevice::Gpu), 24);
    Ok(())
}

#[test]
fn test_weights_round_trip_into_fresh_layer() -> Result<()> {
    let dir = scratch_dir("layer-roundtrip");
    let trained = mlp()?;
    trained.save_weights(&dir)?;

    let fresh = Sequential::new()
        .add("fc1", linear(vec![0.0; 4], vec![0.0; 2])?)
        .add("act", ReLU::new())
        .add("fc2", linear(vec![0.0; 2], vec![0.0])?);
    fresh.load_weights(&dir)?;
    assert_eq!(values(&fresh)?, values(&trained)?);

    let x = Variable::new(Tensor::new_f64(vec![1.0, -1.0], vec![1, 2])?);
    let t = Variable::new(Tensor::new_f64(vec![0.0], vec![1, 1])?);
    let a = mse_op(&trained.forward(&[x.clone()])?[0], &t)?.value()?.item()?;
    let b = mse_op(&fresh.forward(&[x])?[0], &t)?.value()?.item()?;
    assert_eq!(a, b);
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_load_rejects_unknown_key() -> Result<()> {
    let dir = scratch_dir("layer-missing-key");
    mlp()?.save_weights(&dir)?;
    let smaller = Sequential::new().add("fc1", linear(vec![0.0; 4], vec![0.0; 2])?);
    let err = smaller.load_weights(&dir).unwrap_err();
    assert_eq!(err, FerrogradError::MissingKey("fc2.W".to_string()));
    // nothing was written before the failure
    assert_eq!(values(&smaller)?, vec![vec![0.0; 4], vec![0.0; 2]]);
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_load_checks_every_shape_before_writing() -> Result<()> {
    let dir = scratch_dir("layer-shape");
    mlp()?.save_weights(&dir)?;
    let wrong = Sequential::new()
        .add("fc1", linear(vec![0.0; 4], vec![0.0; 2])?)
        .add("fc2", linear(vec![0.0; 4], vec![0.0; 2])?);
    assert!(matches!(wrong.load_weights(&dir), Err(FerrogradError::ShapeMismatch { .. })));
    assert!(values(&wrong)?.iter().flatten().all(|v| *v == 0.0));
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_parameters_absent_from_archive_are_untouched() -> Result<()> {
    let dir = scratch_dir("layer-partial");
    Sequential::new()
        .add("fc1", linear(vec![1.0, 2.0, 3.0, 4.0], vec![0.5, -0.5])?)
        .save_weights(&dir)?;
    let bigger = mlp()?;
    let fc2 = |m: &Sequential| -> Result<Vec<Vec<f64>>> {
        values(m.registry().layer("fc2").ok_or_else(|| FerrogradError::MissingKey("fc2".into()))?)
    };
    let fc2_before = fc2(&bigger)?;
    bigger.load_weights(&dir)?;
    let fc2_after = fc2(&bigger)?;
    assert_eq!(fc2_before, fc2_after);
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
