use std::path::PathBuf;

use ferrograd_core::nn::{Layer, Linear, ReLU, Sequential};
use ferrograd_core::optim::{Adam, AdamConfig, Lookahead, LookaheadConfig, Optimizer};
use ferrograd_core::persist;
use ferrograd_core::{DType, EngineConfig, FerrogradError, Result, Tensor};

mod common;
use common::{f64_context, init_logger};

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ferrograd-it-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn mlp(w1: Vec<f64>, w2: Vec<f64>) -> Result<Sequential> {
    Ok(Sequential::new()
        .add("fc1", Linear::from_tensors(Tensor::new_f64(w1, vec![2, 2])?, Some(Tensor::new_f64(vec![0.1, 0.2], vec![2])?))?)
        .add("act", ReLU::new())
        .add("fc2", Linear::from_tensors(Tensor::new_f64(w2, vec![1, 2])?, None)?))
}

fn snapshot(layer: &dyn Layer) -> Result<Vec<(String, Vec<f64>)>> {
    layer
        .named_params()
        .map(|(n, p)| Ok::<_, FerrogradError>((n, p.value()?.to_f64_vec())))
        .collect()
}

#[test]
fn test_weights_round_trip_through_archive() -> Result<()> {
    init_logger();
    let dir = temp_dir("weights");
    let trained = mlp(vec![1.0, -2.0, 0.5, 3.0], vec![4.0, -1.0])?;
    trained.save_weights(&dir)?;

    let index = persist::read_index(&dir)?;
    let names: Vec<&str> = index.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["fc1.W", "fc1.b", "fc2.W"]);
    assert_eq!(index.step, None);

    let fresh = mlp(vec![0.0; 4], vec![0.0; 2])?;
    fresh.load_weights(&dir)?;
    assert_eq!(snapshot(&fresh)?, snapshot(&trained)?);

    let other = Linear::from_tensors(Tensor::new_f64(vec![0.0; 4], vec![2, 2])?, None)?;
    assert!(matches!(other.load_weights(&dir), Err(FerrogradError::MissingKey(_))));
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_wrapped_optimizer_state_round_trip() -> Result<()> {
    init_logger();
    let dir = temp_dir("optim");
    let model = mlp(vec![1.0, -2.0, 0.5, 3.0], vec![4.0, -1.0])?;
    for p in model.params() {
        let shape = p.shape()?;
        let n = shape.iter().product();
        p.set_grad(Tensor::new_f64(vec![0.5; n], shape)?)?;
    }
    let config = LookaheadConfig { k: 2, alpha: 0.5 };
    let mut opt = Lookahead::new(Adam::new(AdamConfig::default())?, config)?;
    opt.setup(&model)?;
    for _ in 0..3 {
        opt.update(None)?;
    }
    opt.save_state(&dir)?;
    assert_eq!(persist::read_index(&dir)?.step, Some(3));

    let mut restored = Lookahead::new(Adam::new(AdamConfig::default())?, config)?;
    restored.setup(&model)?;
    restored.load_state(&dir)?;
    assert_eq!(restored.base().steps(), 3);
    assert_eq!(restored.inner().base().steps(), 3);

    let a = opt.state_tensors()?;
    let b = restored.state_tensors()?;
    assert_eq!(a.len(), b.len());
    for ((ka, ta), (kb, tb)) in a.iter().zip(&b) {
        assert_eq!(ka, kb);
        assert!(ta.all_close(tb, 1e-12), "{} differs", ka);
    }

    // the next step behaves identically from either copy
    let before = snapshot(&model)?;
    opt.update(None)?;
    let after_original = snapshot(&model)?;
    for (p, (_, v)) in model.params().zip(&before) {
        p.set_value(Tensor::new_f64(v.clone(), p.shape()?)?)?;
    }
    restored.update(None)?;
    assert_eq!(snapshot(&model)?, after_original);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_engine_config_from_json_file() -> Result<()> {
    let dir = temp_dir("config");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("engine.json");
    std::fs::write(&path, r#"{ "dtype": "F64", "max_workers": 2, "gpu_capacity": 4096 }"#)?;
    let config = EngineConfig::from_path(&path)?;
    assert_eq!(config.dtype, DType::F64);
    assert_eq!(config.max_workers, 2);
    assert_eq!(config.gpu_capacity, Some(4096));
    assert_eq!(config.parallel_threshold, EngineConfig::default().parallel_threshold);

    std::fs::write(&path, r#"{ "max_workers": 0 }"#)?;
    assert!(matches!(EngineConfig::from_path(&path), Err(FerrogradError::ConfigurationError(_))));
    assert!(f64_context().is_ok());
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
