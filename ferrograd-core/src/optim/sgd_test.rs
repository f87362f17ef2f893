#[cfg(test)]
mod tests {
    use crate::error::{FerrogradError, Result};
    use crate::nn::layer::WeightOwner;
    use crate::nn::layers::Linear;
    use crate::nn::parameter::Parameter;
    use crate::optim::hooks::FreezeParams;
    use crate::optim::optimizer_trait::Optimizer;
    use crate::optim::sgd::{MomentumSgd, MomentumSgdConfig, Sgd, SgdConfig};
    use crate::tensor::Tensor;
    use crate::utils::testing::{param_with_grad, values};
    use approx::assert_relative_eq;

    #[test]
    fn test_sgd_step() -> Result<()> {
        let p = param_with_grad("p", vec![2.0], vec![0.5]);
        let mut opt = Sgd::new(SgdConfig { lr: 0.1 })?;
        opt.update(Some(&[p.clone()]))?;
        assert_relative_eq!(values(&p)[0], 1.95, epsilon = 1e-12);
        assert_eq!(opt.base().steps(), 1);
        Ok(())
    }

    #[test]
    fn test_sgd_skips_params_without_grad() -> Result<()> {
        let p = Parameter::new(Tensor::new_f64(vec![1.0, 2.0], vec![2])?, "p")?;
        let mut opt = Sgd::new(SgdConfig::default())?;
        opt.update(Some(&[p.clone()]))?;
        assert_eq!(values(&p), vec![1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_sgd_rejects_mismatched_grad() -> Result<()> {
        let p = param_with_grad("p", vec![1.0, 2.0], vec![1.0]);
        let mut opt = Sgd::new(SgdConfig::default())?;
        let err = opt.update(Some(&[p])).unwrap_err();
        assert!(matches!(err, FerrogradError::ShapeMismatch { .. }), "got {:?}", err);
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(Sgd::new(SgdConfig { lr: 0.0 }), Err(FerrogradError::ConfigurationError(_))));
        let bad = MomentumSgdConfig { lr: 0.1, momentum: 1.0 };
        assert!(matches!(MomentumSgd::new(bad), Err(FerrogradError::ConfigurationError(_))));
    }

    #[test]
    fn test_setup_updates_layer_params() -> Result<()> {
        let layer = Linear::from_tensors(
            Tensor::new_f64(vec![1.0, 2.0], vec![1, 2])?,
            Some(Tensor::new_f64(vec![0.0], vec![1])?),
        )?;
        let w = layer.weight()?.clone();
        let b = layer.bias().cloned().expect("bias");
        w.set_grad(Tensor::new_f64(vec![1.0, 1.0], vec![1, 2])?)?;
        b.set_grad(Tensor::new_f64(vec![2.0], vec![1])?)?;

        let mut opt = Sgd::new(SgdConfig { lr: 0.5 })?;
        opt.setup(&layer)?;
        opt.add_hook(Box::new(FreezeParams::new([&b])));
        opt.update(None)?;

        assert_eq!(values(&w), vec![0.5, 1.5]);
        assert_eq!(values(&b), vec![0.0]);
        assert!(b.grad_tensor()?.is_none());
        Ok(())
    }

    #[test]
    fn test_momentum_accumulates_velocity() -> Result<()> {
        let p = param_with_grad("p", vec![1.0], vec![1.0]);
        let mut opt = MomentumSgd::new(MomentumSgdConfig { lr: 0.1, momentum: 0.9 })?;
        opt.update(Some(&[p.clone()]))?;
        assert_relative_eq!(values(&p)[0], 0.9, epsilon = 1e-12);
        opt.update(Some(&[p.clone()]))?;
        assert_relative_eq!(values(&p)[0], 0.71, epsilon = 1e-12);

        let state = opt.base().state().get(p.id()).expect("velocity state");
        assert_relative_eq!(state.values_or_zeros("v", 1)[0], -0.19, epsilon = 1e-12);
        Ok(())
    }
}
