#[cfg(test)]
mod tests {
    use crate::error::{FerrogradError, Result};
    use crate::nn::layer::WeightOwner;
    use crate::optim::optimizer_trait::Optimizer;
    use crate::optim::sgd::{Sgd, SgdConfig};
    use crate::optim::swa::{Swa, SwaConfig};
    use crate::tensor::Tensor;
    use crate::utils::testing::{scalar_linear, values};
    use approx::assert_relative_eq;

    fn swa(start_step: u64) -> Result<Swa<Sgd>> {
        Swa::new(Sgd::new(SgdConfig { lr: 0.1 })?, SwaConfig { start_step, freq: 1 })
    }

    #[test]
    fn test_running_average_and_swap() -> Result<()> {
        let layer = scalar_linear(1.0);
        let w = layer.weight()?.clone();
        w.set_grad(Tensor::new_f64(vec![1.0], vec![1, 1])?)?;
        let mut opt = swa(2)?;
        opt.setup(&layer)?;
        for _ in 0..3 {
            opt.update(None)?;
        }
        assert_relative_eq!(values(&w)[0], 0.7, epsilon = 1e-12);
        assert_eq!(opt.snapshot_count(&w), 2);

        opt.swap_swa_weights()?;
        assert!(opt.is_swapped());
        assert_relative_eq!(values(&w)[0], 0.75, epsilon = 1e-12);
        assert!(matches!(opt.update(None), Err(FerrogradError::ConfigurationError(_))));

        opt.swap_swa_weights()?;
        assert!(!opt.is_swapped());
        assert_relative_eq!(values(&w)[0], 0.7, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_swap_before_first_snapshot_is_noop() -> Result<()> {
        let layer = scalar_linear(1.0);
        let mut opt = swa(10)?;
        opt.setup(&layer)?;
        opt.swap_swa_weights()?;
        assert_eq!(values(layer.weight()?), vec![1.0]);
        Ok(())
    }

    #[test]
    fn test_update_one_is_forbidden() -> Result<()> {
        let layer = scalar_linear(1.0);
        let mut opt = swa(1)?;
        let err = opt.update_one(layer.weight()?).unwrap_err();
        assert!(matches!(err, FerrogradError::InvalidUpdateCall(ref n) if n == "swa"));
        Ok(())
    }
}
