#[cfg(test)]
mod tests {
    use crate::error::{FerrogradError, Result};
    use crate::optim::adadelta::{AdaDelta, AdaDeltaConfig};
    use crate::optim::optimizer_trait::Optimizer;
    use crate::utils::testing::{param_with_grad, values};
    use approx::assert_relative_eq;

    #[test]
    fn test_adadelta_first_step() -> Result<()> {
        let p = param_with_grad("p", vec![1.0, -1.0], vec![1.0, -1.0]);
        let mut opt = AdaDelta::new(AdaDeltaConfig::default())?;
        opt.update(Some(&[p.clone()]))?;

        let dx = 1e-3 / 0.050001f64.sqrt();
        let w = values(&p);
        assert_relative_eq!(w[0], 1.0 - dx, epsilon = 1e-9);
        assert_relative_eq!(w[1], -1.0 + dx, epsilon = 1e-9);

        let state = opt.base().state().get(p.id()).expect("state");
        assert_relative_eq!(state.values_or_zeros("h", 2)[0], 0.05, epsilon = 1e-12);
        assert_relative_eq!(state.values_or_zeros("u", 2)[0], 0.05 * dx * dx, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_rho_must_be_below_one() {
        let err = AdaDelta::new(AdaDeltaConfig { rho: 1.0, eps: 1e-6 }).unwrap_err();
        assert!(matches!(err, FerrogradError::ConfigurationError(_)));
    }
}
