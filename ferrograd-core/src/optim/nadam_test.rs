#[cfg(test)]
mod tests {
    use crate::error::{FerrogradError, Result};
    use crate::optim::nadam::{Nadam, NadamConfig};
    use crate::optim::optimizer_trait::Optimizer;
    use crate::utils::testing::{param_with_grad, values};
    use approx::assert_relative_eq;

    #[test]
    fn test_update_one_is_forbidden() -> Result<()> {
        let p = param_with_grad("p", vec![1.0], vec![1.0]);
        let mut opt = Nadam::new(NadamConfig::default())?;
        let err = opt.update_one(&p).unwrap_err();
        assert!(matches!(err, FerrogradError::InvalidUpdateCall(ref n) if n == "nadam"));
        assert_eq!(values(&p), vec![1.0]);
        Ok(())
    }

    #[test]
    fn test_mu_product_advances_once_per_step() -> Result<()> {
        let a = param_with_grad("a", vec![1.0], vec![1.0]);
        let b = param_with_grad("b", vec![1.0], vec![-1.0]);
        let mut opt = Nadam::new(NadamConfig::default())?;
        opt.update(Some(&[a.clone(), b.clone()]))?;

        let mu1 = 0.9 * (1.0 - 0.5 * 0.96f64.powf(0.004));
        let product = opt.base().state().global("mu_product").expect("mu_product");
        assert_relative_eq!(product, mu1, epsilon = 1e-12);

        // symmetric gradients give symmetric moves
        let (wa, wb) = (values(&a)[0], values(&b)[0]);
        assert!(wa < 1.0 && wa > 0.99);
        assert_relative_eq!(1.0 - wa, wb - 1.0, epsilon = 1e-12);

        let keys: Vec<String> = opt.state_tensors()?.into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"@nadam.mu_product".to_string()));
        Ok(())
    }
}
