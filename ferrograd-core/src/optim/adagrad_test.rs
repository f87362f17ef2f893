#[cfg(test)]
mod tests {
    use crate::error::Result;
    use crate::optim::adagrad::{AdaGrad, AdaGradConfig};
    use crate::optim::optimizer_trait::Optimizer;
    use crate::utils::testing::{param_with_grad, values};
    use approx::assert_relative_eq;

    #[test]
    fn test_adagrad_shrinks_steps() -> Result<()> {
        let p = param_with_grad("p", vec![1.0], vec![2.0]);
        let mut opt = AdaGrad::new(AdaGradConfig { lr: 0.1, eps: 1e-8 })?;
        opt.update(Some(&[p.clone()]))?;
        assert_relative_eq!(values(&p)[0], 0.9, epsilon = 1e-7);
        opt.update(Some(&[p.clone()]))?;
        assert_relative_eq!(values(&p)[0], 0.9 - 0.2 / 8f64.sqrt(), epsilon = 1e-7);

        let h = opt.base().state().get(p.id()).expect("state").values_or_zeros("h", 1);
        assert_relative_eq!(h[0], 8.0);
        Ok(())
    }
}
