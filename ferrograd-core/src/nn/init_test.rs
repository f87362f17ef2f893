#[cfg(test)]
mod tests {
    use crate::error::{FerrogradError, Result};
    use crate::nn::init::{fan_in_out, fill, sample, Init};
    use crate::nn::parameter::Parameter;
    use crate::tensor::Tensor;
    use crate::types::DType;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fan_in_out() {
        assert_eq!(fan_in_out(&[]), (1, 1));
        assert_eq!(fan_in_out(&[5]), (5, 5));
        assert_eq!(fan_in_out(&[4, 3]), (3, 4));
        assert_eq!(fan_in_out(&[8, 2, 3, 3]), (18, 72));
    }

    #[test]
    fn test_constant_fill_keeps_dtype() -> Result<()> {
        let p = Parameter::new(Tensor::new_f64(vec![0.0; 3], vec![3])?, "b")?;
        let mut rng = StdRng::seed_from_u64(0);
        fill(&p, &Init::Constant(0.5), &mut rng)?;
        assert_eq!(p.dtype()?, DType::F64);
        assert_eq!(p.value()?.to_f64_vec(), vec![0.5; 3]);
        Ok(())
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() -> Result<()> {
        let a = sample(&Init::XavierUniform, &[4, 6], &mut StdRng::seed_from_u64(42))?;
        let b = sample(&Init::XavierUniform, &[4, 6], &mut StdRng::seed_from_u64(42))?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_kaiming_bound() -> Result<()> {
        let values = sample(&Init::KaimingUniform, &[16, 6], &mut StdRng::seed_from_u64(7))?;
        let bound = 1.0f64; // sqrt(6 / 6)
        assert_eq!(values.len(), 96);
        assert!(values.iter().all(|v| v.abs() <= bound));
        Ok(())
    }

    #[test]
    fn test_normal_statistics() -> Result<()> {
        let values = sample(&Init::Normal { mean: 2.0, std: 0.5 }, &[4000], &mut StdRng::seed_from_u64(3))?;
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        assert_relative_eq!(mean, 2.0, epsilon = 0.05);
        Ok(())
    }

    #[test]
    fn test_invalid_ranges_are_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sample(&Init::Uniform { low: 1.0, high: 1.0 }, &[2], &mut rng),
            Err(FerrogradError::ConfigurationError(_))
        ));
        assert!(matches!(
            sample(&Init::Normal { mean: 0.0, std: -1.0 }, &[2], &mut rng),
            Err(FerrogradError::ConfigurationError(_))
        ));
    }
}
