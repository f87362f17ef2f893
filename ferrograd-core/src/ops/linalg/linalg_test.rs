use super::*;
use crate::ops::sum_op;

fn var(data: Vec<f64>, shape: Vec<usize>) -> Result<Variable> {
    Ok(Variable::new(Tensor::new_f64(data, shape)?).requires_grad_(true))
}

fn grad(v: &Variable) -> Result<Vec<f64>> {
    Ok(v.grad_tensor()?.map(|g| g.to_f64_vec()).unwrap_or_default())
}

#[test]
fn test_matmul_backward() -> Result<()> {
    let a = var(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2])?;
    let b = var(vec![5.0, 6.0, 7.0, 8.0], vec![2, 2])?;
    let y = matmul_op(&a, &b)?;
    assert_eq!(y.value()?.to_f64_vec(), vec![19.0, 22.0, 43.0, 50.0]);
    sum_op(&y)?.backward(false, false)?;
    // dA = 1·Bᵀ, dB = Aᵀ·1
    assert_eq!(grad(&a)?, vec![11.0, 15.0, 11.0, 15.0]);
    assert_eq!(grad(&b)?, vec![4.0, 4.0, 6.0, 6.0]);
    Ok(())
}

#[test]
fn test_linear_forward_and_gradients() -> Result<()> {
    let x = var(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3])?;
    let w = var(vec![1.0, 0.0, -1.0, 0.5, 0.5, 0.5], vec![2, 3])?;
    let b = var(vec![10.0, 20.0], vec![2])?;
    let y = linear_op(&x, &w, Some(&b), None)?;
    assert_eq!(y.shape()?, vec![2, 2]);
    assert_eq!(y.value()?.to_f64_vec(), vec![8.0, 23.0, 8.0, 27.5]);

    sum_op(&y)?.backward(false, false)?;
    assert_eq!(grad(&b)?, vec![2.0, 2.0]);
    assert_eq!(grad(&w)?, vec![5.0, 7.0, 9.0, 5.0, 7.0, 9.0]);
    assert_eq!(grad(&x)?, vec![1.5, 0.5, -0.5, 1.5, 0.5, -0.5]);
    Ok(())
}

#[test]
fn test_linear_checks_shapes() -> Result<()> {
    let x = var(vec![1.0, 2.0], vec![1, 2])?;
    let w = var(vec![1.0, 2.0, 3.0], vec![1, 3])?;
    assert!(matches!(
        linear_op(&x, &w, None, None),
        Err(FerrogradError::ShapeMismatch { .. })
    ));
    let w = var(vec![1.0, 2.0], vec![1, 2])?;
    let bad_bias = var(vec![1.0, 2.0], vec![2])?;
    assert!(linear_op(&x, &w, Some(&bad_bias), None).is_err());
    Ok(())
}

#[test]
fn test_linear_with_workers_matches_sequential() -> Result<()> {
    let rows = 20;
    let xs: Vec<f64> = (0..rows * 3).map(|i| (i as f64) * 0.1 - 2.0).collect();
    let x = var(xs, vec![rows, 3])?;
    let w = var(vec![0.2, -0.4, 0.6, 1.0, 0.0, -1.0], vec![2, 3])?;
    let workers = Arc::new(WorkerPool::new(3, 4)?);
    let seq = linear_op(&x, &w, None, None)?.value()?;
    let par = linear_op(&x, &w, None, Some(workers))?.value()?;
    assert_eq!(seq, par);
    Ok(())
}
