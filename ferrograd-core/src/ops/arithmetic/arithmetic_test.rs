use super::*;
use crate::ops::sum_op;
use approx::assert_relative_eq;

fn var(data: Vec<f64>, shape: Vec<usize>) -> Result<Variable> {
    Ok(Variable::new(Tensor::new_f64(data, shape)?).requires_grad_(true))
}

fn grad(v: &Variable) -> Result<Vec<f64>> {
    Ok(v.grad_tensor()?.map(|g| g.to_f64_vec()).unwrap_or_default())
}

#[test]
fn test_add_broadcast_reduces_gradient() -> Result<()> {
    let a = var(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3])?;
    let b = var(vec![1.0, 1.0, 1.0], vec![3])?;
    let y = sum_op(&add_op(&a, &b)?)?;
    y.backward(false, false)?;
    assert_eq!(grad(&a)?, vec![1.0; 6]);
    assert_eq!(grad(&b)?, vec![2.0, 2.0, 2.0]);
    Ok(())
}

#[test]
fn test_sub_and_neg() -> Result<()> {
    let a = var(vec![3.0], vec![1])?;
    let b = var(vec![1.0], vec![1])?;
    let y = neg_op(&sub_op(&a, &b)?)?;
    assert_eq!(y.value()?.to_f64_vec(), vec![-2.0]);
    y.backward(false, false)?;
    assert_eq!(grad(&a)?, vec![-1.0]);
    assert_eq!(grad(&b)?, vec![1.0]);
    Ok(())
}

#[test]
fn test_mul_gradient_swaps_operands() -> Result<()> {
    let a = var(vec![2.0, 3.0], vec![2])?;
    let b = var(vec![5.0, 7.0], vec![2])?;
    sum_op(&mul_op(&a, &b)?)?.backward(false, false)?;
    assert_eq!(grad(&a)?, vec![5.0, 7.0]);
    assert_eq!(grad(&b)?, vec![2.0, 3.0]);
    Ok(())
}

#[test]
fn test_square_and_scale() -> Result<()> {
    let x = var(vec![1.5], vec![1])?;
    let y = scale_op(&square_op(&x)?, 4.0)?;
    assert_relative_eq!(y.value()?.item()?, 9.0);
    y.backward(false, false)?;
    assert_relative_eq!(grad(&x)?[0], 12.0);
    Ok(())
}

#[test]
fn test_identity_routes_gradient() -> Result<()> {
    let x = var(vec![1.0, 2.0], vec![2])?;
    let y = sum_op(&add_op(&x.fork()?, &x)?)?;
    y.backward(false, false)?;
    assert_eq!(grad(&x)?, vec![2.0, 2.0]);
    Ok(())
}
