use super::*;
use crate::buffer::HostData;
use crate::device::StorageDevice;
use crate::error::FerrogradError;
use crate::memory::MemoryPool;
use crate::ops::{mul_op, square_op, sum_op};
use crate::tensor::Tensor;
use std::sync::Arc;

fn input(pool: &Arc<MemoryPool>, data: Vec<f64>) -> Result<Variable> {
    let n = data.len();
    let t = Tensor::from_host(HostData::F64(data), vec![n], StorageDevice::Cpu, Some(pool))?;
    Ok(Variable::new(t))
}

#[test]
fn test_scope_releases_on_drop() -> Result<()> {
    let pool = Arc::new(MemoryPool::new());
    {
        let mut scope = BatchScope::new("batch-0");
        let x = input(&pool, vec![1.0, 2.0])?;
        let y = scope.track(sum_op(&square_op(&x)?)?);
        assert_eq!(scope.tracked(), 1);
        assert_eq!(y.value()?.item()?, 5.0);
        assert!(pool.live_bytes(StorageDevice::Cpu) > 0);
    }
    assert_eq!(pool.live_bytes(StorageDevice::Cpu), 0);
    Ok(())
}

#[test]
fn test_scope_releases_on_error_path() -> Result<()> {
    let pool = Arc::new(MemoryPool::new());
    let x = input(&pool, vec![1.0, 2.0])?;
    let mismatched = input(&pool, vec![1.0, 2.0, 3.0])?;

    let res: Result<f64> = with_scope("failing", |scope| {
        let h = scope.track(square_op(&x)?);
        // fails with ShapeMismatch; h must still be released
        let bad = mul_op(&h, &mismatched)?;
        bad.value()?.item()
    });
    assert!(matches!(res, Err(FerrogradError::ShapeMismatch { .. })));
    assert!(!x.has_value()?);
    assert_eq!(pool.live_bytes(StorageDevice::Cpu), 24);
    Ok(())
}

#[test]
fn test_scope_releases_when_unwinding() -> Result<()> {
    let pool = Arc::new(MemoryPool::new());
    let pool_in = Arc::clone(&pool);
    let outcome = std::panic::catch_unwind(move || {
        let mut scope = BatchScope::new("panicking");
        let x = input(&pool_in, vec![4.0]).expect("input");
        let _y = scope.track(square_op(&x).expect("square"));
        panic!("driver failure");
    });
    assert!(outcome.is_err());
    assert_eq!(pool.live_bytes(StorageDevice::Cpu), 0);
    Ok(())
}

#[test]
fn test_close_reports() -> Result<()> {
    let pool = Arc::new(MemoryPool::new());
    let mut scope = BatchScope::new("explicit");
    let x = input(&pool, vec![1.0])?;
    scope.track(square_op(&x)?);
    let report = scope.close();
    assert_eq!(report.variables_visited, 2);
    assert_eq!(report.functions_visited, 1);
    Ok(())
}
