use super::*;
use crate::tensor::create::{full, ones_like, zeros};

#[test]
fn test_new_rejects_wrong_length() {
    let err = Tensor::new(vec![1.0, 2.0, 3.0], vec![2, 2]).unwrap_err();
    assert_eq!(
        err,
        FerrogradError::TensorCreationError {
            data_len: 3,
            shape: vec![2, 2]
        }
    );
}

#[test]
fn test_scalar_has_rank_zero_and_one_element() -> Result<()> {
    let s = Tensor::scalar(3.5);
    assert_eq!(s.rank(), 0);
    assert_eq!(s.numel(), 1);
    assert_eq!(s.item()?, 3.5);
    Ok(())
}

#[test]
fn test_item_requires_single_element() -> Result<()> {
    let t = zeros(&[2], DType::F32)?;
    assert!(matches!(t.item(), Err(FerrogradError::ShapeMismatch { .. })));
    Ok(())
}

#[test]
fn test_dtype_checked_access() -> Result<()> {
    let t = Tensor::new_f64(vec![1.0, 2.0], vec![2])?;
    assert_eq!(t.get_f64_data()?, vec![1.0, 2.0]);
    assert!(matches!(
        t.get_f32_data(),
        Err(FerrogradError::DtypeMismatch {
            expected: DType::F32,
            actual: DType::F64,
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_like_keeps_pool_and_device() -> Result<()> {
    let pool = Arc::new(MemoryPool::new());
    let t = Tensor::from_host(HostData::F32(vec![1.0; 4]), vec![2, 2], StorageDevice::Gpu, Some(&pool))?;
    let o = ones_like(&t)?;
    assert_eq!(o.device(), StorageDevice::Gpu);
    assert_eq!(pool.live_bytes(StorageDevice::Gpu), 32);
    drop(t);
    drop(o);
    assert_eq!(pool.live_bytes(StorageDevice::Gpu), 0);
    Ok(())
}

#[test]
fn test_reshape_shares_buffer() -> Result<()> {
    let t = full(&[2, 3], 2.0, DType::F32)?;
    let r = t.reshape(vec![3, 2])?;
    assert!(Arc::ptr_eq(t.buffer(), r.buffer()));
    assert!(t.reshape(vec![4]).is_err());
    Ok(())
}
