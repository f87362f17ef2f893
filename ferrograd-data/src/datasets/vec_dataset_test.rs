use super::*;

#[test]
fn test_vec_dataset_get() -> Result<()> {
    let dataset = VecDataset::new(vec![10, 20, 30]);
    assert_eq!(dataset.len(), 3);
    assert!(!dataset.is_empty());
    assert_eq!(dataset.get(0)?, 10);
    assert_eq!(dataset.get(2)?, 30);
    Ok(())
}

#[test]
fn test_vec_dataset_get_invalid_index() {
    let dataset = VecDataset::new(vec![10, 20, 30]);
    assert_eq!(
        dataset.get(3),
        Err(FerrogradError::IndexOutOfBounds {
            index: vec![3],
            shape: vec![3]
        })
    );
}

#[test]
fn test_vec_dataset_empty() {
    let dataset: VecDataset<f32> = VecDataset::new(Vec::new());
    assert!(dataset.is_empty());
    assert!(dataset.get(0).is_err());
}

#[test]
fn test_split_shares_storage_and_reindexes() -> Result<()> {
    let dataset: VecDataset<i32> = (0..10).collect();
    let (train, valid) = dataset.split_at(7)?;
    assert_eq!(train.len(), 7);
    assert_eq!(valid.len(), 3);
    assert_eq!(valid.get(0)?, 7);
    assert_eq!(valid.as_slice(), &[7, 8, 9]);
    assert_eq!(
        valid.get(3),
        Err(FerrogradError::IndexOutOfBounds {
            index: vec![3],
            shape: vec![3]
        })
    );

    let (a, b) = valid.split_at(1)?;
    assert_eq!(a.as_slice(), &[7]);
    assert_eq!(b.get(1)?, 9);
    Ok(())
}

#[test]
fn test_split_past_the_end_fails() {
    let dataset = VecDataset::new(vec![1, 2]);
    assert!(matches!(dataset.split_at(3), Err(FerrogradError::IndexOutOfBounds { .. })));
    assert!(dataset.split_at(2).is_ok());
}
