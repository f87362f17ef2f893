//! Batches a synthetic regression set with `TensorDataset`, first in order and
//! then shuffled, stacking each batch into `[batch, ...]` tensors. Ends with a
//! train/validation split of plain pairs resumed mid-epoch.

use ferrograd_core::{FerrogradError, Tensor};
use ferrograd_data::{stack_samples, DataLoader, RandomSampler, SequentialSampler, TensorDataset, VecDataset};

fn main() -> Result<(), FerrogradError> {
    let features = Tensor::new_f64((0..30).map(|i| i as f64 / 10.0).collect(), vec![10, 3])?;
    let labels = Tensor::new_f64((0..10).map(f64::from).collect(), vec![10, 1])?;
    let dataset = TensorDataset::new(vec![features, labels])?;

    println!("--- sequential ---");
    let loader = DataLoader::with_collate(dataset.clone(), 4, SequentialSampler::new(), false, Box::new(stack_samples))?;
    for (i, batch) in loader.enumerate() {
        let batch = batch?;
        println!("batch {}: x {:?}, y {:?}", i, batch[0].shape(), batch[1].to_f64_vec());
    }

    println!("--- shuffled, drop_last ---");
    let sampler = RandomSampler::new(false, None).with_seed(2024);
    let mut loader = DataLoader::with_collate(dataset, 4, sampler, true, Box::new(stack_samples))?;
    for epoch in 0..2 {
        for batch in loader.by_ref() {
            println!("epoch {}: y {:?}", epoch, batch?[1].to_f64_vec());
        }
        loader.reset();
    }

    println!("--- split, resumed at sample 4 ---");
    let pairs: VecDataset<(f64, f64)> = (0..10).map(|i| (f64::from(i), 2.0 * f64::from(i))).collect();
    let (train, valid) = pairs.split_at(8)?;
    let loader = DataLoader::new(train, 2, SequentialSampler::resume_at(4), false)?;
    for batch in loader {
        println!("train {:?}", batch?);
    }
    println!("validation {:?}", valid.as_slice());
    Ok(())
}
