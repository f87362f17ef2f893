use super::*;
use std::collections::HashSet;

#[test]
fn test_random_sampler_len() {
    assert_eq!(RandomSampler::new(false, None).len(10), 10);
    assert_eq!(RandomSampler::new(false, Some(5)).len(10), 5);
    assert_eq!(RandomSampler::new(false, Some(15)).len(10), 10);
    assert_eq!(RandomSampler::new(true, Some(15)).len(10), 15);
}

#[test]
fn test_without_replacement_is_a_permutation() {
    let mut sampler = RandomSampler::new(false, None).with_seed(7);
    let indices: Vec<usize> = sampler.iter(10).collect();
    assert_eq!(indices.len(), 10);
    let unique: HashSet<usize> = indices.into_iter().collect();
    assert_eq!(unique, (0..10).collect::<HashSet<usize>>());
}

#[test]
fn test_oversized_request_without_replacement_is_capped() {
    let mut sampler = RandomSampler::new(false, Some(20)).with_seed(1);
    assert_eq!(sampler.iter(5).count(), 5);
}

#[test]
fn test_with_replacement_stays_in_range() {
    let mut sampler = RandomSampler::new(true, Some(50)).with_seed(3);
    let indices: Vec<usize> = sampler.iter(4).collect();
    assert_eq!(indices.len(), 50);
    assert!(indices.iter().all(|&i| i < 4));
}

#[test]
fn test_seeded_samplers_reproduce_epochs() {
    let mut a = RandomSampler::new(false, None).with_seed(42);
    let mut b = RandomSampler::new(false, None).with_seed(42);
    let first: Vec<usize> = a.iter(100).collect();
    assert_eq!(first, b.iter(100).collect::<Vec<_>>());
    let second: Vec<usize> = a.iter(100).collect();
    assert_eq!(second, b.iter(100).collect::<Vec<_>>());
    assert_ne!(first, second);
}

#[test]
fn test_empty_dataset() {
    let mut sampler = RandomSampler::new(true, Some(3));
    assert_eq!(sampler.iter(0).next(), None);
}
