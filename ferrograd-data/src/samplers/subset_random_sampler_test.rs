use super::*;
use std::collections::HashSet;

#[test]
fn test_yields_each_subset_index_once() {
    let subset = vec![2, 5, 7, 11];
    let mut sampler = SubsetRandomSampler::new(subset.clone()).with_seed(9);
    assert_eq!(sampler.len(100), 4);
    let drawn: HashSet<usize> = sampler.iter(100).collect();
    assert_eq!(drawn, subset.into_iter().collect::<HashSet<usize>>());
}

#[test]
fn test_empty_subset() {
    let mut sampler = SubsetRandomSampler::new(Vec::new());
    assert_eq!(sampler.len(10), 0);
    assert_eq!(sampler.iter(10).next(), None);
}
