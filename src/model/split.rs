/// Seeded stratified train/test split.
use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Row indices for each partition, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so every class keeps its share in both partitions.
///
/// Per class (in ascending label order) the members are shuffled with one
/// RNG seeded from `seed`, and `round(count * test_fraction)` of them go to
/// test, capped so at least one member stays in train.
#[must_use]
pub fn stratified_split(labels: &[usize], test_fraction: f64, seed: u64) -> SplitIndices {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for members in by_class.values_mut() {
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_fraction).round() as usize)
            .min(members.len().saturating_sub(1));
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    SplitIndices { train, test }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_covers_every_row_once() {
        let labels: Vec<usize> = (0..50).map(|i| i % 3).collect();
        let split = stratified_split(&labels, 0.2, 42);
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_stratified() {
        let labels: Vec<usize> = [vec![0; 40], vec![1; 10]].concat();
        let split = stratified_split(&labels, 0.2, 42);
        let test_ones = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(split.test.len(), 10);
        assert_eq!(test_ones, 2);
    }

    #[test]
    fn test_split_reproducible() {
        let labels: Vec<usize> = (0..30).map(|i| i % 2).collect();
        assert_eq!(stratified_split(&labels, 0.2, 7), stratified_split(&labels, 0.2, 7));
    }

    #[test]
    fn test_singleton_class_stays_in_train() {
        let split = stratified_split(&[0, 1, 1, 1, 1, 1], 0.5, 42);
        assert!(split.train.contains(&0));
        assert!(!split.test.contains(&0));
    }

    #[test]
    fn test_zero_fraction_keeps_everything_in_train() {
        let split = stratified_split(&[0, 0, 1, 1], 0.0, 42);
        assert_eq!(split.train, vec![0, 1, 2, 3]);
        assert!(split.test.is_empty());
    }
}
