//! Seeded train/test partitioning.

use rand::seq::SliceRandom;
use rand::SeedableRng;

use capfor_core::{CapforError, CapforResult};

/// Shuffle `0..n` with a seeded generator and split off `test_fraction`
/// as the held-out partition. The same (n, fraction, seed) triple always
/// yields the same partition, which is what makes repeated runs
/// comparable.
pub fn train_test_split(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> CapforResult<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(CapforError::Other(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(CapforError::Other(format!(
            "cannot split {n} samples with test_fraction {test_fraction}"
        )));
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    let test = indices.split_off(n - n_test);
    Ok((indices, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_deterministic_for_a_seed() {
        let (train_a, test_a) = train_test_split(100, 0.25, 42).unwrap();
        let (train_b, test_b) = train_test_split(100, 0.25, 42).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
    }

    #[test]
    fn different_seeds_differ() {
        let (train_a, _) = train_test_split(100, 0.25, 42).unwrap();
        let (train_b, _) = train_test_split(100, 0.25, 43).unwrap();
        assert_ne!(train_a, train_b);
    }

    #[test]
    fn partitions_are_disjoint_and_complete() {
        let (train, test) = train_test_split(40, 0.25, 7).unwrap();
        assert_eq!(test.len(), 10);
        assert_eq!(train.len(), 30);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn degenerate_fractions_are_rejected()  {
        assert!(train_test_split(10, 0.0, 1).is_err());
        assert!(train_test_split(10, 1.0, 1).is_err());
        assert!(train_test_split(1, 0.5, 1).is_err());
    }
}
