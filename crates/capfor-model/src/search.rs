//! Cross-validated hyperparameter grid search.
//!
//! Every parameter combination is scored by k-fold cross-validation
//! (mean validation NLL over folds) on a scoped rayon pool; the best
//! combination wins. No early stopping is involved in this mode.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use capfor_core::{CapforError, CapforResult};

use crate::booster::{BoosterParams, NormalBooster};
use crate::matrix::FeatureMatrix;

/// Candidate values per hyperparameter. The cartesian product is
/// evaluated.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    pub max_depth: Vec<usize>,
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub minibatch_frac: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub params: BoosterParams,
    /// Mean validation NLL of the winning combination.
    pub score: f64,
}

impl ParamGrid {
    pub fn expand(&self, base: &BoosterParams) -> Vec<BoosterParams> {
        let mut candidates = Vec::new();
        for &max_depth in &self.max_depth {
            for &n_estimators in &self.n_estimators {
                for &learning_rate in &self.learning_rate {
                    for &minibatch_frac in &self.minibatch_frac {
                        candidates.push(BoosterParams {
                            max_depth,
                            n_estimators,
                            learning_rate,
                            minibatch_frac,
                            ..base.clone()
                        });
                    }
                }
            }
        }
        candidates
    }
}

/// Shuffled k-fold row partition; every fold gets `n / k` or one more.
fn make_folds(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (position, row) in indices.into_iter().enumerate() {
        folds[position % k].push(row);
    }
    folds
}

fn score_candidate(
    params: &BoosterParams,
    x: &FeatureMatrix,
    y: &[f64],
    folds: &[Vec<usize>],
) -> CapforResult<f64> {
    let mut total = 0.0;
    for held_out in folds {
        let train_rows: Vec<usize> = folds
            .iter()
            .filter(|fold| !std::ptr::eq(*fold, held_out))
            .flatten()
            .copied()
            .collect();
        let x_train = x.take_rows(&train_rows);
        let y_train: Vec<f64> = train_rows.iter().map(|&i| y[i]).collect();
        let x_fold = x.take_rows(held_out);
        let y_fold: Vec<f64> = held_out.iter().map(|&i| y[i]).collect();

        let booster = NormalBooster::fit(params.clone(), &x_train, &y_train)?;
        total += booster
            .predict_dist(&x_fold, None)?
            .mean_nll(&y_fold)?;
    }
    Ok(total / folds.len() as f64)
}

/// Evaluate the grid with `cv_folds`-fold cross-validation and return the
/// best combination. `jobs == 0` means one worker per CPU. Workers only
/// read the shared inputs; results are reduced by best score.
pub fn grid_search(
    x: &FeatureMatrix,
    y: &[f64],
    grid: &ParamGrid,
    base: &BoosterParams,
    cv_folds: usize,
    jobs: usize,
) -> CapforResult<SearchOutcome> {
    if cv_folds < 2 {
        return Err(CapforError::Other(format!(
            "cross-validation needs at least 2 folds, got {cv_folds}"
        )));
    }
    if y.len() < cv_folds {
        return Err(CapforError::Other(format!(
            "cannot make {cv_folds} folds out of {} samples",
            y.len()
        )));
    }
    let candidates = grid.expand(base);
    if candidates.is_empty() {
        return Err(CapforError::Other("hyperparameter grid is empty".into()));
    }
    let folds = make_folds(y.len(), cv_folds, base.seed);

    let thread_count = if jobs == 0 { num_cpus::get() } else { jobs };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .map_err(|e| CapforError::Other(format!("building search thread pool: {e}")))?;

    let scored: CapforResult<Vec<(usize, f64)>> = pool.install(|| {
        candidates
            .par_iter()
            .enumerate()
            .map(|(idx, params)| Ok((idx, score_candidate(params, x, y, &folds)?)))
            .collect()
    });
    let scored = scored?;

    let best = scored
        .into_iter()
        .filter(|(_, score)| score.is_finite())
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| CapforError::Other("no grid candidate produced a finite score".into()))?;

    Ok(SearchOutcome {
        params: candidates[best.0].clone(),
        score: best.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_partition_all_rows() {
        let folds = make_folds(23, 5, 42);
        assert_eq!(folds.len(), 5);
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..23).collect::<Vec<_>>());
        for fold in &folds {
            assert!(fold.len() == 4 || fold.len() == 5);
        }
    }

    #[test]
    fn folds_are_seeded() {
        assert_eq!(make_folds(20, 4, 7), make_folds(20, 4, 7));
        assert_ne!(make_folds(20, 4, 7), make_folds(20, 4, 8));
    }

    #[test]
    fn search_picks_a_candidate_from_the_grid() {
        let xs: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..30).map(|i| if i < 15 { 0.2 } else { 0.8 }).collect();
        let x = FeatureMatrix::from_columns(&[xs]).unwrap();
        let grid = ParamGrid {
            max_depth: vec![1, 2],
            n_estimators: vec![20],
            learning_rate: vec![0.1],
            minibatch_frac: vec![1.0],
        };
        let outcome = grid_search(&x, &y, &grid, &BoosterParams::default(), 3, 1).unwrap();
        assert!(outcome.score.is_finite());
        assert_eq!(outcome.params.n_estimators, 20);
        assert!(grid.max_depth.contains(&outcome.params.max_depth));
    }

    #[test]
    fn too_few_samples_for_folds_is_rejected() {
        let x = FeatureMatrix::from_columns(&[vec![1.0, 2.0, 3.0]]).unwrap();
        let grid = ParamGrid {
            max_depth: vec![1],
            n_estimators: vec![5],
            learning_rate: vec![0.1],
            minibatch_frac: vec![1.0],
        };
        let err = grid_search(&x, &[0.1, 0.2, 0.3], &grid, &BoosterParams::default(), 5, 1);
        assert!(err.is_err());
    }
}
