//! Depth-limited regression tree, the base learner of the booster.
//!
//! Splits minimize the summed squared error of the two children, found
//! per feature by a sorted sweep with prefix sums.

use crate::matrix::FeatureMatrix;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Summed squared-error reduction attributed to each feature by the
    /// splits of this tree.
    feature_gains: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_leaf: 1,
        }
    }
}

struct Builder<'a> {
    x: &'a FeatureMatrix,
    targets: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
    feature_gains: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit on the rows named by `rows`; `targets` is indexed by the same
    /// row ids as `x`.
    pub fn fit(x: &FeatureMatrix, targets: &[f64], rows: &[usize], params: TreeParams) -> Self {
        let mut builder = Builder {
            x,
            targets,
            params,
            nodes: Vec::new(),
            feature_gains: vec![0.0; x.cols()],
        };
        let mut rows = rows.to_vec();
        builder.build(&mut rows, 0);
        RegressionTree {
            nodes: builder.nodes,
            feature_gains: builder.feature_gains,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn feature_gains(&self) -> &[f64] {
        &self.feature_gains
    }
}

impl Builder<'_> {
    /// Append the subtree for `rows`, returning its node index.
    fn build(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let mean = rows.iter().map(|&i| self.targets[i]).sum::<f64>() / rows.len() as f64;
        if depth >= self.params.max_depth || rows.len() < 2 * self.params.min_samples_leaf {
            return self.push_leaf(mean);
        }
        let Some(split) = self.best_split(rows) else {
            return self.push_leaf(mean);
        };

        self.feature_gains[split.feature] += split.gain;
        let mid = partition(rows, |i| self.x.get(i, split.feature) <= split.threshold);
        // A degenerate partition can only happen with pathological float
        // comparisons; fall back to a leaf rather than recurse forever.
        if mid == 0 || mid == rows.len() {
            return self.push_leaf(mean);
        }

        let node = self.push_leaf(0.0); // placeholder, rewritten below
        let (left_rows, right_rows) = rows.split_at_mut(mid);
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node
    }

    fn push_leaf(&mut self, value: f64) -> usize {
        self.nodes.push(Node::Leaf { value });
        self.nodes.len() - 1
    }

    fn best_split(&self, rows: &[usize]) -> Option<BestSplit> {
        let n = rows.len();
        let min_leaf = self.params.min_samples_leaf;
        let total_sum: f64 = rows.iter().map(|&i| self.targets[i]).sum();
        let total_sq: f64 = rows.iter().map(|&i| self.targets[i] * self.targets[i]).sum();
        let total_sse = total_sq - total_sum * total_sum / n as f64;

        let mut best: Option<BestSplit> = None;
        let mut order: Vec<usize> = rows.to_vec();
        for feature in 0..self.x.cols() {
            order.sort_by(|&a, &b| {
                self.x
                    .get(a, feature)
                    .partial_cmp(&self.x.get(b, feature))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for (k, &i) in order.iter().enumerate().take(n - 1) {
                let y = self.targets[i];
                left_sum += y;
                left_sq += y * y;

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let value = self.x.get(i, feature);
                let next = self.x.get(order[k + 1], feature);
                if value == next {
                    continue; // cannot separate equal feature values
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = left_sq - left_sum * left_sum / n_left as f64;
                let right_sse = right_sq - right_sum * right_sum / n_right as f64;
                let gain = total_sse - left_sse - right_sse;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: 0.5 * (value + next),
                        gain,
                    });
                }
            }
        }
        best
    }
}

/// In-place stable partition; returns the number of elements satisfying
/// the predicate, which end up in the front.
fn partition<F: Fn(usize) -> bool>(rows: &mut [usize], pred: F) -> usize {
    let mut front: Vec<usize> = Vec::with_capacity(rows.len());
    let mut back: Vec<usize> = Vec::new();
    for &i in rows.iter() {
        if pred(i) {
            front.push(i);
        } else {
            back.push(i);
        }
    }
    let mid = front.len();
    rows[..mid].copy_from_slice(&front);
    rows[mid..].copy_from_slice(&back);
    mid
}
