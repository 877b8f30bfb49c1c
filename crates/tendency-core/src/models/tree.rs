//! Multi-output CART regression tree.
//!
//! Splits minimise the summed squared error over all outputs. Equivalently
//! they maximise `Σ_o (S_L,o² / n_L + S_R,o² / n_R)`, where `S` is the
//! per-side label sum. Two split strategies:
//!
//! - `Best`: exhaustive search over sorted feature values, thresholds at
//!   midpoints between distinct neighbours (random forests).
//! - `Random`: one uniformly drawn threshold per feature, best feature wins
//!   (extremely randomised trees).
//!
//! Trees are grown until leaves are pure or hold fewer than
//! `min_samples_split` samples.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    Best,
    Random,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { value: Vec<f64> },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    strategy: SplitStrategy,
    min_samples_split: usize,
    nodes: Vec<Node>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    proxy: f64,
}

impl DecisionTree {
    pub fn new(strategy: SplitStrategy) -> Self {
        Self { strategy, min_samples_split: 2, nodes: Vec::new() }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Grow the tree on the given sample rows (repeats allowed, as in a
    /// bootstrap draw). Inputs are assumed validated by the caller.
    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>, rows: Vec<usize>, rng: &mut StdRng) {
        self.nodes.clear();
        self.nodes.push(Node::Leaf { value: Vec::new() });
        let mut stack = vec![(0usize, rows)];

        while let Some((id, rows)) = stack.pop() {
            let value = mean_rows(y, &rows);
            let splittable = rows.len() >= self.min_samples_split && !is_pure(y, &rows);

            let best = if splittable {
                match self.strategy {
                    SplitStrategy::Best => best_split(x, y, &rows),
                    SplitStrategy::Random => random_split(x, y, &rows, rng),
                }
            } else {
                None
            };

            let Some(cand) = best else {
                self.nodes[id] = Node::Leaf { value };
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                rows.iter().copied().partition(|&r| x[[r, cand.feature]] <= cand.threshold);
            if left_rows.is_empty() || right_rows.is_empty() {
                self.nodes[id] = Node::Leaf { value };
                continue;
            }

            let left = self.nodes.len();
            let right = left + 1;
            self.nodes.push(Node::Leaf { value: Vec::new() });
            self.nodes.push(Node::Leaf { value: Vec::new() });
            self.nodes[id] = Node::Split {
                feature: cand.feature,
                threshold: cand.threshold,
                left,
                right,
            };
            stack.push((right, right_rows));
            stack.push((left, left_rows));
        }
    }

    /// Leaf value for one sample.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split { feature, threshold, left, right } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

fn mean_rows(y: ArrayView2<f64>, rows: &[usize]) -> Vec<f64> {
    let mut sums = vec![0.0; y.ncols()];
    for &r in rows {
        for (s, v) in sums.iter_mut().zip(y.row(r)) {
            *s += v;
        }
    }
    let n = rows.len().max(1) as f64;
    sums.iter().map(|s| s / n).collect()
}

fn is_pure(y: ArrayView2<f64>, rows: &[usize]) -> bool {
    let Some(&first) = rows.first() else {
        return true;
    };
    rows.iter().all(|&r| y.row(r) == y.row(first))
}

fn split_proxy(left: &[f64], n_left: usize, right: &[f64], n_right: usize) -> f64 {
    let (nl, nr) = (n_left as f64, n_right as f64);
    left.iter().map(|s| s * s / nl).sum::<f64>() + right.iter().map(|s| s * s / nr).sum::<f64>()
}

fn best_split(x: ArrayView2<f64>, y: ArrayView2<f64>, rows: &[usize]) -> Option<Candidate> {
    let n_out = y.ncols();
    let total: Vec<f64> = {
        let mut t = vec![0.0; n_out];
        for &r in rows {
            for (s, v) in t.iter_mut().zip(y.row(r)) {
                *s += v;
            }
        }
        t
    };

    let mut best: Option<Candidate> = None;
    let mut order = rows.to_vec();
    let mut left = vec![0.0; n_out];
    let mut right = vec![0.0; n_out];

    for f in 0..x.ncols() {
        order.sort_by(|&a, &b| x[[a, f]].total_cmp(&x[[b, f]]));
        left.iter_mut().for_each(|s| *s = 0.0);

        for i in 0..order.len() - 1 {
            let r = order[i];
            for (s, v) in left.iter_mut().zip(y.row(r)) {
                *s += v;
            }
            let (lo, hi) = (x[[r, f]], x[[order[i + 1], f]]);
            if !(lo < hi) {
                continue;
            }
            for o in 0..n_out {
                right[o] = total[o] - left[o];
            }
            let proxy = split_proxy(&left, i + 1, &right, order.len() - i - 1);
            if best.as_ref().map_or(true, |b| proxy > b.proxy) {
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(Candidate { feature: f, threshold, proxy });
            }
        }
    }
    best
}

fn random_split(
    x: ArrayView2<f64>,
    y: ArrayView2<f64>,
    rows: &[usize],
    rng: &mut StdRng,
) -> Option<Candidate> {
    let n_out = y.ncols();
    let mut best: Option<Candidate> = None;
    let mut left = vec![0.0; n_out];
    let mut right = vec![0.0; n_out];

    for f in 0..x.ncols() {
        let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
            let v = x[[r, f]];
            (lo.min(v), hi.max(v))
        });
        if !(lo < hi) {
            continue;
        }
        let threshold = rng.gen_range(lo..hi);

        left.iter_mut().for_each(|s| *s = 0.0);
        right.iter_mut().for_each(|s| *s = 0.0);
        let mut n_left = 0;
        for &r in rows {
            let side = if x[[r, f]] <= threshold {
                n_left += 1;
                &mut left
            } else {
                &mut right
            };
            for (s, v) in side.iter_mut().zip(y.row(r)) {
                *s += v;
            }
        }
        let n_right = rows.len() - n_left;
        if n_left == 0 || n_right == 0 {
            continue;
        }
        let proxy = split_proxy(&left, n_left, &right, n_right);
        if best.as_ref().map_or(true, |b| proxy > b.proxy) {
            best = Some(Candidate { feature: f, threshold, proxy });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rand::SeedableRng;

    fn step_data() -> (Array2<f64>, Array2<f64>) {
        // y jumps from 0 to 10 at x0 = 4.5; x1 is noise
        let x = Array2::from_shape_fn((10, 2), |(i, j)| if j == 0 { i as f64 } else { ((i * 7) % 5) as f64 });
        let y = Array2::from_shape_fn((10, 1), |(i, _)| if i < 5 { 0.0 } else { 10.0 });
        (x, y)
    }

    #[test]
    fn best_split_finds_the_step() {
        let (x, y) = step_data();
        let mut tree = DecisionTree::new(SplitStrategy::Best);
        let mut rng = StdRng::seed_from_u64(0);
        tree.fit(x.view(), y.view(), (0..10).collect(), &mut rng);
        assert_eq!(tree.n_nodes(), 3, "a single split separates the data");
        assert_eq!(tree.predict_row(array![4.0, 0.0].view()), &[0.0]);
        assert_eq!(tree.predict_row(array![5.0, 0.0].view()), &[10.0]);
        assert_eq!(tree.predict_row(array![4.6, 0.0].view()), &[10.0]);
    }

    #[test]
    fn fully_grown_tree_memorises_training_rows() {
        let x = Array2::from_shape_fn((12, 1), |(i, _)| i as f64);
        let y = Array2::from_shape_fn((12, 2), |(i, k)| ((i * 5 + k) % 7) as f64);
        for strategy in [SplitStrategy::Best, SplitStrategy::Random] {
            let mut tree = DecisionTree::new(strategy);
            let mut rng = StdRng::seed_from_u64(3);
            tree.fit(x.view(), y.view(), (0..12).collect(), &mut rng);
            for i in 0..12 {
                let p = tree.predict_row(x.row(i));
                assert_eq!(p, &[y[[i, 0]], y[[i, 1]]], "{strategy:?} row {i}");
            }
        }
    }

    #[test]
    fn constant_features_give_a_single_leaf() {
        let x = Array2::from_elem((6, 2), 1.0);
        let y = Array2::from_shape_fn((6, 1), |(i, _)| i as f64);
        let mut tree = DecisionTree::new(SplitStrategy::Best);
        let mut rng = StdRng::seed_from_u64(0);
        tree.fit(x.view(), y.view(), (0..6).collect(), &mut rng);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_row(x.row(0)), &[2.5]);
    }
}
