//! Epsilon-insensitive support-vector regression.
//!
//! The dual is solved in its 2n-variable form (one α and one α* per sample)
//! with SMO: each step picks the maximal-violating pair using second-order
//! information and solves the two-variable subproblem analytically. The
//! prediction is `f(x) = Σ (α_s − α*_s) K(x_s, x) − ρ`.
//!
//! SVR is single-output. Multi-column labels either fit one independent
//! machine per column or are rejected, depending on [`SvrLabelPolicy`].

use std::collections::VecDeque;
use std::rc::Rc;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::{check_features, check_fit_inputs, Regressor};
use crate::error::{Error, Result};

const TAU: f64 = 1e-12;
const DEFAULT_TOL: f64 = 1e-3;
pub(crate) const DEFAULT_MAX_ITER: usize = 1_000_000;
/// Memory budget for cached kernel rows.
const CACHE_BYTES: usize = 100 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gamma {
    /// `1 / (n_features · var(X))`, or 1 for constant input.
    Scale,
    Value(f64),
}

fn scale() -> Gamma {
    Gamma::Scale
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Poly {
        degree: u32,
        #[serde(default = "scale")]
        gamma: Gamma,
        #[serde(default)]
        coef0: f64,
    },
    Rbf {
        #[serde(default = "scale")]
        gamma: Gamma,
    },
}

impl Kernel {
    pub fn label(&self) -> &'static str {
        match self {
            Kernel::Linear => "linear",
            Kernel::Poly { .. } => "polynomial",
            Kernel::Rbf { .. } => "RBF",
        }
    }
}

/// Handling of label tables with more than one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvrLabelPolicy {
    /// Fit one machine per label column.
    #[default]
    PerColumn,
    /// Reject multi-column labels with [`Error::MultiOutputUnsupported`].
    RequireSingle,
}

/// Kernel with `gamma` resolved against the training data.
#[derive(Debug, Clone, Copy)]
struct KernelFn {
    kernel: Kernel,
    gamma: f64,
}

impl KernelFn {
    fn resolve(kernel: Kernel, x: ArrayView2<f64>) -> Self {
        let gamma = match kernel {
            Kernel::Linear => 0.0,
            Kernel::Poly { gamma, .. } | Kernel::Rbf { gamma } => match gamma {
                Gamma::Value(g) => g,
                Gamma::Scale => {
                    let var = x.var(0.0);
                    if var > 0.0 { 1.0 / (x.ncols() as f64 * var) } else { 1.0 }
                }
            },
        };
        Self { kernel, gamma }
    }

    fn eval(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self.kernel {
            Kernel::Linear => a.dot(&b),
            Kernel::Poly { degree, coef0, .. } => {
                (self.gamma * a.dot(&b) + coef0).powi(degree as i32)
            }
            Kernel::Rbf { .. } => {
                let d2: f64 = a.iter().zip(b).map(|(p, q)| (p - q).powi(2)).sum();
                (-self.gamma * d2).exp()
            }
        }
    }
}

/// Kernel rows `K(x_s, ·)` over the training set, computed on demand and
/// kept within [`CACHE_BYTES`]. The oldest row is evicted first.
struct KernelCache<'a> {
    kf: &'a KernelFn,
    x: ArrayView2<'a, f64>,
    rows: Vec<Option<Rc<[f64]>>>,
    order: VecDeque<usize>,
    capacity: usize,
}

impl<'a> KernelCache<'a> {
    fn new(kf: &'a KernelFn, x: ArrayView2<'a, f64>) -> Self {
        let n = x.nrows().max(1);
        let capacity = CACHE_BYTES / (n * std::mem::size_of::<f64>());
        Self::with_capacity(kf, x, capacity)
    }

    /// At least two rows are always kept: one SMO step needs both.
    fn with_capacity(kf: &'a KernelFn, x: ArrayView2<'a, f64>, capacity: usize) -> Self {
        Self {
            kf,
            x,
            rows: vec![None; x.nrows()],
            order: VecDeque::new(),
            capacity: capacity.max(2),
        }
    }

    fn row(&mut self, s: usize) -> Rc<[f64]> {
        if let Some(row) = &self.rows[s] {
            return Rc::clone(row);
        }
        let xs = self.x.row(s);
        let row: Rc<[f64]> = self.x.rows().into_iter().map(|xt| self.kf.eval(xs, xt)).collect();
        if self.order.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.rows[old] = None;
            }
        }
        self.rows[s] = Some(Rc::clone(&row));
        self.order.push_back(s);
        row
    }
}

/// One fitted single-output machine.
#[derive(Debug, Clone)]
struct Machine {
    support: Array2<f64>,
    coef: Vec<f64>,
    rho: f64,
}

impl Machine {
    fn decision(&self, kf: &KernelFn, x: ArrayView1<f64>) -> f64 {
        self.support
            .rows()
            .into_iter()
            .zip(&self.coef)
            .map(|(sv, c)| c * kf.eval(sv, x))
            .sum::<f64>()
            - self.rho
    }
}

#[derive(Debug, Clone)]
pub struct Svr {
    kernel: Kernel,
    c: f64,
    epsilon: f64,
    tol: f64,
    max_iter: usize,
    label_policy: SvrLabelPolicy,
    kernel_fn: Option<KernelFn>,
    machines: Vec<Machine>,
    n_features: usize,
}

impl Svr {
    pub fn new(kernel: Kernel, c: f64, epsilon: f64) -> Self {
        Self {
            kernel,
            c,
            epsilon,
            tol: DEFAULT_TOL,
            max_iter: DEFAULT_MAX_ITER,
            label_policy: SvrLabelPolicy::default(),
            kernel_fn: None,
            machines: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_label_policy(mut self, policy: SvrLabelPolicy) -> Self {
        self.label_policy = policy;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Number of support vectors per fitted label column.
    pub fn n_support(&self) -> Vec<usize> {
        self.machines.iter().map(|m| m.coef.len()).collect()
    }

    fn solve(&self, kf: &KernelFn, x: ArrayView2<f64>, z: ArrayView1<f64>) -> Machine {
        let n = x.nrows();
        let l = 2 * n;
        let c = self.c;
        let sign = |t: usize| if t < n { 1.0 } else { -1.0 };
        let diag: Vec<f64> = (0..n).map(|s| kf.eval(x.row(s), x.row(s))).collect();
        let mut cache = KernelCache::new(kf, x.view());

        let mut alpha = vec![0.0f64; l];
        let mut grad: Vec<f64> = (0..l)
            .map(|t| if t < n { self.epsilon - z[t] } else { self.epsilon + z[t - n] })
            .collect();

        let mut iter = 0;
        while iter < self.max_iter {
            // i: maximal -y·G over the set that may move up
            let mut gmax = f64::NEG_INFINITY;
            let mut i = usize::MAX;
            for t in 0..l {
                let can_up = if t < n { alpha[t] < c } else { alpha[t] > 0.0 };
                if can_up && -sign(t) * grad[t] >= gmax {
                    gmax = -sign(t) * grad[t];
                    i = t;
                }
            }
            if i == usize::MAX {
                break;
            }
            let k_i = cache.row(i % n);

            // j: second-order choice over the set that may move down
            let mut gmax2 = f64::NEG_INFINITY;
            let mut j = usize::MAX;
            let mut obj_min = f64::INFINITY;
            for t in 0..l {
                let can_down = if t < n { alpha[t] > 0.0 } else { alpha[t] < c };
                if !can_down {
                    continue;
                }
                let yg = sign(t) * grad[t];
                gmax2 = gmax2.max(yg);
                let grad_diff = gmax + yg;
                if grad_diff > 0.0 {
                    let quad = diag[i % n] + diag[t % n] - 2.0 * k_i[t % n];
                    let obj = -(grad_diff * grad_diff) / if quad > 0.0 { quad } else { TAU };
                    if obj <= obj_min {
                        obj_min = obj;
                        j = t;
                    }
                }
            }
            if gmax + gmax2 < self.tol || j == usize::MAX {
                break;
            }
            let k_j = cache.row(j % n);

            let (yi, yj) = (sign(i), sign(j));
            let (old_i, old_j) = (alpha[i], alpha[j]);
            let quad = diag[i % n] + diag[j % n] - 2.0 * k_i[j % n];
            let quad = if quad > 0.0 { quad } else { TAU };
            if yi != yj {
                let delta = (-grad[i] - grad[j]) / quad;
                let diff = alpha[i] - alpha[j];
                alpha[i] += delta;
                alpha[j] += delta;
                if diff > 0.0 {
                    if alpha[j] < 0.0 {
                        alpha[j] = 0.0;
                        alpha[i] = diff;
                    }
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = c - diff;
                    }
                } else {
                    if alpha[i] < 0.0 {
                        alpha[i] = 0.0;
                        alpha[j] = -diff;
                    }
                    if alpha[j] > c {
                        alpha[j] = c;
                        alpha[i] = c + diff;
                    }
                }
            } else {
                let delta = (grad[i] - grad[j]) / quad;
                let sum = alpha[i] + alpha[j];
                alpha[i] -= delta;
                alpha[j] += delta;
                if sum > c {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = sum - c;
                    }
                    if alpha[j] > c {
                        alpha[j] = c;
                        alpha[i] = sum - c;
                    }
                } else {
                    if alpha[j] < 0.0 {
                        alpha[j] = 0.0;
                        alpha[i] = sum;
                    }
                    if alpha[i] < 0.0 {
                        alpha[i] = 0.0;
                        alpha[j] = sum;
                    }
                }
            }

            let (di, dj) = (alpha[i] - old_i, alpha[j] - old_j);
            for (t, g) in grad.iter_mut().enumerate() {
                *g += sign(t) * (yi * k_i[t % n] * di + yj * k_j[t % n] * dj);
            }
            iter += 1;
        }
        if iter >= self.max_iter {
            log::warn!(
                target: "tendency::sweep",
                "SVR ({}) stopped after {} iterations without reaching tolerance {}",
                self.kernel.label(),
                iter,
                self.tol
            );
        }

        let rho = {
            let (mut ub, mut lb) = (f64::INFINITY, f64::NEG_INFINITY);
            let (mut n_free, mut sum_free) = (0usize, 0.0f64);
            for t in 0..l {
                let yg = sign(t) * grad[t];
                let upper = alpha[t] >= c;
                let lower = alpha[t] <= 0.0;
                if upper {
                    if sign(t) < 0.0 { ub = ub.min(yg) } else { lb = lb.max(yg) }
                } else if lower {
                    if sign(t) > 0.0 { ub = ub.min(yg) } else { lb = lb.max(yg) }
                } else {
                    n_free += 1;
                    sum_free += yg;
                }
            }
            if n_free > 0 { sum_free / n_free as f64 } else { (ub + lb) / 2.0 }
        };

        let support_rows: Vec<usize> = (0..n).filter(|&s| alpha[s] != alpha[s + n]).collect();
        let coef = support_rows.iter().map(|&s| alpha[s] - alpha[s + n]).collect();
        Machine { support: x.select(Axis(0), &support_rows), coef, rho }
    }
}

impl Regressor for Svr {
    fn name(&self) -> &'static str {
        "SVR"
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<()> {
        check_fit_inputs(x, y)?;
        if y.ncols() > 1 && self.label_policy == SvrLabelPolicy::RequireSingle {
            return Err(Error::MultiOutputUnsupported {
                estimator: format!("SVR ({})", self.kernel.label()),
                columns: y.ncols(),
            });
        }
        let kf = KernelFn::resolve(self.kernel, x);
        self.machines = y.columns().into_iter().map(|z| self.solve(&kf, x, z)).collect();
        self.kernel_fn = Some(kf);
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        let kf = self.kernel_fn.as_ref().ok_or(Error::NotFitted("SVR"))?;
        check_features(self.n_features, x)?;
        Ok(Array2::from_shape_fn((x.nrows(), self.machines.len()), |(r, o)| {
            self.machines[o].decision(kf, x.row(r))
        }))
    }
}
