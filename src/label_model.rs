//! The label model: accuracy fitting and posterior prediction.
//!
//! `LabelModel` owns the latent per-(task, source) gamma parameters. It
//! learns them by gradient descent on a matrix-factorization residual tying
//! the pairwise product of gammas to the empirical overlaps matrix, then
//! predicts per-point label distributions from the derived log-odds
//! accuracies in closed form.

use ndarray::{Array1, Array2};
use sprs::CsMat;

use crate::config::LabelModelConfig;
use crate::error::LabelModelError;
use crate::multitask::MultiTask;
use crate::optim::{Optimizer, Sgd};
use crate::overlaps::overlaps_matrix;

/// Validated model dimensions, committed only once every input check passes.
#[derive(Debug, Clone)]
struct Dims {
    /// Number of tasks.
    t: usize,
    /// Number of labeling sources; shared by every task.
    m: usize,
    /// Label cardinality per task.
    k_t: Vec<usize>,
}

/// Per-epoch loss trajectory of one training run. Observability only: the
/// fit ignores it.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub n_epochs: usize,
    pub final_loss: f64,
    pub loss_history: Vec<f64>,
}

/// A label model over conditionally-independent, unipolar labeling sources.
///
/// Training learns one accuracy parameter per (task, source) pair from the
/// votes alone; prediction combines each source's sign-adjusted vote,
/// weighted by its log-odds accuracy, into a softmax posterior per data
/// point.
pub struct LabelModel {
    config: LabelModelConfig,
    /// Valid class labels per task; `None` until provided or inferred.
    label_map: Option<Vec<Vec<usize>>>,
    /// Whether the caller declared more than one task up front. Controls
    /// how per-task results are wrapped.
    multitask: bool,
    /// Accepted but inert: source dependencies are not modeled under the
    /// conditional independence assumption.
    deps: Vec<(usize, usize)>,
    dims: Option<Dims>,
    /// T x M latent accuracy parameters. `None` until trained; mutated only
    /// by the fit loop, read-only afterward.
    gamma: Option<Array2<f64>>,
}

impl LabelModel {
    /// Create an untrained model.
    ///
    /// `label_map` lists the valid class labels for each task and defines
    /// each task's cardinality. It may be omitted only in the single-task
    /// case, where the cardinality is inferred from the maximum observed
    /// vote at training time.
    pub fn new(label_map: Option<Vec<Vec<usize>>>, config: LabelModelConfig) -> Self {
        let multitask = label_map.as_ref().map_or(false, |lm| lm.len() > 1);
        LabelModel {
            config,
            label_map,
            multitask,
            deps: Vec::new(),
            dims: None,
            gamma: None,
        }
    }

    /// Declare known dependencies between sources. Stored for forward
    /// compatibility; the current model assumes conditional independence and
    /// never consults them.
    pub fn with_dependencies(mut self, deps: Vec<(usize, usize)>) -> Self {
        self.deps = deps;
        self
    }

    /// Declared source dependencies. Always empty unless set via
    /// [`with_dependencies`](Self::with_dependencies).
    pub fn dependencies(&self) -> &[(usize, usize)] {
        &self.deps
    }

    pub fn n_tasks(&self) -> Option<usize> {
        self.dims.as_ref().map(|d| d.t)
    }

    pub fn n_sources(&self) -> Option<usize> {
        self.dims.as_ref().map(|d| d.m)
    }

    pub fn cardinalities(&self) -> Option<&[usize]> {
        self.dims.as_ref().map(|d| d.k_t.as_slice())
    }

    /// The fitted gamma parameters, if the model has been trained.
    pub fn gamma(&self) -> Option<&Array2<f64>> {
        self.gamma.as_ref()
    }

    fn gamma_ref(&self) -> &Array2<f64> {
        self.gamma.as_ref().expect("model has not been trained")
    }

    fn dims_ref(&self) -> &Dims {
        self.dims.as_ref().expect("model has not been trained")
    }

    /// Learn source accuracies from the training votes.
    ///
    /// Validation is eager: every shape, cardinality, and unipolarity check
    /// (and the overlaps construction they feed) runs before any model state
    /// is mutated, so a failed call leaves the model untouched.
    ///
    /// `true_accs` is a diagnostic side channel: when supplied together with
    /// `verbose`, the mean squared accuracy-estimation error is logged along
    /// with the loss. It has no effect on training dynamics.
    pub fn train(
        &mut self,
        l_train: MultiTask<CsMat<usize>>,
        true_accs: Option<&Array2<f64>>,
    ) -> Result<TrainReport, LabelModelError> {
        let train_config = self.config.train.clone();

        let (l, dims, label_map) = self.check_votes(l_train.into_tasks(), true)?;

        // Overlaps matrices for each task. Polarity violations surface here,
        // still before any state is committed.
        let o: Vec<Array2<f64>> = l
            .iter()
            .enumerate()
            .map(|(t, l_t)| overlaps_matrix(l_t, t))
            .collect::<Result<_, _>>()?;

        self.dims = Some(dims.clone());
        self.label_map = Some(label_map);
        // Non-zero init: breaks the symmetry of the pairwise-product loss.
        self.gamma = Some(Array2::from_elem(
            (dims.t, dims.m),
            train_config.gamma_init,
        ));

        let mut optimizer = Sgd::new(&train_config.optimizer, (dims.t, dims.m));
        let print_at = train_config.print_at.max(1);
        let mut loss_history = Vec::with_capacity(train_config.n_epochs);

        for epoch in 0..train_config.n_epochs {
            // Every step uses the full overlap statistics; one step is one
            // epoch.
            let loss = self.total_loss(&o, train_config.l2);
            let grad = self.loss_grad(&o, train_config.l2);
            if let Some(gamma) = self.gamma.as_mut() {
                optimizer.step(gamma, &grad);
            }
            loss_history.push(loss);

            if self.config.verbose
                && (epoch % print_at == 0 || epoch == train_config.n_epochs - 1)
            {
                match true_accs {
                    Some(accs) => log::info!(
                        "[Epoch {}] Loss: {:.6}\tAccs mean sq. error = {:.6}",
                        epoch,
                        loss,
                        self.get_accs_score(accs)
                    ),
                    None => log::info!("[Epoch {}] Loss: {:.6}", epoch, loss),
                }
            }
        }

        if self.config.verbose {
            log::info!("Finished training");
        }

        let final_loss = self.total_loss(&o, train_config.l2);
        Ok(TrainReport {
            n_epochs: train_config.n_epochs,
            final_loss,
            loss_history,
        })
    }

    /// The scaled factorization loss for task `t`: the squared residual
    /// between each off-diagonal pairwise gamma product and the observed
    /// overlap, normalized by the number of off-diagonal pairs, plus an L2
    /// term centered on `gamma_init` (so the init doubles as a prior).
    fn task_loss(&self, o_t: &Array2<f64>, t: usize, l2: f64) -> f64 {
        let gamma = self.gamma_ref();
        let gamma_init = self.config.train.gamma_init;
        let m = gamma.ncols();

        let mut loss = 0.0;
        for i in 0..m {
            for j in 0..m {
                if i != j {
                    let r = gamma[[t, i]] * gamma[[t, j]] - o_t[[i, j]];
                    loss += r * r;
                }
            }
        }
        loss /= ((m * m).saturating_sub(m)).max(1) as f64;

        if l2 > 0.0 {
            loss += l2
                * (0..m)
                    .map(|i| (gamma[[t, i]] - gamma_init).powi(2))
                    .sum::<f64>();
        }
        loss
    }

    /// Total loss: summed over tasks, not averaged, so tasks with more
    /// sources contribute proportionally more gradient signal.
    fn total_loss(&self, o: &[Array2<f64>], l2: f64) -> f64 {
        o.iter()
            .enumerate()
            .map(|(t, o_t)| self.task_loss(o_t, t, l2))
            .sum()
    }

    /// Closed-form gradient of the total loss with respect to gamma. Uses
    /// the symmetry of the overlaps matrix: the (i,j) and (j,i) residuals
    /// are equal, giving a factor of 4 on the pairwise term.
    fn loss_grad(&self, o: &[Array2<f64>], l2: f64) -> Array2<f64> {
        let gamma = self.gamma_ref();
        let gamma_init = self.config.train.gamma_init;
        let (n_tasks, m) = gamma.dim();
        let norm = ((m * m).saturating_sub(m)).max(1) as f64;

        let mut grad = Array2::zeros((n_tasks, m));
        for t in 0..n_tasks {
            let o_t = &o[t];
            for k in 0..m {
                let mut g = 0.0;
                for j in 0..m {
                    if j != k {
                        g += (gamma[[t, k]] * gamma[[t, j]] - o_t[[k, j]]) * gamma[[t, j]];
                    }
                }
                let mut g = 4.0 * g / norm;
                if l2 > 0.0 {
                    g += 2.0 * l2 * (gamma[[t, k]] - gamma_init);
                }
                grad[[t, k]] = g;
            }
        }
        grad
    }

    /// Estimated source accuracies, derived from gamma and clamped to
    /// [0.01, 0.99].
    ///
    /// # Panics
    ///
    /// Panics if the model has not been trained.
    pub fn accs(&self) -> Array2<f64> {
        self.gamma_ref().mapv(|g| (0.5 * (g + 1.0)).clamp(0.01, 0.99))
    }

    /// Log-odds of the estimated accuracies, `ln(a / (1 - a))`. Finite for
    /// any gamma thanks to the accuracy clamp.
    ///
    /// # Panics
    ///
    /// Panics if the model has not been trained.
    pub fn log_odds_accs(&self) -> Array2<f64> {
        self.accs().mapv(|a| (a / (1.0 - a)).ln())
    }

    /// Averaged squared accuracy-estimation error against known ground
    /// truth. Diagnostic only.
    ///
    /// # Panics
    ///
    /// Panics if the model has not been trained.
    pub fn get_accs_score(&self, true_accs: &Array2<f64>) -> f64 {
        let diff = self.accs() - true_accs;
        diff.mapv(|d| d * d).sum() / self.dims_ref().m as f64
    }

    /// Conditional probabilities P(y_t | votes) for every task.
    ///
    /// Validates the input against the trained dimensions, dispatches per
    /// task, and wraps the per-task [N, K_t] probability matrices in the
    /// model's single/multi-task shape.
    ///
    /// # Panics
    ///
    /// Panics if the model has not been trained.
    pub fn predict_proba(
        &self,
        l: MultiTask<CsMat<usize>>,
    ) -> Result<MultiTask<Array2<f64>>, LabelModelError> {
        let (l, _, _) = self.check_votes(l.into_tasks(), false)?;
        let outputs: Vec<Array2<f64>> = l
            .iter()
            .enumerate()
            .map(|(t, l_t)| self.predict_task_proba(l_t, t))
            .collect::<Result<_, _>>()?;
        Ok(MultiTask::wrap(outputs, self.multitask))
    }

    /// Conditional probabilities P(y_t | votes) for a single task.
    ///
    /// For each candidate class k, each source contributes +1 (voted k),
    /// -1 (voted another class), or 0 (abstained), weighted by its log-odds
    /// accuracy; a row-wise softmax over the class scores gives the
    /// posterior. This is the closed-form Naive-Bayes posterior for
    /// conditionally-independent unipolar voters; abstentions contribute no
    /// evidence, so an all-abstain row comes out uniform.
    ///
    /// Pure and deterministic: identical inputs produce identical output.
    /// A vote value exceeding the task's cardinality is rejected, exactly as
    /// at training entry.
    ///
    /// # Panics
    ///
    /// Panics if the model has not been trained, if `t` is out of range, or
    /// if the matrix has the wrong number of source columns.
    pub fn predict_task_proba(
        &self,
        l_t: &CsMat<usize>,
        t: usize,
    ) -> Result<Array2<f64>, LabelModelError> {
        let dims = self.dims_ref();
        assert!(t < dims.t, "task index {} out of range", t);
        let (n, m) = l_t.shape();
        assert_eq!(m, dims.m, "vote matrix has {} sources, expected {}", m, dims.m);
        let k_t = dims.k_t[t];

        let max_value = max_vote(l_t);
        if max_value > k_t {
            return Err(LabelModelError::CardinalityViolation {
                task: t,
                cardinality: k_t,
                max_value,
            });
        }

        let theta: Array1<f64> = self.log_odds_accs().row(t).to_owned();
        // Dense expansion; recreated per call, never cached.
        let dense: Array2<usize> = l_t.to_dense();

        let mut scores = Array2::<f64>::zeros((n, k_t));
        for y in 1..=k_t {
            let signs = dense.mapv(|v| {
                if v == y {
                    1.0
                } else if v != 0 {
                    -1.0
                } else {
                    0.0
                }
            });
            scores.column_mut(y - 1).assign(&signs.dot(&theta));
        }

        // Row-wise softmax, shifted by the row max for stability.
        for mut row in scores.rows_mut() {
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let max = if max.is_finite() { max } else { 0.0 };
            let mut sum = 0.0;
            for v in row.iter_mut() {
                *v = (*v - max).exp();
                sum += *v;
            }
            for v in row.iter_mut() {
                *v /= sum;
            }
        }
        Ok(scores)
    }

    /// Check the format and content of the per-task vote matrices.
    ///
    /// Converts each matrix to CSC for efficient per-source column slicing.
    /// With `init` set, the model dimensions and (if absent) the label map
    /// are derived from the input; otherwise everything is checked against
    /// the trained dimensions. Nothing on `self` is mutated either way.
    fn check_votes(
        &self,
        l: Vec<CsMat<usize>>,
        init: bool,
    ) -> Result<(Vec<CsMat<usize>>, Dims, Vec<Vec<usize>>), LabelModelError> {
        let n_tasks = l.len();
        if n_tasks == 0 {
            return Err(LabelModelError::ShapeMismatch {
                task: 0,
                found: 0,
                expected: 1,
            });
        }

        // Number of tasks must match the declared label map, or the trained
        // dimensions on a post-training call.
        if let Some(label_map) = &self.label_map {
            if label_map.len() != n_tasks {
                return Err(LabelModelError::ShapeMismatch {
                    task: 0,
                    found: n_tasks,
                    expected: label_map.len(),
                });
            }
        }
        if !init {
            let dims = self.dims_ref();
            if n_tasks != dims.t {
                return Err(LabelModelError::ShapeMismatch {
                    task: 0,
                    found: n_tasks,
                    expected: dims.t,
                });
            }
        }

        let l: Vec<CsMat<usize>> = l
            .into_iter()
            .map(|l_t| if l_t.is_csc() { l_t } else { l_t.to_csc() })
            .collect();

        // All tasks share N (data points) and M (sources).
        let (n, m) = l[0].shape();
        for (t, l_t) in l.iter().enumerate() {
            let (n_t, m_t) = l_t.shape();
            if n_t != n {
                return Err(LabelModelError::ShapeMismatch {
                    task: t,
                    found: n_t,
                    expected: n,
                });
            }
            if m_t != m {
                return Err(LabelModelError::ShapeMismatch {
                    task: t,
                    found: m_t,
                    expected: m,
                });
            }
        }
        if !init && m != self.dims_ref().m {
            return Err(LabelModelError::ShapeMismatch {
                task: 0,
                found: m,
                expected: self.dims_ref().m,
            });
        }

        // Resolve the label map: provided, already trained, or inferred from
        // the maximum observed vote (single-task only).
        let label_map: Vec<Vec<usize>> = match &self.label_map {
            Some(label_map) => label_map.clone(),
            None => {
                if n_tasks > 1 {
                    return Err(LabelModelError::AmbiguousLabelMap);
                }
                let k = max_vote(&l[0]);
                vec![(1..=k).collect()]
            }
        };
        let k_t: Vec<usize> = label_map.iter().map(|labels| labels.len()).collect();

        for (t, l_t) in l.iter().enumerate() {
            let max_value = max_vote(l_t);
            if max_value > k_t[t] {
                return Err(LabelModelError::CardinalityViolation {
                    task: t,
                    cardinality: k_t[t],
                    max_value,
                });
            }
        }

        let dims = Dims {
            t: n_tasks,
            m,
            k_t,
        };
        Ok((l, dims, label_map))
    }
}

fn max_vote(l_t: &CsMat<usize>) -> usize {
    l_t.data().iter().copied().max().unwrap_or(0)
}
