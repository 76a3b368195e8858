//! First-order optimization for the accuracy parameters.
//!
//! The fitter's loss has a closed-form gradient, so no autodiff backend is
//! needed: the `Optimizer` trait only sees parameters and a gradient of the
//! same shape. `Sgd` implements the usual momentum update with optional
//! weight decay, matching the full-batch training loop in
//! `LabelModel::train`.

use ndarray::Array2;

use crate::config::SgdConfig;

/// A narrow first-order update interface: given parameters and the gradient
/// of the loss at those parameters, apply one in-place step.
pub trait Optimizer {
    fn step(&mut self, params: &mut Array2<f64>, grad: &Array2<f64>);
}

/// Gradient descent with momentum and optional weight decay.
///
/// The velocity buffer persists across steps for the duration of one fit and
/// starts at zero.
pub struct Sgd {
    lr: f64,
    momentum: f64,
    weight_decay: f64,
    velocity: Array2<f64>,
}

impl Sgd {
    pub fn new(config: &SgdConfig, shape: (usize, usize)) -> Self {
        Sgd {
            lr: config.lr,
            momentum: config.momentum,
            weight_decay: config.weight_decay,
            velocity: Array2::zeros(shape),
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut Array2<f64>, grad: &Array2<f64>) {
        assert_eq!(params.dim(), grad.dim(), "gradient shape mismatch");
        assert_eq!(params.dim(), self.velocity.dim(), "velocity shape mismatch");

        for ((v, g), p) in self
            .velocity
            .iter_mut()
            .zip(grad.iter())
            .zip(params.iter_mut())
        {
            let g = g + self.weight_decay * *p;
            *v = self.momentum * *v + g;
            *p -= self.lr * *v;
        }
    }
}
