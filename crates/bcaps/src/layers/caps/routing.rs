//! # Dynamic Routing by Agreement
//!
//! Iteratively weights prediction vectors by the agreement between each
//! input capsule's prediction and the emerging output capsule:
//!
//! 1. coupling ``c = softmax(b)`` over the output-capsule axis;
//! 2. weighted sum ``s_j = sum_i c_ij * u_hat_ij``;
//! 3. ``v_j = squash(s_j)``;
//! 4. ``b_ij += <u_hat_ij, v_j>`` (skipped after the final iteration).

use crate::layers::caps::squash::squash;
use bimm_contracts::unpack_shape_contract;
use burn::config::Config;
use burn::prelude::{Backend, Tensor};
use burn::tensor::activation::softmax;

/// [`route`] Configuration.
#[derive(Config, Debug)]
pub struct RoutingConfig {
    /// The number of routing iterations.
    #[config(default = 3)]
    pub num_iterations: usize,
}

/// Coupling-coefficient summaries for one routing invocation.
///
/// One entry per iteration; kept as backend tensors so collection is cheap,
/// readable on demand via `into_scalar`.
#[derive(Debug, Clone)]
pub struct RoutingStats<B: Backend> {
    /// Mean coupling coefficient, per iteration.
    pub coupling_mean: Vec<Tensor<B, 1>>,

    /// Max coupling coefficient, per iteration.
    pub coupling_max: Vec<Tensor<B, 1>>,
}

impl<B: Backend> RoutingStats<B> {
    fn with_capacity(num_iterations: usize) -> Self {
        Self {
            coupling_mean: Vec::with_capacity(num_iterations),
            coupling_max: Vec::with_capacity(num_iterations),
        }
    }

    fn record(
        &mut self,
        coupling: &Tensor<B, 3>,
    ) {
        self.coupling_mean.push(coupling.clone().mean());
        self.coupling_max.push(coupling.clone().max());
    }

    /// The number of recorded iterations.
    pub fn num_iterations(&self) -> usize {
        self.coupling_mean.len()
    }
}

/// Route prediction vectors to output capsules.
///
/// # Arguments
///
/// - `predictions`: ``[batch, num_out_caps, num_in_caps, out_dim]``.
/// - `num_iterations`: the number of routing iterations.
///
/// # Returns
///
/// Squashed output capsules, ``[batch, num_out_caps, out_dim]``.
pub fn route<B: Backend>(
    predictions: Tensor<B, 4>,
    num_iterations: usize,
) -> Tensor<B, 3> {
    route_with_stats(predictions, num_iterations).0
}

/// Route prediction vectors to output capsules, recording coupling stats.
///
/// # Arguments
///
/// - `predictions`: ``[batch, num_out_caps, num_in_caps, out_dim]``.
/// - `num_iterations`: the number of routing iterations.
///
/// # Returns
///
/// ``([batch, num_out_caps, out_dim], RoutingStats)``
pub fn route_with_stats<B: Backend>(
    predictions: Tensor<B, 4>,
    num_iterations: usize,
) -> (Tensor<B, 3>, RoutingStats<B>) {
    assert!(
        num_iterations > 0,
        "Routing requires at least one iteration"
    );

    let [batch, num_out, num_in, _out_dim] = unpack_shape_contract!(
        ["batch", "num_out_caps", "num_in_caps", "out_dim"],
        &predictions,
        &["batch", "num_out_caps", "num_in_caps", "out_dim"],
        &[],
    );

    let device = predictions.device();
    let mut stats = RoutingStats::with_capacity(num_iterations);

    // Routing logits b_ij.
    let mut logits: Tensor<B, 3> = Tensor::zeros([batch, num_out, num_in], &device);

    // One routing step: coupling -> weighted sum -> squash.
    // `routed` is [batch, num_out, 1, out_dim].
    let step = |logits: &Tensor<B, 3>, stats: &mut RoutingStats<B>| {
        // Coupling coefficients; softmax over the output-capsule axis.
        let coupling = softmax(logits.clone(), 1);
        stats.record(&coupling);

        // s_j = sum_i c_ij * u_hat_ij
        let weighted = predictions.clone() * coupling.unsqueeze_dim::<4>(3);

        // v_j = squash(s_j)
        squash(weighted.sum_dim(2), 3)
    };

    let mut routed = step(&logits, &mut stats);

    for _ in 1..num_iterations {
        // b_ij += <u_hat_ij, v_j>
        let agreement = (predictions.clone() * routed)
            .sum_dim(3)
            .squeeze_dims::<3>(&[3]);
        logits = logits + agreement;

        routed = step(&logits, &mut stats);
    }

    (routed.squeeze_dims::<3>(&[2]), stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::NdArray;
    use burn::tensor::ElementConversion;

    type B = NdArray<f32>;

    #[test]
    fn test_route_shapes() {
        let device = Default::default();

        let predictions: Tensor<B, 4> = Tensor::ones([2, 10, 36, 16], &device);
        let output = route(predictions, 3);

        assert_shape_contract!(
            ["batch", "num_out_caps", "out_dim"],
            &output,
            &[("batch", 2), ("num_out_caps", 10), ("out_dim", 16)],
        );
    }

    #[test]
    fn test_single_iteration_is_uniform_coupling() {
        let device = Default::default();

        let predictions: Tensor<B, 4> =
            Tensor::random([2, 4, 8, 6], burn::tensor::Distribution::Default, &device);

        let output = route(predictions.clone(), 1);

        // With zero logits, coupling is uniform (1 / num_out) over outputs.
        let expected = squash(predictions.sum_dim(2) / 4.0, 3).squeeze_dims::<3>(&[2]);

        output.to_data().assert_approx_eq::<f32>(
            &expected.to_data(),
            burn::tensor::Tolerance::default(),
        );
    }

    #[test]
    fn test_output_lengths_bounded() {
        let device = Default::default();

        let predictions: Tensor<B, 4> =
            Tensor::random([3, 5, 12, 8], burn::tensor::Distribution::Default, &device) * 10.0;

        let output = route(predictions, 3);

        let lengths = output.powf_scalar(2.0).sum_dim(2).sqrt();
        let max_length: f32 = lengths.max().into_scalar().elem();
        assert!(max_length < 1.0);
    }

    #[test]
    fn test_stats_recorded_per_iteration() {
        let device = Default::default();

        let predictions: Tensor<B, 4> = Tensor::ones([1, 4, 6, 2], &device);
        let (_, stats) = route_with_stats(predictions, 3);

        assert_eq!(stats.num_iterations(), 3);

        // First iteration coupling is the uniform 1 / num_out.
        let mean: f32 = stats.coupling_mean[0].clone().into_scalar().elem();
        assert!((mean - 0.25).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "at least one iteration")]
    fn test_zero_iterations_panics() {
        let device = Default::default();
        let predictions: Tensor<B, 4> = Tensor::ones([1, 2, 3, 4], &device);
        route(predictions, 0);
    }
}
