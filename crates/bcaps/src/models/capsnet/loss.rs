//! # Capsule Margin Loss
//!
//! The class-capsule loss of Sabour et al. (2017):
//!
//! ```text
//! L_k = T_k * max(0, m+ - |v_k|)^2
//!     + lambda * (1 - T_k) * max(0, |v_k| - m-)^2
//! ```
//!
//! summed over classes and averaged over the batch.

use burn::config::Config;
use burn::module::Module;
use burn::prelude::{Backend, Int, Tensor};

/// [`MarginLoss`] Config.
#[derive(Config, Debug)]
pub struct MarginLossConfig {
    /// The present-class margin (m+).
    #[config(default = 0.9)]
    pub positive_margin: f64,

    /// The absent-class margin (m-).
    #[config(default = 0.1)]
    pub negative_margin: f64,

    /// Down-weighting of absent-class losses (lambda).
    #[config(default = 0.5)]
    pub down_weighting: f64,
}

impl MarginLossConfig {
    /// Initialize a [`MarginLoss`].
    pub fn init(&self) -> MarginLoss {
        MarginLoss {
            positive_margin: self.positive_margin,
            negative_margin: self.negative_margin,
            down_weighting: self.down_weighting,
        }
    }
}

/// Margin loss over class-capsule lengths.
#[derive(Module, Clone, Debug)]
pub struct MarginLoss {
    /// The present-class margin (m+).
    pub positive_margin: f64,

    /// The absent-class margin (m-).
    pub negative_margin: f64,

    /// Down-weighting of absent-class losses (lambda).
    pub down_weighting: f64,
}

impl MarginLoss {
    /// Compute the margin loss.
    ///
    /// # Arguments
    ///
    /// - `lengths`: class-capsule lengths, ``[batch, num_classes]``.
    /// - `targets`: class indices, ``[batch]``.
    ///
    /// # Returns
    ///
    /// The mean loss, as a ``[1]`` tensor.
    pub fn forward<B: Backend>(
        &self,
        lengths: Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        let [batch, num_classes] = lengths.dims();
        let device = lengths.device();

        let one_hot: Tensor<B, 2> = Tensor::zeros([batch, num_classes], &device).scatter(
            1,
            targets.reshape([batch, 1]),
            Tensor::ones([batch, 1], &device),
        );

        let positive = (-lengths.clone() + self.positive_margin)
            .clamp_min(0.0)
            .powf_scalar(2.0);
        let negative = (lengths - self.negative_margin)
            .clamp_min(0.0)
            .powf_scalar(2.0);

        let per_class = one_hot.clone() * positive
            + (-one_hot + 1.0) * negative * self.down_weighting;

        per_class.sum_dim(1).mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::ElementConversion;

    type B = NdArray<f32>;

    #[test]
    fn test_margin_loss_config() {
        let config = MarginLossConfig::new();
        assert_eq!(config.positive_margin, 0.9);
        assert_eq!(config.negative_margin, 0.1);
        assert_eq!(config.down_weighting, 0.5);
    }

    #[test]
    fn test_confident_correct_prediction_has_zero_loss() {
        let device = Default::default();
        let loss_fn = MarginLossConfig::new().init();

        // Target class at length >= m+, others at <= m-.
        let lengths: Tensor<B, 2> = Tensor::from_data([[0.95, 0.05, 0.02]], &device);
        let targets: Tensor<B, 1, Int> = Tensor::from_data([0], &device);

        let loss: f32 = loss_fn.forward(lengths, targets).into_scalar().elem();
        assert!(loss < 1e-6, "loss {loss}");
    }

    #[test]
    fn test_wrong_prediction_has_larger_loss() {
        let device = Default::default();
        let loss_fn = MarginLossConfig::new().init();

        let confident: Tensor<B, 2> = Tensor::from_data([[0.9, 0.1]], &device);
        let wrong: Tensor<B, 2> = Tensor::from_data([[0.1, 0.9]], &device);
        let targets: Tensor<B, 1, Int> = Tensor::from_data([0], &device);

        let low: f32 = loss_fn
            .forward(confident, targets.clone())
            .into_scalar()
            .elem();
        let high: f32 = loss_fn.forward(wrong, targets).into_scalar().elem();

        assert!(high > low);
        // m+ term: (0.9 - 0.1)^2; lambda term: 0.5 * (0.9 - 0.1)^2.
        assert!((high - (0.64 + 0.32)).abs() < 1e-5);
    }

    #[test]
    fn test_batch_mean() {
        let device = Default::default();
        let loss_fn = MarginLossConfig::new().init();

        let lengths: Tensor<B, 2> =
            Tensor::from_data([[0.5, 0.5], [0.5, 0.5]], &device);
        let targets: Tensor<B, 1, Int> = Tensor::from_data([0, 1], &device);

        let both: f32 = loss_fn
            .forward(lengths.clone(), targets.clone())
            .into_scalar()
            .elem();

        let single: f32 = loss_fn
            .forward(
                lengths.slice([0..1, 0..2]),
                targets.slice([0..1]),
            )
            .into_scalar()
            .elem();

        // Symmetric rows; the batch mean equals the single-row loss.
        assert!((both - single).abs() < 1e-6);
    }
}
