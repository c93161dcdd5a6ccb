//! # 2d Channel Dropout
//!
//! [`ChannelDrop2d`] zeroes whole feature channels during training, and
//! rescales the survivors by ``1 / (1 - prob)``.
//!
//! [`ChannelDrop2dConfig`] implements [`Config`], and provides
//! [`ChannelDrop2dConfig::init`] to initialize a [`ChannelDrop2d`].

use crate::utility::probability::expect_probability;
use burn::config::Config;
use burn::module::Module;
use burn::prelude::{Backend, Tensor};
use burn::tensor::Distribution;

/// [`ChannelDrop2d`] Config.
#[derive(Config, Debug)]
pub struct ChannelDrop2dConfig {
    /// The probability of dropping a channel.
    #[config(default = 0.1)]
    pub prob: f64,
}

impl ChannelDrop2dConfig {
    /// Initialize a [`ChannelDrop2d`].
    pub fn init(&self) -> ChannelDrop2d {
        ChannelDrop2d {
            prob: expect_probability(self.prob),
        }
    }
}

/// 2d channel dropout layer.
///
/// The layer is the identity when gradients are disabled (eval mode),
/// or when `prob` is zero.
#[derive(Module, Clone, Debug)]
pub struct ChannelDrop2d {
    /// The probability of dropping a channel.
    pub prob: f64,
}

impl ChannelDrop2d {
    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, channels, height, width]``.
    ///
    /// # Returns
    ///
    /// A ``[batch, channels, height, width]`` tensor, with entire channels
    /// zeroed with probability `prob` during training.
    pub fn forward<B: Backend>(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        if !B::ad_enabled() || self.prob == 0.0 {
            return input;
        }

        let [batch, channels, _height, _width] = input.dims();
        let keep_prob = 1.0 - self.prob;

        let mask = Tensor::<B, 4>::random(
            [batch, channels, 1, 1],
            Distribution::Bernoulli(keep_prob),
            &input.device(),
        );

        input * mask * (1.0 / keep_prob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    #[test]
    fn test_channel_drop_config() {
        let config = ChannelDrop2dConfig::new();
        assert_eq!(config.prob, 0.1);

        let config = config.with_prob(0.25);
        assert_eq!(config.init().prob, 0.25);
    }

    #[test]
    #[should_panic(expected = "Probability")]
    fn test_channel_drop_config_bad_prob() {
        ChannelDrop2dConfig::new().with_prob(1.5).init();
    }

    #[test]
    fn test_identity_without_autodiff() {
        type B = NdArray<f32>;
        let device = Default::default();

        let layer = ChannelDrop2dConfig::new().with_prob(0.5).init();

        let input: Tensor<B, 4> = Tensor::ones([2, 4, 3, 3], &device);
        let output = layer.forward(input.clone());

        output.to_data().assert_eq(&input.to_data(), true);
    }

    #[test]
    fn test_training_drops_whole_channels() {
        type B = Autodiff<NdArray<f32>>;
        let device = Default::default();

        let layer = ChannelDrop2dConfig::new().with_prob(0.5).init();

        let input: Tensor<B, 4> = Tensor::ones([4, 8, 2, 2], &device);
        let output = layer.forward(input);

        // Every channel is either all-zero or uniformly rescaled.
        let data = output.to_data();
        let values = data.as_slice::<f32>().unwrap();
        for channel in values.chunks(4) {
            let first = channel[0];
            assert!(first == 0.0 || (first - 2.0).abs() < 1e-6);
            for &v in channel {
                assert_eq!(v, first);
            }
        }
    }
}
