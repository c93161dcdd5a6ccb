//! # [`BottleneckBlock`] Block for `ResNet`
//!
//! [`BottleneckBlock`] is the bottleneck form of the core `ResNet`
//! convolution unit: a 1x1 pinch, a 3x3 conv, and a 1x1 expansion,
//! with an identity connection added before the final activation.
//!
//! [`BottleneckBlockMeta`] defines a common meta-API for [`BottleneckBlock`]
//! and [`BottleneckBlockConfig`].
//!
//! [`BottleneckBlockConfig`] implements [`Config`] and provides
//! [`BottleneckBlockConfig::init`] to initialize a [`BottleneckBlock`].

use crate::compat::activation_wrapper::ActivationConfig;
use crate::compat::normalization_wrapper::NormalizationConfig;
use crate::layers::blocks::cna::{AbstractCna2dConfig, Cna2d, Cna2dConfig, Cna2dMeta};
use crate::models::resnet::downsample::{Downsample, DownsampleConfig};
use crate::models::resnet::util::{
    CONV_INTO_RELU_INITIALIZER, scalar_to_array, stride_div_output_resolution,
};
use burn::nn::conv::Conv2dConfig;
use burn::nn::{BatchNormConfig, PaddingConfig2d};
use burn::prelude::{Backend, Config, Module, Tensor};

/// Default pinch factor for [`BottleneckBlock`].
pub const BOTTLENECK_BLOCK_DEFAULT_PINCH_FACTOR: usize = 4;

/// [`BottleneckBlock`] Meta trait.
pub trait BottleneckBlockMeta {
    /// The number of input feature planes.
    fn in_planes(&self) -> usize;

    /// The number of output feature planes.
    fn out_planes(&self) -> usize;

    /// The bottleneck pinch factor.
    fn pinch_factor(&self) -> usize;

    /// The internal pinch planes.
    ///
    /// ``pinch_planes = out_planes / pinch_factor``
    fn pinch_planes(&self) -> usize {
        self.out_planes() / self.pinch_factor()
    }

    /// The stride of convolution.
    ///
    /// Affects downsample behavior.
    fn stride(&self) -> usize;

    /// Get the output resolution for a given input resolution.
    ///
    /// The input must be a multiple of the stride.
    ///
    /// # Arguments
    ///
    /// - `input_resolution`: ``[in_height=out_height*stride, in_width=out_width*stride]``.
    ///
    /// # Returns
    ///
    /// ``[out_height, out_width]``
    ///
    /// # Panics
    ///
    /// If the input resolution is not a multiple of the stride.
    fn output_resolution(
        &self,
        input_resolution: [usize; 2],
    ) -> [usize; 2] {
        stride_div_output_resolution(input_resolution, self.stride())
    }
}

/// [`BottleneckBlock`] Config.
///
/// Implements [`BottleneckBlockMeta`].
#[derive(Config, Debug)]
pub struct BottleneckBlockConfig {
    /// The size of the in channels dimension.
    pub in_planes: usize,

    /// The size of the out channels dimension.
    pub out_planes: usize,

    /// The bottleneck pinch factor.
    #[config(default = "BOTTLENECK_BLOCK_DEFAULT_PINCH_FACTOR")]
    pub pinch_factor: usize,

    /// The stride of the 3x3 conv and the downsample layer.
    #[config(default = 1)]
    pub stride: usize,

    /// [`crate::compat::normalization_wrapper::Normalization`] config.
    ///
    /// The feature size of this config will be replaced
    /// with the appropriate feature size for each layer.
    #[config(default = "NormalizationConfig::Batch(BatchNormConfig::new(0))")]
    pub normalization: NormalizationConfig,

    /// [`crate::compat::activation_wrapper::Activation`] config.
    #[config(default = "ActivationConfig::Relu")]
    pub activation: ActivationConfig,
}

impl BottleneckBlockMeta for BottleneckBlockConfig {
    fn in_planes(&self) -> usize {
        self.in_planes
    }

    fn out_planes(&self) -> usize {
        self.out_planes
    }

    fn pinch_factor(&self) -> usize {
        self.pinch_factor
    }

    fn stride(&self) -> usize {
        self.stride
    }
}

impl BottleneckBlockConfig {
    /// Initialize a [`BottleneckBlock`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> BottleneckBlock<B> {
        let in_planes = self.in_planes();
        let pinch_planes = self.pinch_planes();
        let out_planes = self.out_planes();
        let stride = self.stride();

        let downsample: Option<DownsampleConfig> = if stride != 1 || in_planes != out_planes {
            DownsampleConfig::new(in_planes, out_planes)
                .with_stride(stride)
                .with_norm(self.normalization.clone())
                .into()
        } else {
            None
        };

        let cna_builder = AbstractCna2dConfig {
            norm: self.normalization.clone(),
            act: self.activation.clone(),
        };

        let cna1: Cna2dConfig = cna_builder.build_config(
            Conv2dConfig::new([in_planes, pinch_planes], scalar_to_array(1))
                .with_initializer(CONV_INTO_RELU_INITIALIZER)
                .with_bias(false),
        );

        let cna2: Cna2dConfig = cna_builder.build_config(
            Conv2dConfig::new([pinch_planes, pinch_planes], scalar_to_array(3))
                .with_stride(scalar_to_array(stride))
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_initializer(CONV_INTO_RELU_INITIALIZER)
                .with_bias(false),
        );

        let cna3: Cna2dConfig = cna_builder.build_config(
            Conv2dConfig::new([pinch_planes, out_planes], scalar_to_array(1))
                .with_initializer(CONV_INTO_RELU_INITIALIZER)
                .with_bias(false),
        );

        BottleneckBlock {
            pinch_factor: self.pinch_factor,

            downsample: downsample.as_ref().map(|cfg| cfg.init(device)),

            cna1: cna1.init(device),
            cna2: cna2.init(device),
            cna3: cna3.init(device),
        }
    }
}

/// Bottleneck Block for `ResNet`.
///
/// Implements [`BottleneckBlockMeta`].
#[derive(Module, Debug)]
pub struct BottleneckBlock<B: Backend> {
    /// Pinch factor.
    pub pinch_factor: usize,

    /// Optional `Downsample` layer; for the residual connection.
    pub downsample: Option<Downsample<B>>,

    /// First conv/norm/act layer.
    pub cna1: Cna2d<B>,
    /// Second conv/norm/act layer.
    pub cna2: Cna2d<B>,
    /// Third conv/norm/act layer.
    pub cna3: Cna2d<B>,
}

impl<B: Backend> BottleneckBlockMeta for BottleneckBlock<B> {
    fn in_planes(&self) -> usize {
        self.cna1.in_channels()
    }

    fn out_planes(&self) -> usize {
        self.cna3.out_channels()
    }

    fn pinch_factor(&self) -> usize {
        self.pinch_factor
    }

    fn stride(&self) -> usize {
        self.cna2.stride()[0]
    }
}

impl<B: Backend> BottleneckBlock<B> {
    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_planes, in_height=out_height*stride, in_width=out_width*stride]``.
    ///
    /// # Returns
    ///
    /// A ``[batch, out_planes, out_height, out_width]`` tensor.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(downsample) => downsample.forward(input.clone()),
            None => input.clone(),
        };

        let x = self.cna1.forward(input);
        let x = self.cna2.forward(x);

        self.cna3.hook_forward(x, |x| x + identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::{Autodiff, NdArray};

    #[test]
    fn test_bottleneck_block_config() {
        let in_planes = 16;
        let out_planes = 32;
        let config = BottleneckBlockConfig::new(in_planes, out_planes);
        assert_eq!(config.in_planes(), in_planes);
        assert_eq!(config.out_planes(), out_planes);
        assert_eq!(config.pinch_factor(), 4);
        assert_eq!(config.pinch_planes(), 8);
        assert_eq!(config.stride(), 1);
        assert_eq!(config.output_resolution([16, 16]), [16, 16]);
        assert!(matches!(config.activation, ActivationConfig::Relu));

        let config = config
            .with_stride(2)
            .with_activation(ActivationConfig::Sigmoid);
        assert_eq!(config.stride(), 2);
        assert_eq!(config.output_resolution([16, 16]), [8, 8]);
        assert!(matches!(config.activation, ActivationConfig::Sigmoid));
    }

    #[test]
    #[should_panic(expected = "7 !~ in_height=(out_height*stride)")]
    fn test_bottleneck_block_config_panic() {
        let config = BottleneckBlockConfig::new(16, 32).with_stride(2);
        assert_eq!(config.stride(), 2);
        config.output_resolution([7, 7]);
    }

    #[test]
    fn test_bottleneck_block_meta() {
        type B = NdArray<f32>;
        let device = Default::default();

        let in_planes = 8;
        let out_planes = 8;

        let block: BottleneckBlock<B> =
            BottleneckBlockConfig::new(in_planes, out_planes).init(&device);

        assert!(block.downsample.is_none());
        assert_eq!(block.in_planes(), in_planes);
        assert_eq!(block.out_planes(), out_planes);
        assert_eq!(block.pinch_planes(), 2);
        assert_eq!(block.stride(), 1);
        assert_eq!(block.output_resolution([16, 16]), [16, 16]);
    }

    #[test]
    fn test_bottleneck_block_forward_autodiff() {
        type B = Autodiff<NdArray<f32>>;
        let device = Default::default();

        let batch_size = 2;
        let in_planes = 4;
        let out_planes = 8;
        let in_height = 8;
        let in_width = 8;

        let block: BottleneckBlock<B> = BottleneckBlockConfig::new(in_planes, out_planes)
            .with_stride(2)
            .init(&device);

        let [out_height, out_width] = block.output_resolution([in_height, in_width]);
        assert_eq!(out_height, 4);
        assert_eq!(out_width, 4);

        let input = Tensor::ones([batch_size, in_planes, in_height, in_width], &device);
        let output = block.forward(input);

        assert_shape_contract!(
            ["batch", "out_channels", "out_height", "out_width"],
            &output,
            &[
                ("batch", batch_size),
                ("out_channels", out_planes),
                ("out_height", out_height),
                ("out_width", out_width)
            ],
        );
    }
}
