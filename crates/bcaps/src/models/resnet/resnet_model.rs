//! # CIFAR-style `ResNet` Core Model
//!
//! The ``6n + 2`` family: depth 20 is three stages of three
//! [`BasicBlock`]s; depths of 44 and above switch to
//! [`BottleneckBlock`]s.
//!
//! [`CifarResNet::forward_features`] exposes the trunk through stage 3,
//! which the capsule variants consume as their backbone.
//!
//! [`BasicBlock`]: crate::models::resnet::basic_block::BasicBlock
//! [`BottleneckBlock`]: crate::models::resnet::bottleneck_block::BottleneckBlock

use crate::compat::activation_wrapper::ActivationConfig;
use crate::compat::normalization_wrapper::NormalizationConfig;
use crate::layers::blocks::cna::{AbstractCna2dConfig, Cna2d, Cna2dMeta};
use crate::models::resnet::layer_block::{LayerBlock, LayerBlockConfig, LayerBlockMeta};
use crate::models::resnet::util::{
    CLASSIFIER_INITIALIZER, CONV_INTO_RELU_INITIALIZER, scalar_to_array,
};
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::module::Module;
use burn::nn::conv::Conv2dConfig;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::{BatchNormConfig, Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::{Backend, Config, Tensor};

/// The stem width; stage planes are 1x / 2x / 4x this.
pub const STEM_PLANES: usize = 16;

/// The depth at which the family switches to bottleneck blocks.
pub const BOTTLENECK_DEPTH_THRESHOLD: usize = 44;

/// [`CifarResNet`] Meta API.
pub trait CifarResNetMeta {
    /// The network depth; must be ``6n + 2``.
    fn depth(&self) -> usize;

    /// The size of the in channels dimension.
    fn in_channels(&self) -> usize;

    /// The number of classifier classes.
    fn num_classes(&self) -> usize;

    /// The stride of the stem convolution.
    fn stem_stride(&self) -> usize;

    /// Whether this depth uses bottleneck blocks.
    fn bottleneck(&self) -> bool {
        self.depth() >= BOTTLENECK_DEPTH_THRESHOLD
    }

    /// The block channel expansion factor.
    fn expansion(&self) -> usize {
        if self.bottleneck() { 4 } else { 1 }
    }

    /// Residual blocks per stage.
    ///
    /// ``blocks_per_stage = (depth - 2) / 6``
    fn blocks_per_stage(&self) -> usize {
        (self.depth() - 2) / 6
    }

    /// The channel count of the stage-3 feature map.
    ///
    /// ``feature_planes = 4 * STEM_PLANES * expansion``
    fn feature_planes(&self) -> usize {
        4 * STEM_PLANES * self.expansion()
    }

    /// The total spatial reduction of the trunk.
    ///
    /// ``feature_stride = 4 * stem_stride``
    fn feature_stride(&self) -> usize {
        4 * self.stem_stride()
    }
}

/// [`CifarResNet`] Config.
///
/// Implements [`CifarResNetMeta`].
#[derive(Config, Debug)]
pub struct CifarResNetConfig {
    /// The number of classifier classes.
    pub num_classes: usize,

    /// The network depth; must be ``6n + 2``.
    #[config(default = 20)]
    pub depth: usize,

    /// The size of the in channels dimension.
    #[config(default = 3)]
    pub in_channels: usize,

    /// The stride of the stem convolution.
    ///
    /// 1 for 32x32 inputs; 2 for 64x64 (tiny-imagenet style) inputs.
    #[config(default = 1)]
    pub stem_stride: usize,

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

impl CifarResNetMeta for CifarResNetConfig {
    fn depth(&self) -> usize {
        self.depth
    }

    fn in_channels(&self) -> usize {
        self.in_channels
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn stem_stride(&self) -> usize {
        self.stem_stride
    }
}

impl CifarResNetConfig {
    /// Check if the config is valid.
    ///
    /// # Returns
    ///
    /// A `Result<(), String>`
    pub fn try_validate(&self) -> Result<(), String> {
        if self.depth < 8 || (self.depth - 2) % 6 != 0 {
            return Err(format!("depth({}) should be 6n+2", self.depth));
        }
        if self.num_classes == 0 {
            return Err("num_classes must be non-zero".to_string());
        }
        Ok(())
    }

    /// Panic if `try_validate` returns an error.
    pub fn expect_valid(&self) {
        match self.try_validate() {
            Ok(_) => (),
            Err(err) => panic!("{}", err),
        }
    }

    /// Initialize a [`CifarResNetTrunk`]; the stem and the three stages,
    /// without the classifier head.
    pub fn init_trunk<B: Backend>(
        &self,
        device: &B::Device,
    ) -> CifarResNetTrunk<B> {
        self.expect_valid();

        let n = self.blocks_per_stage();
        let expansion = self.expansion();
        let bottleneck = self.bottleneck();

        let cna_builder = AbstractCna2dConfig {
            norm: self.normalization.clone(),
            act: self.activation.clone(),
        };

        let stem = cna_builder.build_config(
            Conv2dConfig::new([self.in_channels, STEM_PLANES], scalar_to_array(3))
                .with_stride(scalar_to_array(self.stem_stride))
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_initializer(CONV_INTO_RELU_INITIALIZER)
                .with_bias(false),
        );

        let layer1 = LayerBlockConfig::build(
            n,
            STEM_PLANES,
            STEM_PLANES * expansion,
            1,
            bottleneck,
        );
        let layer2 = LayerBlockConfig::build(
            n,
            STEM_PLANES * expansion,
            2 * STEM_PLANES * expansion,
            2,
            bottleneck,
        );
        let layer3 = LayerBlockConfig::build(
            n,
            2 * STEM_PLANES * expansion,
            4 * STEM_PLANES * expansion,
            2,
            bottleneck,
        );

        CifarResNetTrunk {
            stem: stem.init(device),

            layer1: layer1.init(device),
            layer2: layer2.init(device),
            layer3: layer3.init(device),
        }
    }

    /// Initialize a [`CifarResNet`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> CifarResNet<B> {
        let trunk = self.init_trunk(device);

        // [batch, feature_planes, h, w] -> [batch, feature_planes, 1, 1]
        let avgpool = AdaptiveAvgPool2dConfig::new([1, 1]);

        let fc = LinearConfig::new(self.feature_planes(), self.num_classes)
            .with_initializer(CLASSIFIER_INITIALIZER);

        CifarResNet {
            depth: self.depth,
            trunk,

            avgpool: avgpool.init(),
            fc: fc.init(device),
        }
    }
}

/// The `ResNet` trunk; the stem and the three residual stages.
///
/// The capsule variants consume this as their backbone.
#[derive(Module, Debug)]
pub struct CifarResNetTrunk<B: Backend> {
    /// Stem conv/norm/act.
    pub stem: Cna2d<B>,

    /// First stage.
    pub layer1: LayerBlock<B>,
    /// Second stage; stride 2.
    pub layer2: LayerBlock<B>,
    /// Third stage; stride 2.
    pub layer3: LayerBlock<B>,
}

impl<B: Backend> CifarResNetTrunk<B> {
    /// The size of the in channels dimension.
    pub fn in_channels(&self) -> usize {
        self.stem.in_channels()
    }

    /// The channel count of the stage-3 feature map.
    pub fn feature_planes(&self) -> usize {
        self.layer3.out_planes()
    }

    /// The total spatial reduction of the trunk.
    pub fn feature_stride(&self) -> usize {
        4 * self.stem.stride()[0]
    }

    /// Trunk forward pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// A ``[batch, feature_planes, height / feature_stride, width / feature_stride]`` tensor.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        let [batch, out_height, out_width] = unpack_shape_contract!(
            [
                "batch",
                "in_channels",
                "in_height" = "out_height" * "stride",
                "in_width" = "out_width" * "stride"
            ],
            &input,
            &["batch", "out_height", "out_width"],
            &[
                ("in_channels", self.in_channels()),
                ("stride", self.feature_stride()),
            ],
        );

        let x = self.stem.forward(input);

        let x = self.layer1.forward(x);
        let x = self.layer2.forward(x);
        let x = self.layer3.forward(x);

        assert_shape_contract_periodically!(
            ["batch", "feature_planes", "out_height", "out_width"],
            &x,
            &[
                ("batch", batch),
                ("feature_planes", self.feature_planes()),
                ("out_height", out_height),
                ("out_width", out_width)
            ],
        );

        x
    }
}

/// CIFAR-style `ResNet` model.
///
/// Implements [`CifarResNetMeta`].
#[derive(Module, Debug)]
pub struct CifarResNet<B: Backend> {
    /// The network depth.
    pub depth: usize,

    /// The stem and the three residual stages.
    pub trunk: CifarResNetTrunk<B>,

    /// Average pooling head.
    pub avgpool: AdaptiveAvgPool2d,
    /// Classifier head.
    pub fc: Linear<B>,
}

impl<B: Backend> CifarResNetMeta for CifarResNet<B> {
    fn depth(&self) -> usize {
        self.depth
    }

    fn in_channels(&self) -> usize {
        self.trunk.in_channels()
    }

    fn num_classes(&self) -> usize {
        self.fc.weight.shape().dims[1]
    }

    fn stem_stride(&self) -> usize {
        self.trunk.stem.stride()[0]
    }
}

impl<B: Backend> CifarResNet<B> {
    /// Trunk forward pass; the stem and the three residual stages.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// A ``[batch, feature_planes, height / feature_stride, width / feature_stride]`` tensor.
    pub fn forward_features(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        self.trunk.forward(input)
    }

    /// `ResNet` forward pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// Classifier logits; ``[batch, num_classes]``.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 2> {
        let x = self.forward_features(input);

        let x = self.avgpool.forward(x);
        // Reshape [B, C, 1, 1] -> [B, C]
        let x = x.flatten(1, 3);

        self.fc.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::{Autodiff, NdArray};

    #[test]
    fn test_resnet_config() {
        let config = CifarResNetConfig::new(10);
        config.expect_valid();

        assert_eq!(config.depth(), 20);
        assert_eq!(config.num_classes(), 10);
        assert_eq!(config.in_channels(), 3);
        assert_eq!(config.stem_stride(), 1);
        assert!(!config.bottleneck());
        assert_eq!(config.expansion(), 1);
        assert_eq!(config.blocks_per_stage(), 3);
        assert_eq!(config.feature_planes(), 64);
        assert_eq!(config.feature_stride(), 4);

        let config = config.with_depth(44);
        assert!(config.bottleneck());
        assert_eq!(config.expansion(), 4);
        assert_eq!(config.blocks_per_stage(), 7);
        assert_eq!(config.feature_planes(), 256);
    }

    #[test]
    fn test_resnet_config_bad_depth() {
        assert!(CifarResNetConfig::new(10).with_depth(21).try_validate().is_err());
        assert!(CifarResNetConfig::new(10).with_depth(2).try_validate().is_err());
        assert!(CifarResNetConfig::new(10).with_depth(8).try_validate().is_ok());
    }

    #[test]
    #[should_panic(expected = "should be 6n+2")]
    fn test_resnet_config_bad_depth_panics() {
        CifarResNetConfig::new(10).with_depth(15).expect_valid();
    }

    #[test]
    fn test_resnet_forward() {
        type B = Autodiff<NdArray<f32>>;
        let device = Default::default();

        let model: CifarResNet<B> = CifarResNetConfig::new(10).with_depth(8).init(&device);

        assert_eq!(model.depth(), 8);
        assert_eq!(model.num_classes(), 10);
        assert_eq!(model.feature_planes(), 64);

        let input = Tensor::ones([2, 3, 32, 32], &device);

        let features = model.forward_features(input.clone());
        assert_shape_contract!(
            ["batch", "feature_planes", "height", "width"],
            &features,
            &[
                ("batch", 2),
                ("feature_planes", 64),
                ("height", 8),
                ("width", 8)
            ],
        );

        let output = model.forward(input);
        assert_shape_contract!(
            ["batch", "num_classes"],
            &output,
            &[("batch", 2), ("num_classes", 10)],
        );
    }

    #[test]
    fn test_resnet_bottleneck_forward() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: CifarResNet<B> = CifarResNetConfig::new(10).with_depth(44).init(&device);

        assert!(model.bottleneck());
        assert_eq!(model.feature_planes(), 256);

        let input = Tensor::ones([1, 3, 16, 16], &device);
        let output = model.forward(input);

        assert_shape_contract!(
            ["batch", "num_classes"],
            &output,
            &[("batch", 1), ("num_classes", 10)],
        );
    }

    #[test]
    fn test_resnet_stem_stride_two() {
        type B = NdArray<f32>;
        let device = Default::default();

        let model: CifarResNet<B> = CifarResNetConfig::new(200)
            .with_depth(8)
            .with_stem_stride(2)
            .init(&device);

        assert_eq!(model.feature_stride(), 8);

        let input = Tensor::ones([1, 3, 64, 64], &device);
        let features = model.forward_features(input.clone());
        assert_shape_contract!(
            ["batch", "feature_planes", "height", "width"],
            &features,
            &[
                ("batch", 1),
                ("feature_planes", 64),
                ("height", 8),
                ("width", 8)
            ],
        );

        let output = model.forward(input);
        assert_shape_contract!(
            ["batch", "num_classes"],
            &output,
            &[("batch", 1), ("num_classes", 200)],
        );
    }
}
