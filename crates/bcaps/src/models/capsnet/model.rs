//! # Capsule Network Model
//!
//! [`CapsNet`] builds one of the [`Variant`] architectures at init time and
//! dispatches each batch through that variant's data flow:
//!
//! * `v_base` - the [`CifarResNet`] baseline; scores are logits.
//! * `v0` - two conv stages into a fully-connected [`CapLayer`] head;
//!   scores are class-capsule lengths.
//! * `v1` .. `v5_2` - the residual trunk, a buffer conv, a channel squash,
//!   then `cap_n` passes of the iterated capsule body (chained, residual,
//!   or fan-out, per [`BodyPlan`]) and a class-head [`ConvCapLayer`].

use crate::compat::activation_wrapper::ActivationConfig;
use crate::compat::normalization_wrapper::NormalizationConfig;
use crate::layers::blocks::cna::{AbstractCna2dConfig, Cna2d};
use crate::layers::caps::cap_layer::{CapLayer, CapLayerConfig, CapLayerMeta};
use crate::layers::caps::conv_cap_layer::{
    ConvCapLayer, ConvCapLayerConfig, ConvCapLayerMeta,
};
use crate::layers::caps::routing::{RoutingConfig, RoutingStats};
use crate::layers::caps::squash::squash_channels;
use crate::layers::drop::channel_drop::{ChannelDrop2d, ChannelDrop2dConfig};
use crate::models::capsnet::variant::{BodyPlan, Variant};
use crate::models::resnet::resnet_model::{
    CifarResNet, CifarResNetConfig, CifarResNetMeta, CifarResNetTrunk,
};
use crate::models::resnet::util::CONV_INTO_RELU_INITIALIZER;
use bimm_contracts::assert_shape_contract_periodically;
use burn::module::Ignored;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{BatchNormConfig, InstanceNormConfig, PaddingConfig2d};
use burn::prelude::{Backend, Config, Module, Tensor};
use burn::tensor::activation::relu;

/// The capsule dimension of the primary-capsule (`v0`) grid.
pub const PRIMARY_CAP_DIM: usize = 8;

/// The capsule dimension of the `v0` class capsules.
pub const CLASS_CAP_DIM: usize = 16;

/// The capsule dimension of the convolutional-capsule pipelines.
pub const CONV_CAP_DIM: usize = 8;

/// The pipeline width of the `v1` chain.
pub const NARROW_PIPELINE_CHANNELS: usize = 64;

/// [`CapsNet`] Meta API.
pub trait CapsNetMeta {
    /// The architecture variant.
    fn variant(&self) -> Variant;

    /// The number of classifier classes.
    fn num_classes(&self) -> usize;
}

/// [`CapsNet`] Config.
///
/// Implements [`CapsNetMeta`].
#[derive(Config, Debug)]
pub struct CapsNetConfig {
    /// The architecture variant.
    pub variant: Variant,

    /// The number of classifier classes.
    pub num_classes: usize,

    /// The size of the in channels dimension.
    ///
    /// 3 for CIFAR-style inputs; 1 for fashion-mnist.
    #[config(default = 3)]
    pub in_channels: usize,

    /// The residual depth; must be ``6n + 2``.
    ///
    /// Used by the baseline and by the capsule-pipeline trunk.
    #[config(default = 20)]
    pub depth: usize,

    /// The stride of the trunk stem convolution.
    ///
    /// 1 for 32x32 inputs; 2 for 64x64 (tiny-imagenet style) inputs.
    #[config(default = 1)]
    pub stem_stride: usize,

    /// The number of iterated capsule-body passes.
    #[config(default = 3)]
    pub cap_n: usize,

    /// The number of primary-capsule channel groups (`v0`).
    #[config(default = 32)]
    pub primary_cap_num: usize,

    /// The `v0` stem width.
    #[config(default = 256)]
    pub pre_conv_channels: usize,

    /// Spatial side of the `v0` primary-capsule grid.
    ///
    /// The 9x9/2 and 3x3/2 convs reduce a 32x32 input to 6x6.
    #[config(default = 6)]
    pub primary_grid: usize,

    /// Use instance norm instead of batch norm in the `v0` stem.
    #[config(default = false)]
    pub use_instance_norm: bool,

    /// The pipeline width of the `v2`-and-later chains.
    #[config(default = 128)]
    pub cap_dim: usize,

    /// Channel-dropout probability for the `v4_*` placements.
    #[config(default = 0.1)]
    pub dropout_prob: f64,

    /// The routing configuration.
    #[config(default = "RoutingConfig::new()")]
    pub routing: RoutingConfig,
}

impl CapsNetMeta for CapsNetConfig {
    fn variant(&self) -> Variant {
        self.variant
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

impl CapsNetConfig {
    /// Set the architecture variant.
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// The channel width of the iterated capsule pipeline.
    pub fn pipeline_channels(&self) -> usize {
        if self.variant.wide_caps() {
            self.cap_dim
        } else {
            NARROW_PIPELINE_CHANNELS
        }
    }

    /// The residual-network config shared by the baseline and the trunk.
    fn resnet_config(&self) -> CifarResNetConfig {
        CifarResNetConfig::new(self.num_classes)
            .with_depth(self.depth)
            .with_in_channels(self.in_channels)
            .with_stem_stride(self.stem_stride)
    }

    /// Check if the config is valid.
    ///
    /// # Returns
    ///
    /// A `Result<(), String>`
    pub fn try_validate(&self) -> Result<(), String> {
        if self.num_classes == 0 {
            return Err("num_classes must be non-zero".to_string());
        }

        if self.variant.is_primary_caps() {
            if self.primary_cap_num == 0 || self.primary_grid == 0 {
                return Err("v0 requires a non-empty primary-capsule grid".to_string());
            }
        } else {
            self.resnet_config().try_validate()?;
        }

        if self.variant.uses_trunk() {
            if self.cap_n == 0 {
                return Err("capsule pipelines require cap_n >= 1".to_string());
            }
            if self.pipeline_channels() % CONV_CAP_DIM != 0 {
                return Err(format!(
                    "pipeline channels({}) must be divisible by the capsule dim({})",
                    self.pipeline_channels(),
                    CONV_CAP_DIM,
                ));
            }
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

    /// Initialize a [`CapsNet`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> CapsNet<B> {
        self.expect_valid();

        let arch = match self.variant {
            Variant::VBase => CapsArch::Baseline(self.resnet_config().init(device)),
            Variant::V0 => CapsArch::PrimaryCaps(self.init_primary_caps(device)),
            _ => CapsArch::ConvCaps(self.init_conv_caps(device)),
        };

        CapsNet { arch }
    }

    fn init_primary_caps<B: Backend>(
        &self,
        device: &B::Device,
    ) -> PrimaryCapsNet<B> {
        let norm = if self.use_instance_norm {
            NormalizationConfig::Instance(InstanceNormConfig::new(0))
        } else {
            NormalizationConfig::Batch(BatchNormConfig::new(0))
        };
        let cna_builder = AbstractCna2dConfig {
            norm,
            act: ActivationConfig::Relu,
        };

        // 9x9/2: 32x32 -> 13x13.
        let pre1 = cna_builder.build_config(
            Conv2dConfig::new(
                [self.in_channels, self.pre_conv_channels],
                [9, 9],
            )
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_initializer(CONV_INTO_RELU_INITIALIZER),
        );

        // 3x3/2: 13x13 -> 6x6 capsule grid.
        let pre2 = cna_builder.build_config(
            Conv2dConfig::new(
                [
                    self.pre_conv_channels,
                    self.primary_cap_num * PRIMARY_CAP_DIM,
                ],
                [3, 3],
            )
            .with_stride([2, 2])
            .with_initializer(CONV_INTO_RELU_INITIALIZER),
        );

        let class_caps = CapLayerConfig::new(
            self.primary_cap_num * self.primary_grid * self.primary_grid,
            self.num_classes,
        )
        .with_num_shared(self.primary_cap_num)
        .with_in_dim(PRIMARY_CAP_DIM)
        .with_out_dim(CLASS_CAP_DIM)
        .with_routing(self.routing.clone());

        PrimaryCapsNet {
            pre1: pre1.init(device),
            pre2: pre2.init(device),
            class_caps: class_caps.init(device),
        }
    }

    fn init_conv_caps<B: Backend>(
        &self,
        device: &B::Device,
    ) -> ConvCapsNet<B> {
        let resnet_config = self.resnet_config();
        let trunk = resnet_config.init_trunk(device);

        let width = self.pipeline_channels();
        let wide = self.variant.wide_caps();

        let buffer = Conv2dConfig::new([resnet_config.feature_planes(), width], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_initializer(CONV_INTO_RELU_INITIALIZER)
            .init(device);

        let body_caps = ConvCapLayerConfig::new(width, width)
            .with_in_dim(CONV_CAP_DIM)
            .with_out_dim(CONV_CAP_DIM)
            .with_shared_size(if wide { 4 } else { 1 })
            .with_shared_group(if self.variant.shared_group_body() { 2 } else { 1 })
            .with_routing(self.routing.clone())
            .init(device);

        let alt_body_caps = if self.variant.uses_alt_body() {
            Some(
                ConvCapLayerConfig::new(width, width)
                    .with_in_dim(CONV_CAP_DIM)
                    .with_out_dim(CONV_CAP_DIM)
                    .with_shared_size(4)
                    .with_shared_group(2)
                    .with_routing(self.routing.clone())
                    .init(device),
            )
        } else {
            None
        };

        let head_caps = ConvCapLayerConfig::new(width, width)
            .with_in_dim(CONV_CAP_DIM)
            .with_out_dim(CONV_CAP_DIM)
            .with_shared_size(if wide { 2 } else { 1 })
            .with_final_classes(Some(self.num_classes))
            .with_routing(self.routing.clone())
            .init(device);

        let dropout = if self.variant.uses_dropout() {
            Some(
                ChannelDrop2dConfig::new()
                    .with_prob(self.dropout_prob)
                    .init(),
            )
        } else {
            None
        };

        ConvCapsNet {
            variant: Ignored(self.variant),
            cap_n: self.cap_n,
            trunk,
            buffer,
            body_caps,
            alt_body_caps,
            head_caps,
            dropout,
        }
    }
}

/// Class-capsule lengths; ``[batch, num_caps, cap_dim] -> [batch, num_caps]``.
fn capsule_lengths<B: Backend>(capsules: Tensor<B, 3>) -> Tensor<B, 2> {
    capsules
        .powf_scalar(2.0)
        .sum_dim(2)
        .sqrt()
        .squeeze_dims::<2>(&[2])
}

/// The `v0` architecture; two conv stages into a fully-connected
/// capsule head.
#[derive(Module, Debug)]
pub struct PrimaryCapsNet<B: Backend> {
    /// First conv/norm/act stage; 9x9, stride 2.
    pub pre1: Cna2d<B>,

    /// Second conv/norm/act stage; 3x3, stride 2.
    pub pre2: Cna2d<B>,

    /// Fully-connected class-capsule head.
    pub class_caps: CapLayer<B>,
}

impl<B: Backend> PrimaryCapsNet<B> {
    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// - `images`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``([batch, num_classes] class-capsule lengths, routing stats)``
    pub fn forward_with_stats(
        &self,
        images: Tensor<B, 4>,
    ) -> (Tensor<B, 2>, Vec<RoutingStats<B>>) {
        let x = self.pre1.forward(images);
        let x = self.pre2.forward(x);

        let (capsules, stats) = self.class_caps.forward(x);

        (capsule_lengths(capsules), vec![stats])
    }
}

/// The `v1` .. `v5_2` architectures; the residual trunk, a buffer conv,
/// and an iterated convolutional-capsule pipeline.
#[derive(Module, Debug)]
pub struct ConvCapsNet<B: Backend> {
    /// The architecture variant.
    pub variant: Ignored<Variant>,

    /// The number of iterated capsule-body passes.
    pub cap_n: usize,

    /// The residual trunk.
    pub trunk: CifarResNetTrunk<B>,

    /// Buffer conv ahead of the capsule pipeline.
    pub buffer: Conv2d<B>,

    /// The iterated capsule body.
    pub body_caps: ConvCapLayer<B>,

    /// The input/output-shared fan-out branch (`v5_*`).
    pub alt_body_caps: Option<ConvCapLayer<B>>,

    /// The class-capsule head.
    pub head_caps: ConvCapLayer<B>,

    /// Channel dropout for the `v4_*` placements.
    pub dropout: Option<ChannelDrop2d>,
}

impl<B: Backend> ConvCapsNet<B> {
    fn drop(
        &self,
        x: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        match &self.dropout {
            Some(dropout) => dropout.forward(x),
            None => x,
        }
    }

    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// - `images`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``([batch, num_classes] class-capsule lengths, routing stats)``,
    /// one stats entry per capsule-layer invocation, in order.
    pub fn forward_with_stats(
        &self,
        images: Tensor<B, 4>,
    ) -> (Tensor<B, 2>, Vec<RoutingStats<B>>) {
        let plan = match self.variant.0.body_plan() {
            Some(plan) => plan,
            None => unreachable!("conv-caps architecture has an iterated body"),
        };

        let x = self.trunk.forward(images);
        let x = relu(self.buffer.forward(x));
        let mut x = squash_channels(x);

        let mut stats = Vec::with_capacity(self.cap_n + 1);

        match plan {
            BodyPlan::Chain => {
                for _ in 0..self.cap_n {
                    let (y, s) = self.body_caps.forward(x);
                    stats.push(s);
                    x = y;
                }
            }

            BodyPlan::Residual {
                drop_output,
                drop_residual,
                resquash,
            } => {
                for _ in 0..self.cap_n {
                    let mut residual = x.clone();
                    if drop_residual {
                        residual = self.drop(residual);
                    }

                    let (mut y, s) = self.body_caps.forward(x);
                    stats.push(s);
                    if drop_output {
                        y = self.drop(y);
                    }

                    x = y + residual;
                    if resquash {
                        x = squash_channels(x);
                    }
                }
            }

            BodyPlan::FanOut { resquash } => {
                let alt = match &self.alt_body_caps {
                    Some(alt) => alt,
                    None => unreachable!("fan-out variants build the alt body"),
                };

                for _ in 0..self.cap_n {
                    let residual = x.clone();

                    let (x1, s1) = self.body_caps.forward(x.clone());
                    stats.push(s1);
                    let (x2, s2) = alt.forward(x);
                    stats.push(s2);

                    x = residual + x1 + x2;
                    if resquash {
                        x = squash_channels(x);
                    }
                }
            }
        }

        let (capsules, head_stats) = self.head_caps.forward_classes(x);
        stats.push(head_stats);

        (capsule_lengths(capsules), stats)
    }
}

/// Capsule-network architecture wrapper.
#[derive(Module, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum CapsArch<B: Backend> {
    /// The `v_base` residual baseline.
    Baseline(CifarResNet<B>),

    /// The `v0` primary-capsule network.
    PrimaryCaps(PrimaryCapsNet<B>),

    /// The `v1` .. `v5_2` convolutional-capsule pipelines.
    ConvCaps(ConvCapsNet<B>),
}

/// Capsule network.
///
/// Implements [`CapsNetMeta`].
#[derive(Module, Debug)]
pub struct CapsNet<B: Backend> {
    /// The variant architecture.
    pub arch: CapsArch<B>,
}

impl<B: Backend> CapsNetMeta for CapsNet<B> {
    fn variant(&self) -> Variant {
        match &self.arch {
            CapsArch::Baseline(_) => Variant::VBase,
            CapsArch::PrimaryCaps(_) => Variant::V0,
            CapsArch::ConvCaps(model) => model.variant.0,
        }
    }

    fn num_classes(&self) -> usize {
        match &self.arch {
            CapsArch::Baseline(model) => model.num_classes(),
            CapsArch::PrimaryCaps(model) => model.class_caps.num_out_caps(),
            CapsArch::ConvCaps(model) => model.head_caps.num_out_caps(),
        }
    }
}

impl<B: Backend> CapsNet<B> {
    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// - `images`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// Class scores, ``[batch, num_classes]``; logits for the baseline,
    /// class-capsule lengths for the capsule variants.
    pub fn forward(
        &self,
        images: Tensor<B, 4>,
    ) -> Tensor<B, 2> {
        self.forward_with_stats(images).0
    }

    /// Forward pass, collecting routing stats.
    ///
    /// # Arguments
    ///
    /// - `images`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``([batch, num_classes] scores, routing stats)``; one stats entry
    /// per capsule-layer invocation, in order. Empty for the baseline.
    pub fn forward_with_stats(
        &self,
        images: Tensor<B, 4>,
    ) -> (Tensor<B, 2>, Vec<RoutingStats<B>>) {
        let batch = images.shape().dims[0];

        let (scores, stats) = match &self.arch {
            CapsArch::Baseline(model) => (model.forward(images), Vec::new()),
            CapsArch::PrimaryCaps(model) => model.forward_with_stats(images),
            CapsArch::ConvCaps(model) => model.forward_with_stats(images),
        };

        assert_shape_contract_periodically!(
            ["batch", "num_classes"],
            &scores,
            &[("batch", batch), ("num_classes", self.num_classes())],
        );

        (scores, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimm_contracts::assert_shape_contract;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::{Distribution, ElementConversion};

    type B = NdArray<f32>;

    fn small_config(variant: Variant) -> CapsNetConfig {
        CapsNetConfig::new(variant, 10)
            .with_depth(8)
            .with_cap_n(1)
            .with_primary_cap_num(8)
            .with_pre_conv_channels(32)
    }

    fn cifar_input(batch: usize) -> Tensor<B, 4> {
        let device = Default::default();
        Tensor::random([batch, 3, 32, 32], Distribution::Default, &device)
    }

    #[test]
    fn test_capsnet_config() {
        let config = CapsNetConfig::new(Variant::V2, 100);
        config.expect_valid();

        assert_eq!(config.variant(), Variant::V2);
        assert_eq!(config.num_classes(), 100);
        assert_eq!(config.pipeline_channels(), 128);
        assert_eq!(config.cap_n, 3);

        let config = config.with_variant(Variant::V1);
        assert_eq!(config.pipeline_channels(), 64);
    }

    #[test]
    fn test_capsnet_config_bad_depth() {
        let config = CapsNetConfig::new(Variant::VBase, 10).with_depth(21);
        assert!(config.try_validate().is_err());

        // v0 has no residual trunk; depth does not apply.
        let config = CapsNetConfig::new(Variant::V0, 10).with_depth(21);
        assert!(config.try_validate().is_ok());
    }

    #[test]
    #[should_panic(expected = "cap_n >= 1")]
    fn test_capsnet_config_zero_cap_n() {
        CapsNetConfig::new(Variant::V2, 10).with_cap_n(0).expect_valid();
    }

    #[test]
    fn test_baseline_forward() {
        let device = Default::default();

        let model: CapsNet<B> = small_config(Variant::VBase).init(&device);
        assert_eq!(model.variant(), Variant::VBase);
        assert_eq!(model.num_classes(), 10);

        let (scores, stats) = model.forward_with_stats(cifar_input(2));

        assert_shape_contract!(
            ["batch", "num_classes"],
            &scores,
            &[("batch", 2), ("num_classes", 10)],
        );
        assert!(stats.is_empty());
    }

    #[test]
    fn test_primary_caps_forward() {
        let device = Default::default();

        let model: CapsNet<B> = small_config(Variant::V0).init(&device);
        assert_eq!(model.variant(), Variant::V0);

        let (scores, stats) = model.forward_with_stats(cifar_input(2));

        assert_shape_contract!(
            ["batch", "num_classes"],
            &scores,
            &[("batch", 2), ("num_classes", 10)],
        );
        assert_eq!(stats.len(), 1);

        // Capsule lengths are bounded by the squash.
        let max_score: f32 = scores.max().into_scalar().elem();
        assert!(max_score < 1.0);
    }

    #[test]
    fn test_primary_caps_instance_norm() {
        let device = Default::default();

        let model: CapsNet<B> = small_config(Variant::V0)
            .with_use_instance_norm(true)
            .init(&device);

        let (scores, _) = model.forward_with_stats(cifar_input(1));
        assert_shape_contract!(
            ["batch", "num_classes"],
            &scores,
            &[("batch", 1), ("num_classes", 10)],
        );
    }

    #[test]
    fn test_chain_forward_collects_stats() {
        let device = Default::default();

        let model: CapsNet<B> = small_config(Variant::V2).with_cap_n(2).init(&device);

        let (scores, stats) = model.forward_with_stats(cifar_input(2));

        assert_shape_contract!(
            ["batch", "num_classes"],
            &scores,
            &[("batch", 2), ("num_classes", 10)],
        );
        // Two body passes plus the class head.
        assert_eq!(stats.len(), 3);
    }

    #[test]
    fn test_narrow_chain_forward() {
        let device = Default::default();

        let model: CapsNet<B> = small_config(Variant::V1).init(&device);

        match &model.arch {
            CapsArch::ConvCaps(inner) => {
                assert_eq!(inner.body_caps.in_channels(), 64);
                assert!(inner.alt_body_caps.is_none());
                assert!(inner.dropout.is_none());
            }
            arch => panic!("unexpected arch: {arch:?}"),
        }

        let scores = model.forward(cifar_input(1));
        assert_shape_contract!(
            ["batch", "num_classes"],
            &scores,
            &[("batch", 1), ("num_classes", 10)],
        );
    }

    #[test]
    fn test_shared_group_body() {
        let device = Default::default();

        let model: CapsNet<B> = small_config(Variant::V3).init(&device);

        match &model.arch {
            CapsArch::ConvCaps(inner) => {
                assert_eq!(inner.body_caps.shared_group(), 2);
                assert!(inner.alt_body_caps.is_none());
            }
            arch => panic!("unexpected arch: {arch:?}"),
        }

        let scores = model.forward(cifar_input(1));
        assert_eq!(scores.shape().dims, [1, 10]);
    }

    #[test]
    fn test_residual_variant_forward_autodiff() {
        type AB = Autodiff<NdArray<f32>>;
        let device = Default::default();

        let model: CapsNet<AB> = small_config(Variant::V4_4).init(&device);

        match &model.arch {
            CapsArch::ConvCaps(inner) => {
                assert!(inner.dropout.is_some());
            }
            arch => panic!("unexpected arch: {arch:?}"),
        }

        let input: Tensor<AB, 4> =
            Tensor::random([2, 3, 32, 32], Distribution::Default, &device);
        let (scores, stats) = model.forward_with_stats(input);

        assert_eq!(scores.shape().dims, [2, 10]);
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn test_fan_out_forward() {
        let device = Default::default();

        let model: CapsNet<B> = small_config(Variant::V5_1).init(&device);

        match &model.arch {
            CapsArch::ConvCaps(inner) => {
                assert!(inner.alt_body_caps.is_some());
                assert!(inner.dropout.is_none());
            }
            arch => panic!("unexpected arch: {arch:?}"),
        }

        let (scores, stats) = model.forward_with_stats(cifar_input(1));

        assert_eq!(scores.shape().dims, [1, 10]);
        // Two branches per pass plus the class head.
        assert_eq!(stats.len(), 3);
    }

    #[test]
    fn test_every_variant_builds_and_forwards() {
        let device = Default::default();

        for variant in Variant::ALL {
            let model: CapsNet<B> = small_config(variant).init(&device);
            assert_eq!(model.variant(), variant, "{variant}");

            let scores = model.forward(cifar_input(1));
            assert_eq!(scores.shape().dims, [1, 10], "{variant}");
        }
    }
}
