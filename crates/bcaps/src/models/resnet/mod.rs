//! # CIFAR-style `ResNet`
//!
//! The ``6n + 2`` residual-network family: a 3x3 stem at 16 planes, three
//! stages at 16/32/64 planes, and an average-pool classifier head.
//! [`BasicBlock`] below depth 44; [`BottleneckBlock`] at and above it.

pub mod basic_block;
pub mod bottleneck_block;
pub mod downsample;
pub mod layer_block;
pub mod residual_block;
pub mod resnet_model;
pub mod util;

pub use basic_block::{BasicBlock, BasicBlockConfig, BasicBlockMeta};
pub use bottleneck_block::{BottleneckBlock, BottleneckBlockConfig, BottleneckBlockMeta};
pub use downsample::{Downsample, DownsampleConfig, DownsampleMeta};
pub use layer_block::{LayerBlock, LayerBlockConfig, LayerBlockMeta};
pub use residual_block::{ResidualBlock, ResidualBlockConfig, ResidualBlockMeta};
pub use resnet_model::{CifarResNet, CifarResNetConfig, CifarResNetMeta, CifarResNetTrunk};
