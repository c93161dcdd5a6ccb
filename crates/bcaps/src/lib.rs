#![warn(missing_docs)]
//!# bcaps - Burn Capsule Networks
//!
//! ## Notable Components
//!
//! * [`compat`] - compat code, ported or planned for an upcoming release of ``burn``.
//!   * [`compat::activation_wrapper::Activation`] - activation layer abstraction wrapper.
//!   * [`compat::normalization_wrapper::Normalization`] - norm layer abstraction wrapper.
//! * [`layers`] - reusable neural network modules.
//!   * [`layers::blocks`] - miscellaneous blocks.
//!     * [`layers::blocks::cna`] - ``Conv2d + Norm + Act`` block.
//!   * [`layers::caps`] - capsule layers and operations.
//!     * [`layers::caps::squash`] - the squash nonlinearity.
//!     * [`layers::caps::routing`] - dynamic routing by agreement.
//!     * [`layers::caps::cap_layer`] - fully-connected capsule layer.
//!     * [`layers::caps::conv_cap_layer`] - convolutional capsule layer.
//!   * [`layers::drop`] - dropout layers.
//!     * [`layers::drop::channel_drop`] - 2d channel dropout.
//! * [`models`] - complete model families.
//!   * [`models::capsnet`] - the capsule-network variant family.
//!   * [`models::resnet`] - the CIFAR-style `ResNet` baseline and trunk.

extern crate core;
/// Test-only macro import.
#[cfg(test)]
#[allow(unused_imports)]
#[macro_use]
extern crate hamcrest;

#[allow(dead_code)]
pub mod compat;

pub mod layers;

pub mod models;
pub mod utility;
