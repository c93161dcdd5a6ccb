//! Capsule layers and operations.
//!
//! * [`squash`] - the vector-valued squash nonlinearity.
//! * [`routing`] - dynamic routing by agreement.
//! * [`cap_layer`] - fully-connected capsule layer with shared transforms.
//! * [`conv_cap_layer`] - convolutional capsule layer.

pub mod cap_layer;
pub mod conv_cap_layer;
pub mod routing;
pub mod squash;
