//! # Capsule Network Variant Family
//!
//! A configuration-selected family of capsule-network architectures plus a
//! residual-network baseline:
//!
//! * [`Variant`] - the variant tag and its data-flow plan.
//! * [`CapsNet`] / [`CapsNetConfig`] - model construction and forward
//!   dispatch.
//! * [`loss`] - the capsule margin loss.

pub mod loss;
pub mod model;
pub mod variant;

pub use loss::{MarginLoss, MarginLossConfig};
pub use model::{CapsNet, CapsNetConfig, CapsNetMeta};
pub use variant::{BodyPlan, Variant};
