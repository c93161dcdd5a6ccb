//! # Variant Tags
//!
//! [`Variant`] selects which fixed architecture and forward-pass branch a
//! [`CapsNet`] instantiates and runs. The tags follow the research naming:
//! `v_base` is the residual baseline, `v0` the Sabour-style primary-capsule
//! design, and `v1` through `v5_2` the convolutional-capsule pipelines.
//!
//! [`CapsNet`]: crate::models::capsnet::model::CapsNet

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Architecture variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum Variant {
    /// Residual-network baseline.
    #[serde(rename = "v_base")]
    VBase,

    /// Primary-capsule network; conv stem into a fully-connected
    /// capsule head.
    #[serde(rename = "v0")]
    V0,

    /// 64-channel convolutional-capsule chain.
    #[serde(rename = "v1")]
    V1,

    /// 128-channel chain; input-shared transforms.
    #[serde(rename = "v2")]
    V2,

    /// 128-channel chain; input- and output-shared transforms.
    #[serde(rename = "v3")]
    V3,

    /// Residual capsule loop.
    #[serde(rename = "v4_1")]
    V4_1,

    /// Residual loop; re-squash after the add.
    #[serde(rename = "v4_2")]
    V4_2,

    /// Residual loop; dropout on the capsule output.
    #[serde(rename = "v4_3")]
    V4_3,

    /// Residual loop; dropout on the capsule output, re-squash.
    #[serde(rename = "v4_4")]
    V4_4,

    /// Residual loop; dropout on the residual branch.
    #[serde(rename = "v4_5")]
    V4_5,

    /// Residual loop; dropout on the residual branch, re-squash.
    #[serde(rename = "v4_6")]
    V4_6,

    /// Residual loop; dropout on both branches.
    #[serde(rename = "v4_7")]
    V4_7,

    /// Residual loop; dropout on both branches, re-squash.
    #[serde(rename = "v4_8")]
    V4_8,

    /// Two-branch fan-out merged with the residual.
    #[serde(rename = "v5_1")]
    V5_1,

    /// Two-branch fan-out; re-squash after the merge.
    #[serde(rename = "v5_2")]
    V5_2,
}

/// Data-flow plan for the iterated capsule body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPlan {
    /// Plain chained capsule layers.
    Chain,

    /// Residual loop around the capsule layer.
    Residual {
        /// Apply dropout to the capsule output.
        drop_output: bool,

        /// Apply dropout to the residual branch.
        drop_residual: bool,

        /// Re-squash after the residual add.
        resquash: bool,
    },

    /// Two-branch fan-out (input-shared and input/output-shared layers),
    /// merged as ``residual + x1 + x2``.
    FanOut {
        /// Re-squash after the merge.
        resquash: bool,
    },
}

impl Variant {
    /// All variant tags, in naming order.
    pub const ALL: [Variant; 15] = [
        Variant::VBase,
        Variant::V0,
        Variant::V1,
        Variant::V2,
        Variant::V3,
        Variant::V4_1,
        Variant::V4_2,
        Variant::V4_3,
        Variant::V4_4,
        Variant::V4_5,
        Variant::V4_6,
        Variant::V4_7,
        Variant::V4_8,
        Variant::V5_1,
        Variant::V5_2,
    ];

    /// The tag string.
    pub fn tag(&self) -> &'static str {
        match self {
            Variant::VBase => "v_base",
            Variant::V0 => "v0",
            Variant::V1 => "v1",
            Variant::V2 => "v2",
            Variant::V3 => "v3",
            Variant::V4_1 => "v4_1",
            Variant::V4_2 => "v4_2",
            Variant::V4_3 => "v4_3",
            Variant::V4_4 => "v4_4",
            Variant::V4_5 => "v4_5",
            Variant::V4_6 => "v4_6",
            Variant::V4_7 => "v4_7",
            Variant::V4_8 => "v4_8",
            Variant::V5_1 => "v5_1",
            Variant::V5_2 => "v5_2",
        }
    }

    /// Whether this is the residual-network baseline.
    pub fn is_baseline(&self) -> bool {
        matches!(self, Variant::VBase)
    }

    /// Whether this is the primary-capsule design.
    pub fn is_primary_caps(&self) -> bool {
        matches!(self, Variant::V0)
    }

    /// Whether this variant runs a convolutional-capsule pipeline
    /// on top of the residual trunk.
    pub fn uses_trunk(&self) -> bool {
        !self.is_baseline() && !self.is_primary_caps()
    }

    /// Whether the capsule pipeline runs at the wide (128-channel) width.
    ///
    /// `v1` runs at the trunk's 64 channels.
    pub fn wide_caps(&self) -> bool {
        self.uses_trunk() && !matches!(self, Variant::V1)
    }

    /// Whether the chained body layer shares transforms across
    /// output groups as well as input groups.
    pub fn shared_group_body(&self) -> bool {
        matches!(self, Variant::V3)
    }

    /// Whether this variant needs a second, input/output-shared body layer
    /// for the fan-out branch.
    pub fn uses_alt_body(&self) -> bool {
        matches!(self, Variant::V5_1 | Variant::V5_2)
    }

    /// The data-flow plan of the iterated capsule body.
    ///
    /// `None` for the baseline and the primary-capsule design,
    /// which have no iterated body.
    pub fn body_plan(&self) -> Option<BodyPlan> {
        match self {
            Variant::VBase | Variant::V0 => None,

            Variant::V1 | Variant::V2 | Variant::V3 => Some(BodyPlan::Chain),

            Variant::V4_1 => Some(BodyPlan::Residual {
                drop_output: false,
                drop_residual: false,
                resquash: false,
            }),
            Variant::V4_2 => Some(BodyPlan::Residual {
                drop_output: false,
                drop_residual: false,
                resquash: true,
            }),
            Variant::V4_3 => Some(BodyPlan::Residual {
                drop_output: true,
                drop_residual: false,
                resquash: false,
            }),
            Variant::V4_4 => Some(BodyPlan::Residual {
                drop_output: true,
                drop_residual: false,
                resquash: true,
            }),
            Variant::V4_5 => Some(BodyPlan::Residual {
                drop_output: false,
                drop_residual: true,
                resquash: false,
            }),
            Variant::V4_6 => Some(BodyPlan::Residual {
                drop_output: false,
                drop_residual: true,
                resquash: true,
            }),
            Variant::V4_7 => Some(BodyPlan::Residual {
                drop_output: true,
                drop_residual: true,
                resquash: false,
            }),
            Variant::V4_8 => Some(BodyPlan::Residual {
                drop_output: true,
                drop_residual: true,
                resquash: true,
            }),

            Variant::V5_1 => Some(BodyPlan::FanOut { resquash: false }),
            Variant::V5_2 => Some(BodyPlan::FanOut { resquash: true }),
        }
    }

    /// Whether the body plan places dropout anywhere.
    pub fn uses_dropout(&self) -> bool {
        matches!(
            self.body_plan(),
            Some(BodyPlan::Residual {
                drop_output,
                drop_residual,
                ..
            }) if drop_output || drop_residual
        )
    }
}

impl fmt::Display for Variant {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .iter()
            .find(|v| v.tag() == s)
            .copied()
            .ok_or_else(|| format!("Unknown structure or capsule model type: {s:?}"))
    }
}
