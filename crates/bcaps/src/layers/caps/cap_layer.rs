//! # Fully-Connected Capsule Layer
//!
//! [`CapLayer`] routes every input capsule in a feature map to a set of
//! output capsules; the class-capsule head of Sabour et al. (2017).
//!
//! Transform weights are shared group-wise: input capsules are split into
//! `num_shared` channel groups, and capsules within a group (one per spatial
//! position) use the same transform matrices.
//!
//! [`CapLayerMeta`] defines a common meta API for [`CapLayer`]
//! and [`CapLayerConfig`].
//!
//! [`CapLayerConfig`] implements [`Config`], and provides
//! [`CapLayerConfig::init`] to initialize a [`CapLayer`].

use crate::layers::caps::routing::{RoutingConfig, RoutingStats, route_with_stats};
use crate::layers::caps::squash::squash;
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::module::Param;
use burn::nn::Initializer;
use burn::prelude::{Backend, Config, Module, Tensor};

/// [`CapLayer`] Meta trait.
pub trait CapLayerMeta {
    /// The total number of input capsules.
    fn num_in_caps(&self) -> usize;

    /// The number of output capsules.
    fn num_out_caps(&self) -> usize;

    /// The dimension of an input capsule.
    fn in_dim(&self) -> usize;

    /// The dimension of an output capsule.
    fn out_dim(&self) -> usize;

    /// The number of weight-sharing input groups.
    fn num_shared(&self) -> usize;

    /// The expected input channel count.
    ///
    /// ``in_channels = num_shared * in_dim``
    fn in_channels(&self) -> usize {
        self.num_shared() * self.in_dim()
    }

    /// Input capsules per sharing group.
    ///
    /// ``caps_per_group = num_in_caps / num_shared``
    fn caps_per_group(&self) -> usize {
        self.num_in_caps() / self.num_shared()
    }
}

/// [`CapLayer`] Config.
///
/// Implements [`CapLayerMeta`].
#[derive(Config, Debug)]
pub struct CapLayerConfig {
    /// The total number of input capsules.
    pub num_in_caps: usize,

    /// The number of output capsules.
    pub num_out_caps: usize,

    /// The dimension of an input capsule.
    #[config(default = 8)]
    pub in_dim: usize,

    /// The dimension of an output capsule.
    #[config(default = 16)]
    pub out_dim: usize,

    /// The number of weight-sharing input groups.
    #[config(default = 1)]
    pub num_shared: usize,

    /// The routing configuration.
    #[config(default = "RoutingConfig::new()")]
    pub routing: RoutingConfig,

    /// The transform weight initializer.
    #[config(default = "Initializer::Normal{mean: 0.0, std: 0.01}")]
    pub initializer: Initializer,
}

impl CapLayerMeta for CapLayerConfig {
    fn num_in_caps(&self) -> usize {
        self.num_in_caps
    }

    fn num_out_caps(&self) -> usize {
        self.num_out_caps
    }

    fn in_dim(&self) -> usize {
        self.in_dim
    }

    fn out_dim(&self) -> usize {
        self.out_dim
    }

    fn num_shared(&self) -> usize {
        self.num_shared
    }
}

impl CapLayerConfig {
    /// Check if the config is valid.
    ///
    /// # Returns
    ///
    /// A `Result<(), String>`
    pub fn try_validate(&self) -> Result<(), String> {
        if self.num_in_caps == 0 || self.num_out_caps == 0 {
            return Err("capsule counts must be non-zero".to_string());
        }
        if self.in_dim == 0 || self.out_dim == 0 || self.num_shared == 0 {
            return Err("capsule dims and num_shared must be non-zero".to_string());
        }
        if self.num_in_caps % self.num_shared != 0 {
            return Err(format!(
                "num_in_caps({}) must be divisible by num_shared({})",
                self.num_in_caps, self.num_shared,
            ));
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

    /// Initialize a [`CapLayer`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> CapLayer<B> {
        self.expect_valid();

        let weight = self.initializer.init_with(
            [self.num_shared, self.num_out_caps, self.out_dim, self.in_dim],
            Some(self.in_dim),
            Some(self.out_dim),
            device,
        );

        CapLayer {
            num_in_caps: self.num_in_caps,
            weight,
            route_num: self.routing.num_iterations,
        }
    }
}

/// Fully-connected capsule layer with group-shared transforms.
///
/// Maps a ``[batch, num_shared * in_dim, height, width]`` feature map to
/// ``[batch, num_out_caps, out_dim]`` class capsules.
///
/// Implements [`CapLayerMeta`].
#[derive(Module, Debug)]
pub struct CapLayer<B: Backend> {
    /// The total number of input capsules.
    pub num_in_caps: usize,

    /// Transform weights;
    /// ``[num_shared, num_out_caps, out_dim, in_dim]``.
    pub weight: Param<Tensor<B, 4>>,

    /// The number of routing iterations.
    pub route_num: usize,
}

impl<B: Backend> CapLayerMeta for CapLayer<B> {
    fn num_in_caps(&self) -> usize {
        self.num_in_caps
    }

    fn num_out_caps(&self) -> usize {
        self.weight.shape().dims[1]
    }

    fn in_dim(&self) -> usize {
        self.weight.shape().dims[3]
    }

    fn out_dim(&self) -> usize {
        self.weight.shape().dims[2]
    }

    fn num_shared(&self) -> usize {
        self.weight.shape().dims[0]
    }
}

impl<B: Backend> CapLayer<B> {
    /// Forward Pass.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, num_shared * in_dim, height, width]``,
    ///   with ``num_shared * height * width == num_in_caps``.
    ///
    /// # Returns
    ///
    /// ``([batch, num_out_caps, out_dim], RoutingStats)``
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> (Tensor<B, 3>, RoutingStats<B>) {
        let num_shared = self.num_shared();
        let num_out = self.num_out_caps();
        let in_dim = self.in_dim();
        let out_dim = self.out_dim();

        let [batch, height, width] = unpack_shape_contract!(
            [
                "batch",
                "in_channels" = "num_shared" * "in_dim",
                "height",
                "width"
            ],
            &input,
            &["batch", "height", "width"],
            &[("num_shared", num_shared), ("in_dim", in_dim)],
        );
        let spatial = height * width;
        assert_eq!(
            num_shared * spatial,
            self.num_in_caps,
            "{}x{}x{} feature map does not provide {} input capsules",
            num_shared,
            height,
            width,
            self.num_in_caps,
        );

        // [batch, num_shared, spatial, in_dim] input capsules.
        let capsules = input
            .reshape([batch, num_shared, in_dim, spatial])
            .swap_dims(2, 3);
        let capsules = squash(capsules, 3);

        // u_hat[b, s, o, p, :] = W[s, o] @ u[b, s, p, :]
        let lhs = capsules
            .unsqueeze_dim::<5>(2)
            .expand([batch, num_shared, num_out, spatial, in_dim]);
        let rhs = self
            .weight
            .val()
            .swap_dims(2, 3)
            .unsqueeze::<5>()
            .expand([batch, num_shared, num_out, in_dim, out_dim]);

        // [batch, num_out, num_in_caps, out_dim]
        let predictions = lhs
            .matmul(rhs)
            .swap_dims(1, 2)
            .reshape([batch, num_out, self.num_in_caps, out_dim]);

        let (output, stats) = route_with_stats(predictions, self.route_num);

        assert_shape_contract_periodically!(
            ["batch", "num_out_caps", "out_dim"],
            &output,
            &[
                ("batch", batch),
                ("num_out_caps", num_out),
                ("out_dim", out_dim)
            ],
        );

        (output, stats)
    }
}
