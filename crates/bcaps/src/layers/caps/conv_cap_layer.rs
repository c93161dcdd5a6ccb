//! # Convolutional Capsule Layer
//!
//! [`ConvCapLayer`] treats a feature map as a grid of capsules: each spatial
//! position holds ``in_channels / in_dim`` capsules of dimension `in_dim`.
//! Transform weights are shared across the spatial grid, with optional extra
//! sharing among input capsules (`shared_size`) and output capsules
//! (`shared_group`).
//!
//! Two output heads:
//! * the spatial head (default) routes the capsules at each position
//!   independently, producing a ``[batch, out_channels, height, width]`` map;
//! * the class head (`final_classes`) routes every capsule at every position
//!   jointly to one capsule per class, producing
//!   ``[batch, num_classes, out_dim]``.
//!
//! [`ConvCapLayerMeta`] defines a common meta API for [`ConvCapLayer`]
//! and [`ConvCapLayerConfig`].

use crate::layers::caps::routing::{RoutingConfig, RoutingStats, route_with_stats};
use bimm_contracts::{assert_shape_contract_periodically, unpack_shape_contract};
use burn::module::Param;
use burn::nn::Initializer;
use burn::prelude::{Backend, Config, Module, Tensor};

/// [`ConvCapLayer`] Meta trait.
pub trait ConvCapLayerMeta {
    /// The number of input capsules per spatial position.
    fn num_in_caps(&self) -> usize;

    /// The number of output capsules.
    ///
    /// Per spatial position for the spatial head;
    /// total (one per class) for the class head.
    fn num_out_caps(&self) -> usize;

    /// The dimension of an input capsule.
    fn in_dim(&self) -> usize;

    /// The dimension of an output capsule.
    fn out_dim(&self) -> usize;

    /// Input capsules per transform bank.
    fn shared_size(&self) -> usize;

    /// Output-capsule groups reusing the transform banks.
    fn shared_group(&self) -> usize;

    /// Whether this layer is a class head.
    fn is_class_head(&self) -> bool;

    /// The size of the in channels dimension.
    ///
    /// ``in_channels = num_in_caps * in_dim``
    fn in_channels(&self) -> usize {
        self.num_in_caps() * self.in_dim()
    }

    /// The size of the out channels dimension (spatial head).
    ///
    /// ``out_channels = num_out_caps * out_dim``
    fn out_channels(&self) -> usize {
        self.num_out_caps() * self.out_dim()
    }
}

/// [`ConvCapLayer`] Config.
///
/// Implements [`ConvCapLayerMeta`].
#[derive(Config, Debug)]
pub struct ConvCapLayerConfig {
    /// The size of the in channels dimension.
    pub in_channels: usize,

    /// The size of the out channels dimension.
    ///
    /// Ignored by the class head, where the output capsule count
    /// comes from `final_classes`.
    pub out_channels: usize,

    /// The dimension of an input capsule.
    #[config(default = 8)]
    pub in_dim: usize,

    /// The dimension of an output capsule.
    #[config(default = 8)]
    pub out_dim: usize,

    /// Input capsules per transform bank.
    #[config(default = 1)]
    pub shared_size: usize,

    /// Output-capsule groups reusing the transform banks.
    #[config(default = 1)]
    pub shared_group: usize,

    /// If set, build a class head over this many classes.
    #[config(default = "None")]
    pub final_classes: Option<usize>,

    /// The routing configuration.
    #[config(default = "RoutingConfig::new()")]
    pub routing: RoutingConfig,

    /// The transform weight initializer.
    #[config(default = "Initializer::Normal{mean: 0.0, std: 0.01}")]
    pub initializer: Initializer,
}

impl ConvCapLayerMeta for ConvCapLayerConfig {
    fn num_in_caps(&self) -> usize {
        self.in_channels / self.in_dim
    }

    fn num_out_caps(&self) -> usize {
        match self.final_classes {
            Some(classes) => classes,
            None => self.out_channels / self.out_dim,
        }
    }

    fn in_dim(&self) -> usize {
        self.in_dim
    }

    fn out_dim(&self) -> usize {
        self.out_dim
    }

    fn shared_size(&self) -> usize {
        self.shared_size
    }

    fn shared_group(&self) -> usize {
        self.shared_group
    }

    fn is_class_head(&self) -> bool {
        self.final_classes.is_some()
    }
}

impl ConvCapLayerConfig {
    /// Check if the config is valid.
    ///
    /// # Returns
    ///
    /// A `Result<(), String>`
    pub fn try_validate(&self) -> Result<(), String> {
        if self.in_dim == 0 || self.out_dim == 0 {
            return Err("capsule dims must be non-zero".to_string());
        }
        if self.shared_size == 0 || self.shared_group == 0 {
            return Err("sharing factors must be non-zero".to_string());
        }
        if self.in_channels % self.in_dim != 0 {
            return Err(format!(
                "in_channels({}) must be divisible by in_dim({})",
                self.in_channels, self.in_dim,
            ));
        }
        if self.num_in_caps() % self.shared_size != 0 {
            return Err(format!(
                "input capsules({}) must be divisible by shared_size({})",
                self.num_in_caps(),
                self.shared_size,
            ));
        }
        if self.final_classes.is_none() && self.out_channels % self.out_dim != 0 {
            return Err(format!(
                "out_channels({}) must be divisible by out_dim({})",
                self.out_channels, self.out_dim,
            ));
        }
        if self.num_out_caps() % self.shared_group != 0 {
            return Err(format!(
                "output capsules({}) must be divisible by shared_group({})",
                self.num_out_caps(),
                self.shared_group,
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

    /// Initialize a [`ConvCapLayer`].
    pub fn init<B: Backend>(
        self,
        device: &B::Device,
    ) -> ConvCapLayer<B> {
        self.expect_valid();

        let in_banks = self.num_in_caps() / self.shared_size;
        let out_banks = self.num_out_caps() / self.shared_group;

        let weight = self.initializer.init_with(
            [in_banks, out_banks, self.out_dim, self.in_dim],
            Some(self.in_dim),
            Some(self.out_dim),
            device,
        );

        ConvCapLayer {
            num_in_caps: self.num_in_caps(),
            shared_size: self.shared_size,
            shared_group: self.shared_group,
            class_head: self.final_classes.is_some(),
            weight,
            route_num: self.routing.num_iterations,
        }
    }
}

/// Convolutional capsule layer.
///
/// Implements [`ConvCapLayerMeta`].
#[derive(Module, Debug)]
pub struct ConvCapLayer<B: Backend> {
    /// The number of input capsules per spatial position.
    pub num_in_caps: usize,

    /// Input capsules per transform bank.
    pub shared_size: usize,

    /// Output-capsule groups reusing the transform banks.
    pub shared_group: usize,

    /// Whether this layer is a class head.
    pub class_head: bool,

    /// Transform weight banks;
    /// ``[num_in_caps / shared_size, num_out_caps / shared_group, out_dim, in_dim]``.
    pub weight: Param<Tensor<B, 4>>,

    /// The number of routing iterations.
    pub route_num: usize,
}

impl<B: Backend> ConvCapLayerMeta for ConvCapLayer<B> {
    fn num_in_caps(&self) -> usize {
        self.num_in_caps
    }

    fn num_out_caps(&self) -> usize {
        self.weight.shape().dims[1] * self.shared_group
    }

    fn in_dim(&self) -> usize {
        self.weight.shape().dims[3]
    }

    fn out_dim(&self) -> usize {
        self.weight.shape().dims[2]
    }

    fn shared_size(&self) -> usize {
        self.shared_size
    }

    fn shared_group(&self) -> usize {
        self.shared_group
    }

    fn is_class_head(&self) -> bool {
        self.class_head
    }
}

impl<B: Backend> ConvCapLayer<B> {
    /// Expand the weight banks to per-capsule transforms.
    ///
    /// Bank selection: input capsule `i` uses bank ``i / shared_size``;
    /// output capsule `o` uses bank ``o % (num_out / shared_group)``.
    ///
    /// # Returns
    ///
    /// ``[num_in_caps, in_dim, num_out_caps * out_dim]``
    fn transform_matrix(&self) -> Tensor<B, 3> {
        let [in_banks, out_banks, out_dim, in_dim] = self.weight.shape().dims();
        let num_in = self.num_in_caps;
        let num_out = self.num_out_caps();

        // [in_banks, 1, out_banks, out_dim, in_dim]
        //   -> [num_in, out_banks, out_dim, in_dim]
        let w = self
            .weight
            .val()
            .unsqueeze_dim::<5>(1)
            .expand([in_banks, self.shared_size, out_banks, out_dim, in_dim])
            .reshape([num_in, out_banks, out_dim, in_dim]);

        // [num_in, 1, out_banks, out_dim, in_dim]
        //   -> [num_in, num_out, out_dim, in_dim]
        let w = w
            .unsqueeze_dim::<5>(1)
            .expand([num_in, self.shared_group, out_banks, out_dim, in_dim])
            .reshape([num_in, num_out, out_dim, in_dim]);

        // [num_in, in_dim, num_out * out_dim]
        w.permute([0, 3, 1, 2])
            .reshape([num_in, in_dim, num_out * out_dim])
    }

    /// Spatial-head forward pass.
    ///
    /// Routes the capsules at each spatial position independently.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``; capsule
    ///   components are assumed squashed by the caller.
    ///
    /// # Returns
    ///
    /// ``([batch, out_channels, height, width], RoutingStats)``
    ///
    /// # Panics
    ///
    /// If this layer was built as a class head.
    pub fn forward(
        &self,
        input: Tensor<B, 4>,
    ) -> (Tensor<B, 4>, RoutingStats<B>) {
        assert!(
            !self.class_head,
            "spatial forward on a class-head capsule layer"
        );

        let num_in = self.num_in_caps;
        let num_out = self.num_out_caps();
        let in_dim = self.in_dim();
        let out_dim = self.out_dim();

        let [batch, height, width] = unpack_shape_contract!(
            [
                "batch",
                "in_channels" = "num_in_caps" * "in_dim",
                "height",
                "width"
            ],
            &input,
            &["batch", "height", "width"],
            &[("num_in_caps", num_in), ("in_dim", in_dim)],
        );
        let spatial = height * width;

        // [batch, spatial, num_in, in_dim]
        let capsules = input
            .reshape([batch, num_in, in_dim, spatial])
            .permute([0, 3, 1, 2]);

        // u_hat: [batch * spatial, num_out, num_in, out_dim]
        let lhs = capsules.unsqueeze_dim::<5>(3);
        let rhs = self
            .transform_matrix()
            .unsqueeze::<5>()
            .expand([batch, spatial, num_in, in_dim, num_out * out_dim]);
        let predictions = lhs
            .matmul(rhs)
            .reshape([batch, spatial, num_in, num_out, out_dim])
            .swap_dims(2, 3)
            .reshape([batch * spatial, num_out, num_in, out_dim]);

        let (routed, stats) = route_with_stats(predictions, self.route_num);

        // [batch, num_out * out_dim, height, width]
        let output = routed
            .reshape([batch, spatial, num_out, out_dim])
            .permute([0, 2, 3, 1])
            .reshape([batch, num_out * out_dim, height, width]);

        assert_shape_contract_periodically!(
            ["batch", "out_channels", "height", "width"],
            &output,
            &[
                ("batch", batch),
                ("out_channels", self.out_channels()),
                ("height", height),
                ("width", width)
            ],
        );

        (output, stats)
    }

    /// Class-head forward pass.
    ///
    /// Routes every capsule at every spatial position jointly
    /// to one capsule per class.
    ///
    /// # Arguments
    ///
    /// - `input`: ``[batch, in_channels, height, width]``.
    ///
    /// # Returns
    ///
    /// ``([batch, num_classes, out_dim], RoutingStats)``
    ///
    /// # Panics
    ///
    /// If this layer was built as a spatial head.
    pub fn forward_classes(
        &self,
        input: Tensor<B, 4>,
    ) -> (Tensor<B, 3>, RoutingStats<B>) {
        assert!(
            self.class_head,
            "class forward on a spatial capsule layer"
        );

        let num_in = self.num_in_caps;
        let num_out = self.num_out_caps();
        let in_dim = self.in_dim();
        let out_dim = self.out_dim();

        let [batch, height, width] = unpack_shape_contract!(
            [
                "batch",
                "in_channels" = "num_in_caps" * "in_dim",
                "height",
                "width"
            ],
            &input,
            &["batch", "height", "width"],
            &[("num_in_caps", num_in), ("in_dim", in_dim)],
        );
        let spatial = height * width;

        // [batch, num_in, spatial, in_dim]
        let capsules = input
            .reshape([batch, num_in, in_dim, spatial])
            .swap_dims(2, 3);

        // u_hat: [batch, num_out, num_in * spatial, out_dim]
        let rhs = self
            .transform_matrix()
            .unsqueeze::<4>()
            .expand([batch, num_in, in_dim, num_out * out_dim]);
        let predictions = capsules
            .matmul(rhs)
            .reshape([batch, num_in, spatial, num_out, out_dim])
            .permute([0, 3, 1, 2, 4])
            .reshape([batch, num_out, num_in * spatial, out_dim]);

        let (output, stats) = route_with_stats(predictions, self.route_num);

        assert_shape_contract_periodically!(
            ["batch", "num_classes", "out_dim"],
            &output,
            &[
                ("batch", batch),
                ("num_classes", num_out),
                ("out_dim", out_dim)
            ],
        );

        (output, stats)
    }
}
