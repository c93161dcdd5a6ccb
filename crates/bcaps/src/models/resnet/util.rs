//! # `ResNet` Utilities
use bimm_contracts::unpack_shape_contract;
use burn::nn::Initializer;

/// Conv initializer for layers feeding a relu;
/// Kaiming-normal with ``std = sqrt(2 / fan_out)``.
pub const CONV_INTO_RELU_INITIALIZER: Initializer = Initializer::KaimingNormal {
    gain: std::f64::consts::SQRT_2,
    fan_out_only: true,
};

/// Classifier head initializer; ``N(0, 0.05)``.
pub const CLASSIFIER_INITIALIZER: Initializer = Initializer::Normal {
    mean: 0.0,
    std: 0.05,
};

/// Lift a scalar to a square 2d array.
#[inline(always)]
pub fn scalar_to_array(value: usize) -> [usize; 2] {
    [value, value]
}

/// Get the output resolution for a given input resolution.
///
/// The input must be a multiple of the stride.
///
/// # Arguments
///
/// - `input_resolution`: ``[height_in=height_out*stride, width_in=width_out*stride]``.
///
/// # Returns
///
/// ``[height_out, width_out]``
///
/// # Panics
///
/// If the input resolution is not a multiple of the stride.
#[inline(always)]
pub fn stride_div_output_resolution(
    input_resolution: [usize; 2],
    stride: usize,
) -> [usize; 2] {
    unpack_shape_contract!(
        [
            "height_in" = "height_out" * "stride",
            "width_in" = "width_out" * "stride"
        ],
        &input_resolution,
        &["height_out", "width_out"],
        &[("stride", stride)]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_to_array() {
        assert_eq!(scalar_to_array(3), [3, 3]);
    }

    #[test]
    fn test_stride_div_output_resolution() {
        assert_eq!(stride_div_output_resolution([8, 12], 2), [4, 6]);
        assert_eq!(stride_div_output_resolution([8, 12], 1), [8, 12]);
    }

    #[test]
    #[should_panic(expected = "7 !~ height_in=(height_out*stride)")]
    fn test_stride_div_output_resolution_panics() {
        stride_div_output_resolution([7, 8], 2);
    }
}
