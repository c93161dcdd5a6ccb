//! # Squash Nonlinearity
//!
//! The vector-valued activation of Sabour et al. (2017):
//!
//! ```text
//! v = (|s|^2 / (1 + |s|^2)) * (s / |s|)
//! ```
//!
//! Rescales a capsule vector to length in ``[0, 1)`` while preserving
//! its direction.

use burn::prelude::{Backend, Tensor};

/// Numerical stabilizer for the vector norm.
pub const SQUASH_EPSILON: f64 = 1e-8;

/// Squash the vectors laid out along `dim`.
///
/// # Arguments
///
/// - `input`: a tensor holding capsule vectors along dimension `dim`.
/// - `dim`: the capsule component dimension.
///
/// # Returns
///
/// A tensor of the same shape, each vector rescaled to length in ``[0, 1)``.
pub fn squash<B: Backend, const D: usize>(
    input: Tensor<B, D>,
    dim: usize,
) -> Tensor<B, D> {
    let norm_sq = input.clone().powf_scalar(2.0).sum_dim(dim);

    let scale = norm_sq.clone() / (norm_sq.clone() + 1.0) / (norm_sq + SQUASH_EPSILON).sqrt();

    input * scale
}

/// Squash a feature map along its channel dimension.
///
/// Treats the full channel vector at each spatial position as a single
/// capsule; the variant forward passes use this between convolutional
/// capsule layers.
///
/// # Arguments
///
/// - `input`: ``[batch, channels, height, width]``.
///
/// # Returns
///
/// A ``[batch, channels, height, width]`` tensor.
pub fn squash_channels<B: Backend>(input: Tensor<B, 4>) -> Tensor<B, 4> {
    squash(input, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn vector_length(values: &[f32]) -> f32 {
        values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    #[test]
    fn test_squash_lengths_bounded() {
        let device = Default::default();

        let input: Tensor<B, 3> =
            Tensor::from_data([[[3.0, 4.0], [0.3, 0.4], [100.0, 0.0]]], &device);
        let output = squash(input, 2);

        let data = output.to_data();
        let values = data.as_slice::<f32>().unwrap();

        for capsule in values.chunks(2) {
            let length = vector_length(capsule);
            assert!(length < 1.0, "length {length} out of range");
        }

        // A long vector saturates toward unit length.
        assert!(vector_length(&values[4..6]) > 0.99);
        // A short vector is strongly suppressed.
        assert!(vector_length(&values[2..4]) < 0.25);
    }

    #[test]
    fn test_squash_preserves_direction() {
        let device = Default::default();

        let input: Tensor<B, 3> = Tensor::from_data([[[3.0, -4.0]]], &device);
        let output = squash(input, 2);

        let data = output.to_data();
        let values = data.as_slice::<f32>().unwrap();

        // 3-4-5 triangle; direction (0.6, -0.8).
        let length = vector_length(values);
        assert!((values[0] / length - 0.6).abs() < 1e-5);
        assert!((values[1] / length + 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_squash_zero_vector() {
        let device = Default::default();

        let input: Tensor<B, 3> = Tensor::zeros([2, 3, 4], &device);
        let output = squash(input, 2);

        output.to_data().assert_eq(
            &Tensor::<B, 3>::zeros([2, 3, 4], &device).to_data(),
            true,
        );
    }

    #[test]
    fn test_squash_channels_matches_permuted_squash() {
        let device = Default::default();

        let input: Tensor<B, 4> = Tensor::from_data(
            [[
                [[1.0, 2.0], [3.0, 4.0]],
                [[5.0, 6.0], [7.0, 8.0]],
                [[9.0, 10.0], [11.0, 12.0]],
            ]],
            &device,
        );

        let output = squash_channels(input.clone());

        // Reference: flatten space, put channels last, squash, restore.
        let [b, c, h, w] = input.dims();
        let expected = squash(
            input.reshape([b, c, h * w]).swap_dims(1, 2),
            2,
        )
        .swap_dims(1, 2)
        .reshape([b, c, h, w]);

        output.to_data().assert_approx_eq::<f32>(
            &expected.to_data(),
            burn::tensor::Tolerance::default(),
        );
    }
}
