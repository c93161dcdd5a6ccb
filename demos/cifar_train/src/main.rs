#![recursion_limit = "256"]
//! Train a capsule-network variant (or the residual baseline) on a
//! CIFAR-style image-folder dataset.
//!
//! ```text
//! cifar_train --variant v4_4 \
//!     --training-root data/cifar10/train \
//!     --validation-root data/cifar10/test
//! ```

mod data;
mod training;

use burn::backend::Autodiff;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Architecture variant tag (v_base, v0, v1 .. v5_2).
    #[arg(long, default_value = "v_base")]
    pub variant: String,

    /// Number of classes in the dataset.
    #[arg(long, default_value_t = 10)]
    pub num_classes: usize,

    /// Residual depth; must be 6n+2.
    #[arg(long, default_value_t = 20)]
    pub depth: usize,

    /// Capsule-body passes per forward.
    #[arg(long, default_value_t = 3)]
    pub cap_n: usize,

    /// Random seed for reproducibility.
    #[arg(short, long, default_value_t = 42)]
    pub seed: u64,

    /// Batch size for processing.
    #[arg(short, long, default_value_t = 128)]
    pub batch_size: usize,

    /// Number of epochs to train the model.
    #[arg(long, default_value_t = 30)]
    pub num_epochs: usize,

    /// Learning rate for the optimizer.
    #[arg(long, default_value_t = 1e-3)]
    pub learning_rate: f64,

    /// Directory to save the artifacts.
    #[arg(long, default_value = "/tmp/cifar_train")]
    pub artifact_dir: String,

    /// Root directory of the training dataset.
    #[arg(long)]
    pub training_root: String,

    /// Root directory of the validation dataset.
    #[arg(long)]
    pub validation_root: String,
}

#[cfg(feature = "cuda")]
type B = Autodiff<burn::backend::Cuda>;

#[cfg(all(feature = "wgpu", not(feature = "cuda")))]
type B = Autodiff<burn::backend::Wgpu>;

#[cfg(not(any(feature = "cuda", feature = "wgpu")))]
type B = Autodiff<burn::backend::NdArray>;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let device = Default::default();
    training::train::<B>(&args, &device)
}
