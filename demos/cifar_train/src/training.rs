use crate::Args;
use crate::data::{ClassificationBatch, ClassificationBatcher};
use bcaps::models::capsnet::{CapsNet, CapsNetConfig, CapsNetMeta, MarginLossConfig};
use burn::config::Config;
use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::transform::ShuffledDataset;
use burn::data::dataset::vision::ImageFolderDataset;
use burn::module::Module;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::AdamConfig;
use burn::optim::decay::WeightDecayConfig;
use burn::prelude::{Backend, Int, Tensor};
use burn::record::CompactRecorder;
use burn::tensor::backend::AutodiffBackend;
use burn::train::metric::{AccuracyMetric, LossMetric};
use burn::train::{
    ClassificationOutput, LearnerBuilder, TrainOutput, TrainStep, ValidStep,
};
use std::time::Instant;

pub trait Classification<B: Backend> {
    fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B>;
}

impl<B: Backend> Classification<B> for CapsNet<B> {
    fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);

        // The baseline emits logits; the capsule variants emit
        // class-capsule lengths.
        let loss = if self.variant().is_baseline() {
            CrossEntropyLossConfig::new()
                .init(&output.device())
                .forward(output.clone(), targets.clone())
        } else {
            MarginLossConfig::new()
                .init()
                .forward(output.clone(), targets.clone())
        };

        ClassificationOutput::new(loss, output, targets)
    }
}

impl<B: AutodiffBackend> TrainStep<ClassificationBatch<B>, ClassificationOutput<B>>
    for CapsNet<B>
{
    fn step(
        &self,
        batch: ClassificationBatch<B>,
    ) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(batch.images, batch.targets);

        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<ClassificationBatch<B>, ClassificationOutput<B>> for CapsNet<B> {
    fn step(
        &self,
        batch: ClassificationBatch<B>,
    ) -> ClassificationOutput<B> {
        self.forward_classification(batch.images, batch.targets)
    }
}

#[derive(Config)]
pub struct TrainingConfig {
    #[config(default = 30)]
    pub num_epochs: usize,

    #[config(default = 128)]
    pub batch_size: usize,

    #[config(default = 4)]
    pub num_workers: usize,

    #[config(default = 42)]
    pub seed: u64,

    #[config(default = 1e-3)]
    pub learning_rate: f64,

    #[config(default = 5e-4)]
    pub weight_decay: f32,

    pub model: CapsNetConfig,
}

fn create_artifact_dir(artifact_dir: &str) {
    // Remove existing artifacts before to get an accurate learner summary
    std::fs::remove_dir_all(artifact_dir).ok();
    std::fs::create_dir_all(artifact_dir).ok();
}

pub fn train<B: AutodiffBackend>(
    args: &Args,
    device: &B::Device,
) -> anyhow::Result<()> {
    let artifact_dir = args.artifact_dir.as_str();
    create_artifact_dir(artifact_dir);

    let variant = args.variant.parse().map_err(anyhow::Error::msg)?;

    let model_config = CapsNetConfig::new(variant, args.num_classes)
        .with_depth(args.depth)
        .with_cap_n(args.cap_n);

    let config = TrainingConfig::new(model_config)
        .with_num_epochs(args.num_epochs)
        .with_batch_size(args.batch_size)
        .with_learning_rate(args.learning_rate)
        .with_seed(args.seed);

    config.save(format!("{artifact_dir}/config.json"))?;

    B::seed(config.seed);

    let optimizer = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(config.weight_decay)))
        .init();

    // Dataloaders
    let batcher_train = ClassificationBatcher::new();
    let batcher_valid = ClassificationBatcher::new();

    let train = ImageFolderDataset::new_classification(&args.training_root)
        .expect("Training dataset should load");
    let valid = ImageFolderDataset::new_classification(&args.validation_root)
        .expect("Validation dataset should load");

    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(ShuffledDataset::with_seed(train, config.seed));

    let dataloader_valid = DataLoaderBuilder::new(batcher_valid)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(valid);

    let model: CapsNet<B> = config.model.clone().init(device);

    // Learner config
    let learner = LearnerBuilder::new(artifact_dir)
        .metric_train_numeric(AccuracyMetric::new())
        .metric_valid_numeric(AccuracyMetric::new())
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .with_file_checkpointer(CompactRecorder::new())
        .devices(vec![device.clone()])
        .num_epochs(config.num_epochs)
        .summary()
        .build(model, optimizer, config.learning_rate);

    // Training
    let now = Instant::now();
    let model_trained = learner.fit(dataloader_train, dataloader_valid);
    let elapsed = now.elapsed().as_secs();
    println!("Training completed in {}m{}s", (elapsed / 60), elapsed % 60);

    model_trained
        .save_file(format!("{artifact_dir}/model"), &CompactRecorder::new())
        .expect("Trained model should be saved successfully");

    Ok(())
}
