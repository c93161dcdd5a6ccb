use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::vision::{Annotation, ImageDatasetItem, PixelDepth};
use burn::prelude::{Backend, Int, Tensor};
use burn::tensor::{ElementConversion, Shape, TensorData};

/// CIFAR-10 per-channel pixel mean.
pub const CIFAR_MEAN: [f32; 3] = [0.4914, 0.4822, 0.4465];

/// CIFAR-10 per-channel pixel std.
pub const CIFAR_STD: [f32; 3] = [0.2470, 0.2435, 0.2616];

/// Image side expected by the models.
pub const IMAGE_SIZE: usize = 32;

/// Normalizes image batches with the CIFAR-10 statistics.
#[derive(Clone, Debug)]
pub struct Normalizer<B: Backend> {
    pub mean: Tensor<B, 4>,
    pub std: Tensor<B, 4>,
}

impl<B: Backend> Normalizer<B> {
    pub fn new(device: &B::Device) -> Self {
        let mean = Tensor::<B, 1>::from_floats(CIFAR_MEAN, device).reshape([1, 3, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(CIFAR_STD, device).reshape([1, 3, 1, 1]);
        Self { mean, std }
    }

    pub fn normalize(
        &self,
        input: Tensor<B, 4>,
    ) -> Tensor<B, 4> {
        (input - self.mean.clone()) / self.std.clone()
    }
}

#[derive(Clone, Debug)]
pub struct ClassificationBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug, Default)]
pub struct ClassificationBatcher {}

impl ClassificationBatcher {
    pub fn new() -> Self {
        Self {}
    }
}

fn image_as_vec_u8(item: ImageDatasetItem) -> Vec<u8> {
    item.image
        .into_iter()
        .map(|p: PixelDepth| -> u8 { p.try_into().unwrap() })
        .collect()
}

impl<B: Backend> Batcher<B, ImageDatasetItem, ClassificationBatch<B>> for ClassificationBatcher {
    fn batch(
        &self,
        items: Vec<ImageDatasetItem>,
        device: &B::Device,
    ) -> ClassificationBatch<B> {
        let targets = items
            .iter()
            .map(|item| {
                if let Annotation::Label(y) = item.annotation {
                    Tensor::<B, 1, Int>::from_data(
                        TensorData::from([(y as i64).elem::<B::IntElem>()]),
                        device,
                    )
                } else {
                    panic!("Invalid annotation type: {:?}", item.annotation)
                }
            })
            .collect();

        let images = items
            .into_iter()
            .map(|item| {
                TensorData::new(
                    image_as_vec_u8(item),
                    Shape::new([IMAGE_SIZE, IMAGE_SIZE, 3]),
                )
            })
            .map(|data| {
                Tensor::<B, 3>::from_data(data.convert::<B::FloatElem>(), device)
                    // [H, W, C] -> [C, H, W]
                    .permute([2, 0, 1])
                    / 255.0
            })
            .collect();

        let images = Tensor::stack(images, 0);
        let targets = Tensor::cat(targets, 0);

        let images = Normalizer::new(device).normalize(images);

        ClassificationBatch { images, targets }
    }
}
