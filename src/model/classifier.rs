//! Waste Classifier Model
//!
//! A small convolutional backbone with a single-logit sigmoid head for the
//! binary organik/anorganik decision. The backbone is four conv/pool stages
//! followed by global average pooling; during transfer-style training the
//! backbone output is detached so only the head receives gradients.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::*;
use burn::tensor::activation;

use crate::model::config::ModelConfig;

/// One backbone stage: 3x3 same-padded convolution, ReLU, 2x2 max pool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = activation::relu(x);
        self.pool.forward(x)
    }
}

/// Binary waste classifier: conv backbone, global average pool, sigmoid head
#[derive(Module, Debug)]
pub struct WasteClassifier<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,
    pub global_pool: AdaptiveAvgPool2d,
    pub dropout: Dropout,
    pub head: Linear<B>,
}

impl<B: Backend> WasteClassifier<B> {
    /// Initialize a new model from its configuration
    pub fn new(config: &ModelConfig, device: &B::Device) -> Self {
        let f = config.base_filters;

        Self {
            conv1: ConvBlock::new(config.in_channels, f, device),
            conv2: ConvBlock::new(f, f * 2, device),
            conv3: ConvBlock::new(f * 2, f * 4, device),
            conv4: ConvBlock::new(f * 4, f * 8, device),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout: DropoutConfig::new(config.dropout_rate).init(),
            head: LinearConfig::new(f * 8, 1).init(device),
        }
    }

    /// Run the convolutional backbone and return pooled features [batch, features]
    pub fn features(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(images);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        let x = self.global_pool.forward(x);
        let [batch, channels, _, _] = x.dims();
        x.reshape([batch, channels])
    }

    /// Run the classification head on pooled features, returning raw logits [batch]
    pub fn classify(&self, features: Tensor<B, 2>) -> Tensor<B, 1> {
        let x = self.dropout.forward(features);
        let x = self.head.forward(x);
        x.squeeze::<1>(1)
    }

    /// Full forward pass: images to logits [batch]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        let features = self.features(images);
        self.classify(features)
    }

    /// Forward pass returning sigmoid scores in [0, 1], the probability of
    /// class 1 (anorganik)
    pub fn forward_score(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        activation::sigmoid(self.forward(images))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_forward_shapes() {
        let device = Default::default();
        let config = ModelConfig {
            image_size: 32,
            in_channels: 3,
            base_filters: 4,
            dropout_rate: 0.2,
        };
        let model = WasteClassifier::<TestBackend>::new(&config, &device);

        let images = Tensor::zeros([2, 3, 32, 32], &device);
        let features = model.features(images.clone());
        assert_eq!(features.dims(), [2, 32]);

        let logits = model.forward(images);
        assert_eq!(logits.dims(), [2]);
    }

    #[test]
    fn test_scores_in_unit_interval() {
        let device = Default::default();
        let config = ModelConfig {
            image_size: 32,
            in_channels: 3,
            base_filters: 4,
            dropout_rate: 0.2,
        };
        let model = WasteClassifier::<TestBackend>::new(&config, &device);

        let images = Tensor::random(
            [4, 3, 32, 32],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let scores: Vec<f32> = model
            .forward_score(images)
            .into_data()
            .to_vec()
            .unwrap();

        assert_eq!(scores.len(), 4);
        assert!(scores.iter().all(|&s| (0.0..=1.0).contains(&s)));
    }
}
