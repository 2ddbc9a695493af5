//! Decoding, color conversion, resizing, and normalization of input
//! images into network-ready tensors.

use burn::prelude::*;
use image::{
    imageops::{self, FilterType},
    DynamicImage, RgbImage,
};

use crate::error::{ExtractError, ExtractResult};

/// Square resolution the network expects.
pub const INFERENCE_SIZE: u32 = 320;

/// ImageNet channel means. The published checkpoints were trained with
/// these exact statistics; mask quality degrades if they drift.
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations.
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A decoded, color-converted input image retaining its original
/// dimensions for the final mask rescale. Immutable once built.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbImage,
}

impl SourceImage {
    /// Decodes raw upload bytes. Undecodable data is a client-input error.
    pub fn decode(bytes: &[u8]) -> ExtractResult<Self> {
        let decoded =
            image::load_from_memory(bytes).map_err(|source| ExtractError::Decode { source })?;
        Ok(Self::from_dynamic(&decoded))
    }

    /// Converts an already-decoded image, flattening alpha, grayscale,
    /// and palette modes to 3-channel RGB.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            pixels: image.to_rgb8(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// The color-converted pixel buffer.
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Resizes to the inference resolution and converts to a
    /// `[1, 3, 320, 320]` tensor with values in `[0, 1]`.
    ///
    /// Aspect ratio is deliberately not preserved; the network is trained
    /// on squashed squares.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        let resized = imageops::resize(
            &self.pixels,
            INFERENCE_SIZE,
            INFERENCE_SIZE,
            FilterType::Lanczos3,
        );

        let data: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|byte| f32::from(byte) / 255.0)
            .collect();
        let data = TensorData::new(
            data,
            [INFERENCE_SIZE as usize, INFERENCE_SIZE as usize, 3],
        )
        .convert::<B::FloatElem>();

        Tensor::from_data(data, device).permute([2, 0, 1]).unsqueeze::<4>()
    }
}

/// Channelwise `(x - mean) / std` normalization applied after `[0, 1]`
/// scaling.
pub struct Normalizer<B: Backend> {
    mean: Tensor<B, 4>,
    std: Tensor<B, 4>,
}

impl<B: Backend> Normalizer<B> {
    pub fn new(device: &B::Device) -> Self {
        let mean = Tensor::<B, 1>::from_floats(MEAN, device).reshape([1, 3, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(STD, device).reshape([1, 3, 1, 1]);
        Self { mean, std }
    }

    pub fn normalize(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        (input - self.mean.clone()) / self.std.clone()
    }
}
