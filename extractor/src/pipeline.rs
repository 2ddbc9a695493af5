//! The straight-line extraction pipeline: decode → resize/normalize →
//! forward pass → mask normalization → alpha compositing.

use std::io::Cursor;

use burn::prelude::*;
use image::{ImageFormat, RgbaImage};

use crate::{
    error::{ExtractError, ExtractResult},
    model::SalientObjectModel,
    postprocess,
    preprocess::{Normalizer, SourceImage},
};

/// Background extraction pipeline around a salient-object model.
///
/// One instance is built at startup and shared read-only across requests;
/// `extract` never mutates the model or the source image.
pub struct BackgroundExtractor<B: Backend> {
    model: Box<dyn SalientObjectModel<B> + Send + Sync>,
    normalizer: Normalizer<B>,
    device: B::Device,
}

impl<B: Backend> BackgroundExtractor<B> {
    pub fn new(model: Box<dyn SalientObjectModel<B> + Send + Sync>, device: B::Device) -> Self {
        let normalizer = Normalizer::new(&device);
        Self {
            model,
            normalizer,
            device,
        }
    }

    /// Removes the background from raw upload bytes, returning an RGBA
    /// result at the original image dimensions.
    pub fn extract(&self, bytes: &[u8]) -> ExtractResult<RgbaImage> {
        let source = SourceImage::decode(bytes)?;
        self.extract_source(&source)
    }

    /// Runs the pipeline on an already-decoded source image.
    pub fn extract_source(&self, source: &SourceImage) -> ExtractResult<RgbaImage> {
        let input = self.normalizer.normalize(source.to_tensor(&self.device));
        let [fused, ..] = self.model.predict(input);
        postprocess::composite(source, fused)
    }
}

/// Encodes an RGBA result as PNG. The format is a hard requirement: any
/// lossy encoding would destroy the alpha channel.
pub fn encode_png(image: &RgbaImage) -> ExtractResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| ExtractError::PngEncode { source })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::preprocess::INFERENCE_SIZE;

    type TestBackend = NdArray;

    /// Marks the centered half-size square as salient, everything else as
    /// background.
    struct CenterSquareModel;

    impl SalientObjectModel<TestBackend> for CenterSquareModel {
        fn predict(&self, input: Tensor<TestBackend, 4>) -> [Tensor<TestBackend, 4>; 7] {
            let [_, _, height, width] = input.dims();
            let mut values = vec![0.0_f32; height * width];
            for y in height / 4..height * 3 / 4 {
                for x in width / 4..width * 3 / 4 {
                    values[y * width + x] = 1.0;
                }
            }
            let map: Tensor<TestBackend, 4> = Tensor::from_data(
                TensorData::new(values, [1, 1, height, width]),
                &Default::default(),
            );
            std::array::from_fn(|_| map.clone())
        }
    }

    fn extractor() -> BackgroundExtractor<TestBackend> {
        BackgroundExtractor::new(Box::new(CenterSquareModel), Default::default())
    }

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn result_keeps_original_dimensions_and_rgb_content() {
        let source = RgbImage::from_pixel(500, 300, Rgb([90, 60, 30]));
        let rgba = extractor().extract(&png_bytes(&source)).unwrap();

        assert_eq!(rgba.dimensions(), (500, 300));
        let pixel = rgba.get_pixel(250, 150);
        assert_eq!([pixel.0[0], pixel.0[1], pixel.0[2]], [90, 60, 30]);
    }

    #[test]
    fn foreground_is_opaque_and_background_transparent() {
        let source = RgbImage::from_pixel(500, 300, Rgb([128, 128, 128]));
        let mut jpeg = Vec::new();
        source
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let rgba = extractor().extract(&jpeg).unwrap();

        // Deep inside the salient square and far outside it; the Lanczos
        // resize only softens a narrow band at the boundary.
        assert_eq!(rgba.dimensions(), (500, 300));
        assert!(rgba.get_pixel(250, 150).0[3] > 250);
        assert!(rgba.get_pixel(10, 10).0[3] < 5);
    }

    #[test]
    fn grayscale_input_is_flattened_to_rgb_content() {
        let gray = image::GrayImage::from_pixel(60, 40, image::Luma([140]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let rgba = extractor().extract(&bytes).unwrap();

        assert_eq!(rgba.dimensions(), (60, 40));
        let pixel = rgba.get_pixel(30, 20);
        assert_eq!([pixel.0[0], pixel.0[1], pixel.0[2]], [140, 140, 140]);
    }

    #[test]
    fn undecodable_bytes_are_a_client_error() {
        let err = extractor().extract(b"not an image").unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let source = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8, y as u8, (x ^ y) as u8]));
        let rgba = extractor().extract(&png_bytes(&source)).unwrap();

        let encoded = encode_png(&rgba).unwrap();
        let decoded = image::load_from_memory(&encoded).unwrap().to_rgba8();
        assert_eq!(decoded, rgba);
    }

    #[test]
    fn stub_model_sees_inference_resolution() {
        struct ShapeAssertingModel;

        impl SalientObjectModel<TestBackend> for ShapeAssertingModel {
            fn predict(&self, input: Tensor<TestBackend, 4>) -> [Tensor<TestBackend, 4>; 7] {
                let size = INFERENCE_SIZE as usize;
                assert_eq!(input.dims(), [1, 3, size, size]);
                let map: Tensor<TestBackend, 4> =
                    Tensor::zeros([1, 1, size, size], &Default::default());
                std::array::from_fn(|_| map.clone())
            }
        }

        let pipeline =
            BackgroundExtractor::new(Box::new(ShapeAssertingModel), Default::default());
        let source = RgbImage::from_pixel(123, 77, Rgb([5, 5, 5]));
        let rgba = pipeline.extract(&png_bytes(&source)).unwrap();

        // A uniform (all-zero) map is degenerate: alpha stays fully opaque.
        assert_eq!(rgba.dimensions(), (123, 77));
        assert!(rgba.pixels().all(|p| p.0[3] == u8::MAX));
    }
}
