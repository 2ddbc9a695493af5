//! Saliency map normalization, mask resizing, and alpha compositing.

use burn::{prelude::*, tensor::DType};
use image::{
    imageops::{self, FilterType},
    GrayImage, RgbImage, RgbaImage,
};

use crate::{
    error::{ExtractError, ExtractResult},
    preprocess::SourceImage,
};

/// Range below which a saliency map is treated as uniform.
const UNIFORM_EPSILON: f32 = 1e-8;

/// Min-max normalizes the fused saliency map and converts it to a byte
/// mask at the map's own resolution.
///
/// A uniform map (max == min) carries no foreground signal; it yields a
/// fully opaque mask, so the source image survives intact instead of
/// propagating a division by zero into the alpha channel.
pub fn saliency_to_mask<B: Backend>(pred: Tensor<B, 4>) -> ExtractResult<GrayImage> {
    let [batch, channels, height, width] = pred.dims();
    if batch != 1 || channels != 1 {
        return Err(ExtractError::InvalidMapShape {
            expected: "[1, 1, H, W]".to_owned(),
            actual: format!("[{batch}, {channels}, {height}, {width}]"),
        });
    }

    let values = pred
        .into_data()
        .convert_dtype(DType::F32)
        .to_vec::<f32>()
        .map_err(|e| ExtractError::TensorConversion {
            reason: format!("{e:?}"),
        })?;

    GrayImage::from_raw(width as u32, height as u32, normalize_to_bytes(&values)).ok_or_else(
        || ExtractError::BufferCreation {
            reason: "saliency mask buffer".to_owned(),
        },
    )
}

/// `(v - min) / (max - min)` scaled to `0..=255` by truncation. Uniform
/// input maps to all-opaque.
fn normalize_to_bytes(values: &[f32]) -> Vec<u8> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    if !range.is_finite() || range < UNIFORM_EPSILON {
        return vec![u8::MAX; values.len()];
    }

    values
        .iter()
        .map(|v| ((v - min) / range * 255.0) as u8)
        .collect()
}

/// Resizes a byte mask to the target dimensions with the same Lanczos
/// filter family used during preprocessing. This resize is the main
/// source of edge antialiasing in the final cutout.
pub fn resize_mask(mask: &GrayImage, width: u32, height: u32) -> GrayImage {
    imageops::resize(mask, width, height, FilterType::Lanczos3)
}

/// Concatenates a mask as the alpha channel of the source pixels,
/// producing a fresh RGBA buffer. Neither input is mutated.
pub fn apply_alpha_mask(image: &RgbImage, mask: &GrayImage) -> ExtractResult<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(ExtractError::DimensionMismatch {
            image_width: image.width(),
            image_height: image.height(),
            mask_width: mask.width(),
            mask_height: mask.height(),
        });
    }

    let pixels = image
        .pixels()
        .zip(mask.pixels())
        .flat_map(|(rgb, alpha)| {
            let image::Rgb([red, green, blue]) = *rgb;
            let image::Luma([alpha]) = *alpha;
            [red, green, blue, alpha]
        })
        .collect();

    RgbaImage::from_raw(image.width(), image.height(), pixels).ok_or_else(|| {
        ExtractError::BufferCreation {
            reason: "RGBA result buffer".to_owned(),
        }
    })
}

/// Full postprocessing contract: normalize the fused map, resize it to the
/// source dimensions, and composite it onto the source RGB channels.
pub fn composite<B: Backend>(
    source: &SourceImage,
    pred: Tensor<B, 4>,
) -> ExtractResult<RgbaImage> {
    let mask = saliency_to_mask(pred)?;
    let mask = resize_mask(&mask, source.width(), source.height());
    apply_alpha_mask(source.pixels(), &mask)
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use image::{Luma, Rgb};

    use super::*;

    type TestBackend = NdArray;

    fn map_tensor(values: Vec<f32>, height: usize, width: usize) -> Tensor<TestBackend, 4> {
        Tensor::from_data(
            TensorData::new(values, [1, 1, height, width]),
            &Default::default(),
        )
    }

    #[test]
    fn saliency_to_mask_rescales_to_full_byte_range() {
        let mask = saliency_to_mask(map_tensor(vec![0.2, 0.4, 0.6, 0.8], 2, 2)).unwrap();

        assert_eq!(mask.get_pixel(0, 0), &Luma([0]));
        assert_eq!(mask.get_pixel(1, 1), &Luma([255]));
    }

    #[test]
    fn saliency_ordering_is_preserved() {
        let values = vec![0.9, 0.1, 0.5, 0.3, 0.7, 0.2, 0.8, 0.4, 0.6];
        let mask = saliency_to_mask(map_tensor(values.clone(), 3, 3)).unwrap();

        let bytes: Vec<u8> = mask.pixels().map(|p| p.0[0]).collect();
        for (i, a) in values.iter().enumerate() {
            for (j, b) in values.iter().enumerate() {
                if a < b {
                    assert!(bytes[i] <= bytes[j], "rank inversion at ({i}, {j})");
                }
            }
        }
    }

    #[test]
    fn uniform_map_yields_fully_opaque_mask() {
        let mask = saliency_to_mask(map_tensor(vec![0.5; 16], 4, 4)).unwrap();
        assert!(mask.pixels().all(|p| p.0[0] == u8::MAX));
    }

    #[test]
    fn saliency_to_mask_rejects_multi_channel_maps() {
        let pred: Tensor<TestBackend, 4> = Tensor::zeros([1, 3, 4, 4], &Default::default());
        assert!(matches!(
            saliency_to_mask(pred).unwrap_err(),
            ExtractError::InvalidMapShape { .. }
        ));
    }

    #[test]
    fn apply_alpha_mask_builds_rgba_from_rgb_and_mask() {
        let image = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let mask = GrayImage::from_pixel(3, 2, Luma([128]));

        let rgba = apply_alpha_mask(&image, &mask).unwrap();
        assert_eq!(rgba.dimensions(), (3, 2));
        assert_eq!(rgba.get_pixel(2, 1), &image::Rgba([10, 20, 30, 128]));
    }

    #[test]
    fn apply_alpha_mask_rejects_mismatched_dimensions() {
        let image = RgbImage::new(4, 4);
        let mask = GrayImage::new(2, 2);

        assert!(matches!(
            apply_alpha_mask(&image, &mask).unwrap_err(),
            ExtractError::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn composite_output_matches_source_dimensions() {
        let source = SourceImage::from_dynamic(&image::DynamicImage::ImageRgb8(
            RgbImage::from_pixel(50, 30, Rgb([1, 2, 3])),
        ));
        let pred = map_tensor((0..16).map(|i| i as f32 / 15.0).collect(), 4, 4);

        let rgba = composite(&source, pred).unwrap();
        assert_eq!(rgba.dimensions(), (50, 30));
    }
}
