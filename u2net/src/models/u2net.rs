//! The full U²-Net module: six encoder stages, five decoder stages, and
//! seven side outputs fused into the final saliency map.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::sigmoid,
};

use super::rsu::{
    upsample_like, Rsu4, Rsu4Config, Rsu4f, Rsu4fConfig, Rsu5, Rsu5Config, Rsu6, Rsu6Config, Rsu7,
    Rsu7Config,
};
use crate::config::{U2NetConfig, Variant};

fn side_conv<B: Backend>(in_channels: usize, out_channels: usize, device: &Device<B>) -> Conv2d<B> {
    Conv2dConfig::new([in_channels, out_channels], [3, 3])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

/// U²-Net salient object detection network.
///
/// `forward` returns seven sigmoid-activated single-channel maps at the
/// input resolution: the fused map first, then the six side outputs from
/// finest to coarsest. Inputs must have spatial dimensions divisible
/// by 32.
#[derive(Module, Debug)]
pub struct U2Net<B: Backend> {
    stage1: Rsu7<B>,
    stage2: Rsu6<B>,
    stage3: Rsu5<B>,
    stage4: Rsu4<B>,
    stage5: Rsu4f<B>,
    stage6: Rsu4f<B>,
    stage5d: Rsu4f<B>,
    stage4d: Rsu4<B>,
    stage3d: Rsu5<B>,
    stage2d: Rsu6<B>,
    stage1d: Rsu7<B>,
    side1: Conv2d<B>,
    side2: Conv2d<B>,
    side3: Conv2d<B>,
    side4: Conv2d<B>,
    side5: Conv2d<B>,
    side6: Conv2d<B>,
    outconv: Conv2d<B>,
    pool: MaxPool2d,
}

impl<B: Backend> U2Net<B> {
    pub(crate) fn new(config: &U2NetConfig, device: &Device<B>) -> Self {
        let (in_ch, out_ch) = (config.in_channels, config.out_channels);

        match config.variant {
            Variant::Full => Self {
                stage1: Rsu7Config::new(in_ch, 32, 64).init(device),
                stage2: Rsu6Config::new(64, 32, 128).init(device),
                stage3: Rsu5Config::new(128, 64, 256).init(device),
                stage4: Rsu4Config::new(256, 128, 512).init(device),
                stage5: Rsu4fConfig::new(512, 256, 512).init(device),
                stage6: Rsu4fConfig::new(512, 256, 512).init(device),
                stage5d: Rsu4fConfig::new(1024, 256, 512).init(device),
                stage4d: Rsu4Config::new(1024, 128, 256).init(device),
                stage3d: Rsu5Config::new(512, 64, 128).init(device),
                stage2d: Rsu6Config::new(256, 32, 64).init(device),
                stage1d: Rsu7Config::new(128, 16, 64).init(device),
                side1: side_conv(64, out_ch, device),
                side2: side_conv(64, out_ch, device),
                side3: side_conv(128, out_ch, device),
                side4: side_conv(256, out_ch, device),
                side5: side_conv(512, out_ch, device),
                side6: side_conv(512, out_ch, device),
                outconv: Conv2dConfig::new([6 * out_ch, out_ch], [1, 1]).init(device),
                pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            },
            Variant::Lite => Self {
                stage1: Rsu7Config::new(in_ch, 16, 64).init(device),
                stage2: Rsu6Config::new(64, 16, 64).init(device),
                stage3: Rsu5Config::new(64, 16, 64).init(device),
                stage4: Rsu4Config::new(64, 16, 64).init(device),
                stage5: Rsu4fConfig::new(64, 16, 64).init(device),
                stage6: Rsu4fConfig::new(64, 16, 64).init(device),
                stage5d: Rsu4fConfig::new(128, 16, 64).init(device),
                stage4d: Rsu4Config::new(128, 16, 64).init(device),
                stage3d: Rsu5Config::new(128, 16, 64).init(device),
                stage2d: Rsu6Config::new(128, 16, 64).init(device),
                stage1d: Rsu7Config::new(128, 16, 64).init(device),
                side1: side_conv(64, out_ch, device),
                side2: side_conv(64, out_ch, device),
                side3: side_conv(64, out_ch, device),
                side4: side_conv(64, out_ch, device),
                side5: side_conv(64, out_ch, device),
                side6: side_conv(64, out_ch, device),
                outconv: Conv2dConfig::new([6 * out_ch, out_ch], [1, 1]).init(device),
                pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            },
        }
    }

    /// Runs the forward pass, returning the fused map followed by the six
    /// side outputs. All maps are sigmoid-activated and upsampled to the
    /// input resolution.
    pub fn forward(&self, x: Tensor<B, 4>) -> [Tensor<B, 4>; 7] {
        let hx1 = self.stage1.forward(x);
        let hx2 = self.stage2.forward(self.pool.forward(hx1.clone()));
        let hx3 = self.stage3.forward(self.pool.forward(hx2.clone()));
        let hx4 = self.stage4.forward(self.pool.forward(hx3.clone()));
        let hx5 = self.stage5.forward(self.pool.forward(hx4.clone()));
        let hx6 = self.stage6.forward(self.pool.forward(hx5.clone()));
        let hx6up = upsample_like(hx6.clone(), &hx5);

        let hx5d = self.stage5d.forward(Tensor::cat(vec![hx6up, hx5], 1));
        let hx5dup = upsample_like(hx5d.clone(), &hx4);
        let hx4d = self.stage4d.forward(Tensor::cat(vec![hx5dup, hx4], 1));
        let hx4dup = upsample_like(hx4d.clone(), &hx3);
        let hx3d = self.stage3d.forward(Tensor::cat(vec![hx4dup, hx3], 1));
        let hx3dup = upsample_like(hx3d.clone(), &hx2);
        let hx2d = self.stage2d.forward(Tensor::cat(vec![hx3dup, hx2], 1));
        let hx2dup = upsample_like(hx2d.clone(), &hx1);
        let hx1d = self.stage1d.forward(Tensor::cat(vec![hx2dup, hx1], 1));

        let d1 = self.side1.forward(hx1d);
        let d2 = upsample_like(self.side2.forward(hx2d), &d1);
        let d3 = upsample_like(self.side3.forward(hx3d), &d1);
        let d4 = upsample_like(self.side4.forward(hx4d), &d1);
        let d5 = upsample_like(self.side5.forward(hx5d), &d1);
        let d6 = upsample_like(self.side6.forward(hx6), &d1);

        let d0 = self.outconv.forward(Tensor::cat(
            vec![
                d1.clone(),
                d2.clone(),
                d3.clone(),
                d4.clone(),
                d5.clone(),
                d6.clone(),
            ],
            1,
        ));

        [
            sigmoid(d0),
            sigmoid(d1),
            sigmoid(d2),
            sigmoid(d3),
            sigmoid(d4),
            sigmoid(d5),
            sigmoid(d6),
        ]
    }
}
