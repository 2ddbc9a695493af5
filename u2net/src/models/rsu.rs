//! Residual U-blocks (RSU), the building blocks of U²-Net.
//!
//! Each `RsuN` block is a small U-Net of depth `N`: an input convolution,
//! an encoder path with 2×2 max pooling, a dilated bottleneck, and a
//! decoder path that upsamples and fuses encoder features, closed by a
//! residual connection. `Rsu4f` replaces pooling with dilation so it can
//! operate on the deepest, smallest feature maps.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::{
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

/// Bilinearly resizes `src` to the spatial size of `target`.
pub(crate) fn upsample_like<B: Backend>(src: Tensor<B, 4>, target: &Tensor<B, 4>) -> Tensor<B, 4> {
    let [_, _, h, w] = target.dims();
    interpolate(src, [h, w], InterpolateOptions::new(InterpolateMode::Bilinear))
}

fn pool2x2() -> MaxPool2d {
    MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init()
}

/// Configuration for the `RebnConv` block.
#[derive(Config, Debug)]
pub struct RebnConvConfig {
    in_channels: usize,
    out_channels: usize,
    #[config(default = "1")]
    dilation: usize,
}

impl RebnConvConfig {
    /// Initializes a `RebnConv` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> RebnConv<B> {
        let conv_s1 = Conv2dConfig::new([self.in_channels, self.out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(self.dilation, self.dilation))
            .with_dilation([self.dilation, self.dilation])
            .init(device);
        let bn_s1 = BatchNormConfig::new(self.out_channels).init(device);

        RebnConv {
            conv_s1,
            bn_s1,
            relu_s1: Relu::new(),
        }
    }
}

/// Convolution → batch norm → ReLU, the atomic unit of every RSU block.
#[derive(Module, Debug)]
pub struct RebnConv<B: Backend> {
    conv_s1: Conv2d<B>,
    bn_s1: BatchNorm<B, 2>,
    relu_s1: Relu,
}

impl<B: Backend> RebnConv<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.relu_s1
            .forward(self.bn_s1.forward(self.conv_s1.forward(x)))
    }
}

/// Configuration for the depth-7 residual U-block.
#[derive(Config, Debug)]
pub struct Rsu7Config {
    in_channels: usize,
    mid_channels: usize,
    out_channels: usize,
}

impl Rsu7Config {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Rsu7<B> {
        let mid = self.mid_channels;
        Rsu7 {
            rebnconvin: RebnConvConfig::new(self.in_channels, self.out_channels).init(device),
            rebnconv1: RebnConvConfig::new(self.out_channels, mid).init(device),
            rebnconv2: RebnConvConfig::new(mid, mid).init(device),
            rebnconv3: RebnConvConfig::new(mid, mid).init(device),
            rebnconv4: RebnConvConfig::new(mid, mid).init(device),
            rebnconv5: RebnConvConfig::new(mid, mid).init(device),
            rebnconv6: RebnConvConfig::new(mid, mid).init(device),
            rebnconv7: RebnConvConfig::new(mid, mid).with_dilation(2).init(device),
            rebnconv6d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv5d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv4d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv3d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv2d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv1d: RebnConvConfig::new(mid * 2, self.out_channels).init(device),
            pool: pool2x2(),
        }
    }
}

#[derive(Module, Debug)]
pub struct Rsu7<B: Backend> {
    rebnconvin: RebnConv<B>,
    rebnconv1: RebnConv<B>,
    rebnconv2: RebnConv<B>,
    rebnconv3: RebnConv<B>,
    rebnconv4: RebnConv<B>,
    rebnconv5: RebnConv<B>,
    rebnconv6: RebnConv<B>,
    rebnconv7: RebnConv<B>,
    rebnconv6d: RebnConv<B>,
    rebnconv5d: RebnConv<B>,
    rebnconv4d: RebnConv<B>,
    rebnconv3d: RebnConv<B>,
    rebnconv2d: RebnConv<B>,
    rebnconv1d: RebnConv<B>,
    pool: MaxPool2d,
}

impl<B: Backend> Rsu7<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let hxin = self.rebnconvin.forward(x);

        let hx1 = self.rebnconv1.forward(hxin.clone());
        let hx2 = self.rebnconv2.forward(self.pool.forward(hx1.clone()));
        let hx3 = self.rebnconv3.forward(self.pool.forward(hx2.clone()));
        let hx4 = self.rebnconv4.forward(self.pool.forward(hx3.clone()));
        let hx5 = self.rebnconv5.forward(self.pool.forward(hx4.clone()));
        let hx6 = self.rebnconv6.forward(self.pool.forward(hx5.clone()));
        let hx7 = self.rebnconv7.forward(hx6.clone());

        let hx6d = self.rebnconv6d.forward(Tensor::cat(vec![hx7, hx6], 1));
        let hx6dup = upsample_like(hx6d, &hx5);
        let hx5d = self.rebnconv5d.forward(Tensor::cat(vec![hx6dup, hx5], 1));
        let hx5dup = upsample_like(hx5d, &hx4);
        let hx4d = self.rebnconv4d.forward(Tensor::cat(vec![hx5dup, hx4], 1));
        let hx4dup = upsample_like(hx4d, &hx3);
        let hx3d = self.rebnconv3d.forward(Tensor::cat(vec![hx4dup, hx3], 1));
        let hx3dup = upsample_like(hx3d, &hx2);
        let hx2d = self.rebnconv2d.forward(Tensor::cat(vec![hx3dup, hx2], 1));
        let hx2dup = upsample_like(hx2d, &hx1);
        let hx1d = self.rebnconv1d.forward(Tensor::cat(vec![hx2dup, hx1], 1));

        hx1d + hxin
    }
}

/// Configuration for the depth-6 residual U-block.
#[derive(Config, Debug)]
pub struct Rsu6Config {
    in_channels: usize,
    mid_channels: usize,
    out_channels: usize,
}

impl Rsu6Config {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Rsu6<B> {
        let mid = self.mid_channels;
        Rsu6 {
            rebnconvin: RebnConvConfig::new(self.in_channels, self.out_channels).init(device),
            rebnconv1: RebnConvConfig::new(self.out_channels, mid).init(device),
            rebnconv2: RebnConvConfig::new(mid, mid).init(device),
            rebnconv3: RebnConvConfig::new(mid, mid).init(device),
            rebnconv4: RebnConvConfig::new(mid, mid).init(device),
            rebnconv5: RebnConvConfig::new(mid, mid).init(device),
            rebnconv6: RebnConvConfig::new(mid, mid).with_dilation(2).init(device),
            rebnconv5d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv4d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv3d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv2d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv1d: RebnConvConfig::new(mid * 2, self.out_channels).init(device),
            pool: pool2x2(),
        }
    }
}

#[derive(Module, Debug)]
pub struct Rsu6<B: Backend> {
    rebnconvin: RebnConv<B>,
    rebnconv1: RebnConv<B>,
    rebnconv2: RebnConv<B>,
    rebnconv3: RebnConv<B>,
    rebnconv4: RebnConv<B>,
    rebnconv5: RebnConv<B>,
    rebnconv6: RebnConv<B>,
    rebnconv5d: RebnConv<B>,
    rebnconv4d: RebnConv<B>,
    rebnconv3d: RebnConv<B>,
    rebnconv2d: RebnConv<B>,
    rebnconv1d: RebnConv<B>,
    pool: MaxPool2d,
}

impl<B: Backend> Rsu6<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let hxin = self.rebnconvin.forward(x);

        let hx1 = self.rebnconv1.forward(hxin.clone());
        let hx2 = self.rebnconv2.forward(self.pool.forward(hx1.clone()));
        let hx3 = self.rebnconv3.forward(self.pool.forward(hx2.clone()));
        let hx4 = self.rebnconv4.forward(self.pool.forward(hx3.clone()));
        let hx5 = self.rebnconv5.forward(self.pool.forward(hx4.clone()));
        let hx6 = self.rebnconv6.forward(hx5.clone());

        let hx5d = self.rebnconv5d.forward(Tensor::cat(vec![hx6, hx5], 1));
        let hx5dup = upsample_like(hx5d, &hx4);
        let hx4d = self.rebnconv4d.forward(Tensor::cat(vec![hx5dup, hx4], 1));
        let hx4dup = upsample_like(hx4d, &hx3);
        let hx3d = self.rebnconv3d.forward(Tensor::cat(vec![hx4dup, hx3], 1));
        let hx3dup = upsample_like(hx3d, &hx2);
        let hx2d = self.rebnconv2d.forward(Tensor::cat(vec![hx3dup, hx2], 1));
        let hx2dup = upsample_like(hx2d, &hx1);
        let hx1d = self.rebnconv1d.forward(Tensor::cat(vec![hx2dup, hx1], 1));

        hx1d + hxin
    }
}

/// Configuration for the depth-5 residual U-block.
#[derive(Config, Debug)]
pub struct Rsu5Config {
    in_channels: usize,
    mid_channels: usize,
    out_channels: usize,
}

impl Rsu5Config {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Rsu5<B> {
        let mid = self.mid_channels;
        Rsu5 {
            rebnconvin: RebnConvConfig::new(self.in_channels, self.out_channels).init(device),
            rebnconv1: RebnConvConfig::new(self.out_channels, mid).init(device),
            rebnconv2: RebnConvConfig::new(mid, mid).init(device),
            rebnconv3: RebnConvConfig::new(mid, mid).init(device),
            rebnconv4: RebnConvConfig::new(mid, mid).init(device),
            rebnconv5: RebnConvConfig::new(mid, mid).with_dilation(2).init(device),
            rebnconv4d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv3d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv2d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv1d: RebnConvConfig::new(mid * 2, self.out_channels).init(device),
            pool: pool2x2(),
        }
    }
}

#[derive(Module, Debug)]
pub struct Rsu5<B: Backend> {
    rebnconvin: RebnConv<B>,
    rebnconv1: RebnConv<B>,
    rebnconv2: RebnConv<B>,
    rebnconv3: RebnConv<B>,
    rebnconv4: RebnConv<B>,
    rebnconv5: RebnConv<B>,
    rebnconv4d: RebnConv<B>,
    rebnconv3d: RebnConv<B>,
    rebnconv2d: RebnConv<B>,
    rebnconv1d: RebnConv<B>,
    pool: MaxPool2d,
}

impl<B: Backend> Rsu5<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let hxin = self.rebnconvin.forward(x);

        let hx1 = self.rebnconv1.forward(hxin.clone());
        let hx2 = self.rebnconv2.forward(self.pool.forward(hx1.clone()));
        let hx3 = self.rebnconv3.forward(self.pool.forward(hx2.clone()));
        let hx4 = self.rebnconv4.forward(self.pool.forward(hx3.clone()));
        let hx5 = self.rebnconv5.forward(hx4.clone());

        let hx4d = self.rebnconv4d.forward(Tensor::cat(vec![hx5, hx4], 1));
        let hx4dup = upsample_like(hx4d, &hx3);
        let hx3d = self.rebnconv3d.forward(Tensor::cat(vec![hx4dup, hx3], 1));
        let hx3dup = upsample_like(hx3d, &hx2);
        let hx2d = self.rebnconv2d.forward(Tensor::cat(vec![hx3dup, hx2], 1));
        let hx2dup = upsample_like(hx2d, &hx1);
        let hx1d = self.rebnconv1d.forward(Tensor::cat(vec![hx2dup, hx1], 1));

        hx1d + hxin
    }
}

/// Configuration for the depth-4 residual U-block.
#[derive(Config, Debug)]
pub struct Rsu4Config {
    in_channels: usize,
    mid_channels: usize,
    out_channels: usize,
}

impl Rsu4Config {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Rsu4<B> {
        let mid = self.mid_channels;
        Rsu4 {
            rebnconvin: RebnConvConfig::new(self.in_channels, self.out_channels).init(device),
            rebnconv1: RebnConvConfig::new(self.out_channels, mid).init(device),
            rebnconv2: RebnConvConfig::new(mid, mid).init(device),
            rebnconv3: RebnConvConfig::new(mid, mid).init(device),
            rebnconv4: RebnConvConfig::new(mid, mid).with_dilation(2).init(device),
            rebnconv3d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv2d: RebnConvConfig::new(mid * 2, mid).init(device),
            rebnconv1d: RebnConvConfig::new(mid * 2, self.out_channels).init(device),
            pool: pool2x2(),
        }
    }
}

#[derive(Module, Debug)]
pub struct Rsu4<B: Backend> {
    rebnconvin: RebnConv<B>,
    rebnconv1: RebnConv<B>,
    rebnconv2: RebnConv<B>,
    rebnconv3: RebnConv<B>,
    rebnconv4: RebnConv<B>,
    rebnconv3d: RebnConv<B>,
    rebnconv2d: RebnConv<B>,
    rebnconv1d: RebnConv<B>,
    pool: MaxPool2d,
}

impl<B: Backend> Rsu4<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let hxin = self.rebnconvin.forward(x);

        let hx1 = self.rebnconv1.forward(hxin.clone());
        let hx2 = self.rebnconv2.forward(self.pool.forward(hx1.clone()));
        let hx3 = self.rebnconv3.forward(self.pool.forward(hx2.clone()));
        let hx4 = self.rebnconv4.forward(hx3.clone());

        let hx3d = self.rebnconv3d.forward(Tensor::cat(vec![hx4, hx3], 1));
        let hx3dup = upsample_like(hx3d, &hx2);
        let hx2d = self.rebnconv2d.forward(Tensor::cat(vec![hx3dup, hx2], 1));
        let hx2dup = upsample_like(hx2d, &hx1);
        let hx1d = self.rebnconv1d.forward(Tensor::cat(vec![hx2dup, hx1], 1));

        hx1d + hxin
    }
}

/// Configuration for the dilation-only residual U-block.
#[derive(Config, Debug)]
pub struct Rsu4fConfig {
    in_channels: usize,
    mid_channels: usize,
    out_channels: usize,
}

impl Rsu4fConfig {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Rsu4f<B> {
        let mid = self.mid_channels;
        Rsu4f {
            rebnconvin: RebnConvConfig::new(self.in_channels, self.out_channels).init(device),
            rebnconv1: RebnConvConfig::new(self.out_channels, mid).init(device),
            rebnconv2: RebnConvConfig::new(mid, mid).with_dilation(2).init(device),
            rebnconv3: RebnConvConfig::new(mid, mid).with_dilation(4).init(device),
            rebnconv4: RebnConvConfig::new(mid, mid).with_dilation(8).init(device),
            rebnconv3d: RebnConvConfig::new(mid * 2, mid).with_dilation(4).init(device),
            rebnconv2d: RebnConvConfig::new(mid * 2, mid).with_dilation(2).init(device),
            rebnconv1d: RebnConvConfig::new(mid * 2, self.out_channels).init(device),
        }
    }
}

/// Depth-4 block where pooling is replaced by growing dilation rates, used
/// at the deepest stages where feature maps are too small to pool.
#[derive(Module, Debug)]
pub struct Rsu4f<B: Backend> {
    rebnconvin: RebnConv<B>,
    rebnconv1: RebnConv<B>,
    rebnconv2: RebnConv<B>,
    rebnconv3: RebnConv<B>,
    rebnconv4: RebnConv<B>,
    rebnconv3d: RebnConv<B>,
    rebnconv2d: RebnConv<B>,
    rebnconv1d: RebnConv<B>,
}

impl<B: Backend> Rsu4f<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let hxin = self.rebnconvin.forward(x);

        let hx1 = self.rebnconv1.forward(hxin.clone());
        let hx2 = self.rebnconv2.forward(hx1.clone());
        let hx3 = self.rebnconv3.forward(hx2.clone());
        let hx4 = self.rebnconv4.forward(hx3.clone());

        let hx3d = self.rebnconv3d.forward(Tensor::cat(vec![hx4, hx3], 1));
        let hx2d = self.rebnconv2d.forward(Tensor::cat(vec![hx3d, hx2], 1));
        let hx1d = self.rebnconv1d.forward(Tensor::cat(vec![hx2d, hx1], 1));

        hx1d + hxin
    }
}
