use burn::prelude::*;

use crate::models::U2Net;

/// Published U²-Net checkpoint variants.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum Variant {
    /// The full-size network (`u2net.pth`, ~176 MB).
    Full,
    /// The lightweight network (`u2netp.pth`, ~4.7 MB).
    Lite,
}

/// Configuration for the `U2Net` module.
///
/// Field names of the initialized module mirror the upstream PyTorch
/// state dict (`stage1.rebnconvin.conv_s1.weight`, ...), so published
/// checkpoints load without key remapping.
#[derive(Config, Debug)]
pub struct U2NetConfig {
    /// Number of input channels.
    #[config(default = "3")]
    pub in_channels: usize,
    /// Number of output channels per saliency map.
    #[config(default = "1")]
    pub out_channels: usize,
    /// Which channel layout to build.
    #[config(default = "Variant::Full")]
    pub variant: Variant,
}

impl U2NetConfig {
    /// Initializes a `U2Net` module with the configured channel layout.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> U2Net<B> {
        U2Net::new(self, device)
    }
}
