//! U²-Net: nested U-structure network for salient object detection.
//!
//! This crate provides the network architecture only. Weight loading,
//! image pre/post-processing, and serving live in the companion crates.

mod config;
mod models;

pub use config::{U2NetConfig, Variant};
pub use models::{U2Net, U2NetRecord};
