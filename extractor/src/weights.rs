//! Checkpoint loading for the published U²-Net weights.
//!
//! `.pth` state dicts load through burn-import's PyTorch recorder; the
//! module field names mirror the upstream layout, so no key remapping is
//! required. Burn-native `.mpk` records are supported for converted
//! checkpoints.

use std::path::Path;

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use u2net_burn::U2NetRecord;

use crate::error::{ExtractError, ExtractResult};

/// Supported checkpoint formats, detected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightFormat {
    /// PyTorch `.pt`/`.pth` state dicts, as published upstream.
    PyTorch,
    /// Burn MessagePack `.mpk` records.
    MessagePack,
}

impl WeightFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("pt" | "pth") => Some(Self::PyTorch),
            Some("mpk") => Some(Self::MessagePack),
            _ => None,
        }
    }
}

/// Loads a checkpoint record from `path`, choosing the recorder by
/// extension.
///
/// # Errors
///
/// Returns `ExtractError::WeightLoading` when the file is missing or
/// corrupt, and `ExtractError::UnsupportedWeightFormat` for unknown
/// extensions.
pub fn load_record<B: Backend>(path: &Path, device: &B::Device) -> ExtractResult<U2NetRecord<B>> {
    if !path.exists() {
        return Err(ExtractError::WeightLoading {
            reason: format!("weight file not found: {}", path.display()),
        });
    }

    let format =
        WeightFormat::from_path(path).ok_or_else(|| ExtractError::UnsupportedWeightFormat {
            path: path.display().to_string(),
        })?;

    match format {
        WeightFormat::PyTorch => {
            let load_args = LoadArgs::new(path.to_path_buf());
            PyTorchFileRecorder::<FullPrecisionSettings>::default()
                .load(load_args, device)
                .map_err(|e| ExtractError::WeightLoading {
                    reason: format!("PyTorch checkpoint loading failed: {e}"),
                })
        }
        WeightFormat::MessagePack => NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .load(path.to_path_buf(), device)
            .map_err(|e| ExtractError::WeightLoading {
                reason: format!("MessagePack record loading failed: {e}"),
            }),
    }
}
