//! Startup wiring: build the network on the selected backend, load the
//! checkpoint if present, and fall back to random initialization when it
//! is absent.

use std::path::Path;

use burn::module::Module;
use u2net_burn::{U2NetConfig, Variant};

use crate::{
    backend::{backend_name, create_device, SelectedBackend},
    pipeline::BackgroundExtractor,
    weights,
};

/// A fully wired extraction engine plus the startup facts reported by the
/// health check.
pub struct Engine {
    pub extractor: BackgroundExtractor<SelectedBackend>,
    /// False when the checkpoint was absent or unreadable and the network
    /// is running with randomly initialized weights.
    pub weights_loaded: bool,
    /// Name of the compute backend in use.
    pub device_name: &'static str,
}

impl Engine {
    /// Builds the engine, loading weights from `weights_path` when
    /// possible.
    ///
    /// A missing or corrupt checkpoint is a warning, not a startup
    /// failure: the service stays available in a degraded mode that the
    /// health check flags via `weights_loaded`.
    pub fn init(variant: Variant, weights_path: &Path) -> Self {
        let device = create_device();
        let mut model = U2NetConfig::new()
            .with_variant(variant)
            .init::<SelectedBackend>(&device);

        let weights_loaded = match weights::load_record::<SelectedBackend>(weights_path, &device) {
            Ok(record) => {
                log::info!("loaded weights from {}", weights_path.display());
                model = model.load_record(record);
                true
            }
            Err(e) => {
                log::warn!("{e}; continuing with randomly initialized weights");
                false
            }
        };

        Self {
            extractor: BackgroundExtractor::new(Box::new(model), device),
            weights_loaded,
            device_name: backend_name(),
        }
    }
}
