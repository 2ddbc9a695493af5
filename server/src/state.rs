use std::{path::Path, sync::Arc, time::Duration};

use u2net_extractor::{backend::SelectedBackend, BackgroundExtractor, Engine, Variant};

/// Shared, read-only per-process state injected into request handlers.
///
/// The model is loaded once at startup; requests only ever read it, so no
/// locking is needed beyond the `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<BackgroundExtractor<SelectedBackend>>,
    pub weights_loaded: bool,
    pub device_name: &'static str,
    pub inference_timeout: Duration,
}

impl AppState {
    /// Builds the extraction engine and wraps it for sharing across
    /// workers. A missing checkpoint leaves the service running in
    /// degraded mode with `weights_loaded` set to false.
    pub fn initialize(variant: Variant, weights_path: &Path, inference_timeout: Duration) -> Self {
        let engine = Engine::init(variant, weights_path);

        Self {
            extractor: Arc::new(engine.extractor),
            weights_loaded: engine.weights_loaded,
            device_name: engine.device_name,
            inference_timeout,
        }
    }
}
