//! Background Extractor: the image pre/post-processing pipeline wrapped
//! around a salient-object segmentation network.
//!
//! The pipeline is a straight line with no branching across requests:
//! decode and color-convert the upload, squash it to the 320×320
//! inference resolution, normalize with ImageNet statistics, run the
//! network, min-max normalize the fused saliency map, resize it back to
//! the original dimensions, and composite it as the alpha channel of the
//! original RGB pixels.
//!
//! The network itself sits behind the [`SalientObjectModel`] trait so the
//! pipeline stays portable regardless of which module executes it.

pub mod backend;
pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod weights;

pub use engine::Engine;
pub use error::{ExtractError, ExtractResult};
pub use model::SalientObjectModel;
pub use pipeline::{encode_png, BackgroundExtractor};
pub use preprocess::{Normalizer, SourceImage, INFERENCE_SIZE, MEAN, STD};
pub use u2net_burn::{U2NetConfig, Variant};
pub use weights::{load_record, WeightFormat};
