use thiserror::Error;

/// The error type for background extraction operations.
///
/// Variants distinguish client-supplied input problems from pipeline
/// faults so the HTTP layer can map them to 4xx/5xx responses.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The uploaded bytes could not be decoded as an image.
    #[error("failed to decode image: {source}")]
    Decode {
        #[source]
        source: image::ImageError,
    },

    /// A saliency tensor had an unexpected shape.
    #[error("invalid saliency map shape: expected {expected}, got {actual}")]
    InvalidMapShape { expected: String, actual: String },

    /// Tensor data could not be converted to host floats.
    #[error("failed to convert tensor to data: {reason}")]
    TensorConversion { reason: String },

    /// Image and mask dimensions disagree at compositing time.
    #[error(
        "dimension mismatch between image and mask: image={image_width}x{image_height}, mask={mask_width}x{mask_height}"
    )]
    DimensionMismatch {
        image_width: u32,
        image_height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    /// A pixel buffer could not be assembled.
    #[error("failed to create image buffer: {reason}")]
    BufferCreation { reason: String },

    /// Encoding the RGBA result as PNG failed.
    #[error("failed to encode result as PNG: {source}")]
    PngEncode {
        #[source]
        source: image::ImageError,
    },

    /// Checkpoint weights could not be read or applied.
    #[error("failed to load weights: {reason}")]
    WeightLoading { reason: String },

    /// Checkpoint file extension is not a supported format.
    #[error("unsupported weight file format: {path}")]
    UnsupportedWeightFormat { path: String },
}

impl ExtractError {
    /// Whether the error was caused by client-supplied input rather than
    /// the pipeline itself.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// A specialized `Result` type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;
