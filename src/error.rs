/// Detector error enum.
#[derive(thiserror::Error, Debug)]
pub enum DetectorError {
    /// The backend output cannot be viewed as an 84 x N prediction tensor.
    #[error("Unsupported tensor shape: {shape:?}")]
    UnsupportedTensorShape {
        /// The offending shape as reported by the backend.
        shape: Vec<usize>,
    },

    /// The inference backend failed to initialize or went away.
    #[error("Inference backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The configuration is malformed or does not match the model.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal candle error.
    #[error(transparent)]
    CandleError(#[from] candle_core::Error),

    /// Kornia image error.
    #[error(transparent)]
    KorniaImageError(#[from] kornia_image::ImageError),
}

impl DetectorError {
    pub(crate) fn unsupported_shape(shape: &[usize]) -> Self {
        DetectorError::UnsupportedTensorShape {
            shape: shape.to_vec(),
        }
    }
}
