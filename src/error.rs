use thiserror::Error;

/// Errors raised while reading, encoding or growing point and region data.
///
/// These travel inside `anyhow::Error` chains; use `downcast_ref::<CodecError>()`
/// to tell them apart.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Malformed input: size-mismatched point buffer, bad GeoJSON, unknown field type.
    #[error("[{context}] malformed input: {message}")]
    Format { context: &'static str, message: String },

    /// A coordinate or value falls outside the configured quantization bounds.
    #[error("[points::codec] {field} value {value} is out of range: {reason}")]
    Range { field: &'static str, value: f64, reason: &'static str },

    /// A point store reached its configured length limit.
    #[error("[points::store] point limit of {limit} exceeded")]
    CapacityExceeded { limit: usize },
}

impl CodecError {
    pub(crate) fn format(context: &'static str, message: impl Into<String>) -> Self {
        Self::Format { context, message: message.into() }
    }
}
