use thiserror::Error;

/// Errors produced while converting a video into ASCII frames.
///
/// Load and decode-step failures are deliberately distinct: a [`Load`] error
/// happens before any frame is produced, while a [`Decode`] error aborts a
/// job mid-batch and discards everything. Cancellation is not an error: a
/// cancelled job returns normally with an empty frame list.
///
/// [`Load`]: ConvertError::Load
/// [`Decode`]: ConvertError::Decode
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The source could not be opened or probed at all (unsupported
    /// container, corrupt file, decoder binary missing).
    #[error("failed to load video source: {reason}")]
    Load { reason: String },

    /// A specific timestamp could not be decoded. Fatal for the whole job;
    /// no partial frame list is returned.
    #[error("failed to decode frame at {timestamp:.3}s: {reason}")]
    Decode { timestamp: f64, reason: String },

    /// The audio track could not be extracted. Callers may treat this as
    /// non-fatal and continue without audio.
    #[error("failed to extract audio track: {reason}")]
    Audio { reason: String },

    /// Character ramps must contain at least one character.
    #[error("character ramp must not be empty")]
    EmptyRamp,

    /// Character sets that cannot survive the output formats are rejected
    /// up front.
    #[error("invalid character set: {0}")]
    InvalidCharset(String),

    /// Target widths below one character cannot form a grid.
    #[error("invalid target width: {0} (must be at least 1)")]
    InvalidWidth(u32),

    /// A named preset is missing from the configuration.
    #[error("preset '{0}' not found in configuration")]
    UnknownPreset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
