//! Error types for the VoxWave playback core

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a playback session
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote catalog could not be reached or rejected the request
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// The catalog demands out-of-band captcha resolution before serving us
    #[error("Catalog requires captcha resolution: {0}")]
    CaptchaRequired(String),

    /// A search returned no tracks
    #[error("Nothing found for \"{0}\"")]
    EmptyQuery(String),

    /// The catalog returned a batch with zero entries
    #[error("Catalog returned an empty batch for station {0}")]
    EmptyBatch(String),

    /// An operation needed an active track and none is selected
    #[error("No active track")]
    NoActiveTrack,

    /// No download candidate with a playable codec exists for the track
    #[error("No playable source for track {0}")]
    NoPlayableSource(String),

    /// Fetching the source audio failed
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The external transcoder failed or produced no output
    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    /// A prepare is already in flight for this session
    #[error("A track is already being prepared")]
    PipelineBusy,

    /// Another transition is in progress; the command may be reissued
    #[error("Another command is in progress, try again")]
    Busy,

    /// Volume outside the accepted 1-200 range (or not a number)
    #[error("Volume must be a number between 1 and 200")]
    InvalidVolume,

    /// The audio sink rejected an operation
    #[error("Audio sink error: {0}")]
    Sink(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a catalog-unavailable error from a string
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::CatalogUnavailable(msg.into())
    }

    /// Create a sink error from a string
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// True for transient rejections that the operator may simply reissue
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::PipelineBusy | Self::Busy)
    }
}
