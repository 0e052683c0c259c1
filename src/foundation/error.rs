/// Result alias used across the crate.
pub type ReelResult<T> = Result<T, ReelError>;

/// Stage of a composition run at which a fatal error occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositionStage {
    /// Constructing the encoder / frame sink.
    OpenEncoder,
    /// Constructing or using the audio mix graph.
    OpenAudio,
    /// Pushing a rendered frame into the encoder.
    PushFrame,
    /// Pushing a mixed audio block into the encoder.
    MixAudio,
    /// Stopping the encoder and collecting its output.
    Finalize,
}

impl std::fmt::Display for CompositionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OpenEncoder => "open-encoder",
            Self::OpenAudio => "open-audio",
            Self::PushFrame => "push-frame",
            Self::MixAudio => "mix-audio",
            Self::Finalize => "finalize",
        };
        f.write_str(s)
    }
}

/// Error type for script ingestion, asset decoding and composition.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid input values (options, ranges, buffers).
    #[error("validation error: {0}")]
    Validation(String),

    /// The script cannot be rendered (no scenes, non-positive duration).
    #[error("script validation error: {0}")]
    ScriptValidation(String),

    /// A single asset failed to resolve or decode.
    #[error("media decode error ({origin}): {cause}")]
    MediaDecode {
        /// Human-readable description of the source.
        origin: String,
        /// Underlying failure.
        cause: String,
    },

    /// Narration audio for one scene could not be played.
    #[error("narration playback error (scene {scene}): {cause}")]
    NarrationPlayback {
        /// Zero-based scene index.
        scene: usize,
        /// Underlying failure.
        cause: String,
    },

    /// Encoder, audio graph or final flush failed; the whole run is aborted.
    #[error("composition error at {stage}: {cause}")]
    Composition {
        /// Stage that failed.
        stage: CompositionStage,
        /// Underlying failure.
        cause: String,
    },

    /// The run was cancelled through its [`CancelToken`](crate::CancelToken).
    #[error("composition cancelled after {scenes_completed} scene(s) at {percent:.1}%")]
    Cancelled {
        /// Number of scenes fully rendered before cancellation.
        scenes_completed: usize,
        /// Last reported progress percentage.
        percent: f32,
    },

    /// Anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::ScriptValidation`].
    pub fn script(msg: impl Into<String>) -> Self {
        Self::ScriptValidation(msg.into())
    }

    /// Build a [`ReelError::MediaDecode`].
    pub fn decode(origin: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::MediaDecode {
            origin: origin.into(),
            cause: cause.to_string(),
        }
    }

    /// Build a [`ReelError::NarrationPlayback`].
    pub fn narration(scene: usize, cause: impl std::fmt::Display) -> Self {
        Self::NarrationPlayback {
            scene,
            cause: cause.to_string(),
        }
    }

    /// Build a [`ReelError::Composition`].
    pub fn composition(stage: CompositionStage, cause: impl std::fmt::Display) -> Self {
        Self::Composition {
            stage,
            cause: cause.to_string(),
        }
    }

    /// Return `true` for failures that are recovered inside a run and never abort it.
    pub fn is_asset_level(&self) -> bool {
        matches!(
            self,
            Self::MediaDecode { .. } | Self::NarrationPlayback { .. }
        )
    }

    /// Re-tag any error as a fatal composition error at `stage`.
    ///
    /// Errors that already carry a stage (or a cancellation) are kept as-is.
    pub fn at_stage(self, stage: CompositionStage) -> Self {
        match self {
            Self::Composition { .. } | Self::Cancelled { .. } => self,
            other => Self::composition(stage, other),
        }
    }
}
