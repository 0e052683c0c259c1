use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{CompositionStage, ReelError, ReelResult};
use crate::render::frame::FrameRGBA;

/// Video stream parameters handed to [`VideoEncoder::open_frame_sink`].
#[derive(Clone, Debug)]
pub struct EncoderConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Target video bitrate in bits per second.
    pub video_bitrate: u32,
    /// Background used to flatten any residual alpha (straight RGBA8).
    pub background_rgba: [u8; 4],
}

impl EncoderConfig {
    /// Check the stream parameters an H.264 / yuv420p encoder can accept.
    pub fn validate(&self) -> ReelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::validation(
                "encoder width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(ReelError::validation(
                "encoder width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(ReelError::validation("encoder fps must be non-zero"));
        }
        if self.video_bitrate == 0 {
            return Err(ReelError::validation("encoder bitrate must be non-zero"));
        }
        Ok(())
    }

    /// Canvas described by this configuration.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

/// Audio stream parameters handed to [`VideoEncoder::open_audio_sink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioSinkConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

/// The encoded output of one composition run. Ownership passes to the caller.
#[derive(Clone, Debug)]
pub struct VideoBlob {
    /// Encoded container bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub media_type: String,
    /// Filename suggestion for saving the blob.
    pub suggested_filename: String,
    /// Number of video frames in the output.
    pub frame_count: u64,
    /// Output duration in seconds (`frame_count / fps`).
    pub duration_secs: f64,
}

/// Destination for the frames and mixed audio of one composition run.
///
/// Call order: `open_frame_sink`, optionally `open_audio_sink`, then any interleaving of
/// `push_frame` (strictly increasing indices) and `mix_track`, then exactly one of `finalize`
/// or `abort`. Implementations are used by a single run and are not reentrant.
pub trait VideoEncoder {
    /// Start the video stream.
    fn open_frame_sink(&mut self, cfg: &EncoderConfig) -> ReelResult<()>;
    /// Start the audio stream.
    fn open_audio_sink(&mut self, cfg: &AudioSinkConfig) -> ReelResult<()>;
    /// Append one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()>;
    /// Append a block of interleaved audio samples.
    fn mix_track(&mut self, samples: &[f32]) -> ReelResult<()>;
    /// Flush everything and return the encoded output.
    fn finalize(&mut self) -> ReelResult<VideoBlob>;
    /// Stop without producing output and release every resource. Idempotent.
    fn abort(&mut self);
}

/// In-memory encoder for tests and debugging.
///
/// Frames are kept as-is; `finalize` returns them concatenated as a raw RGBA stream.
#[derive(Debug, Default)]
pub struct InMemoryEncoder {
    cfg: Option<EncoderConfig>,
    audio: Option<AudioSinkConfig>,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    samples: Vec<f32>,
    finalized: bool,
    aborted: bool,
    fail_at: Option<CompositionStage>,
}

impl InMemoryEncoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder that fails when the run reaches `stage`.
    pub fn failing_at(stage: CompositionStage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    /// Configuration captured by `open_frame_sink`, if any.
    pub fn config(&self) -> Option<&EncoderConfig> {
        self.cfg.as_ref()
    }

    /// Audio configuration captured by `open_audio_sink`, if any.
    pub fn audio_config(&self) -> Option<&AudioSinkConfig> {
        self.audio.as_ref()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// Captured interleaved audio samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Return `true` once `finalize` succeeded.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Return `true` once `abort` was called.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    fn check(&self, stage: CompositionStage) -> ReelResult<()> {
        if self.fail_at == Some(stage) {
            return Err(ReelError::composition(stage, "injected encoder failure"));
        }
        if self.finalized || self.aborted {
            return Err(ReelError::composition(stage, "encoder already stopped"));
        }
        Ok(())
    }
}

impl VideoEncoder for InMemoryEncoder {
    fn open_frame_sink(&mut self, cfg: &EncoderConfig) -> ReelResult<()> {
        self.check(CompositionStage::OpenEncoder)?;
        cfg.validate()?;
        self.cfg = Some(cfg.clone());
        self.frames.clear();
        Ok(())
    }

    fn open_audio_sink(&mut self, cfg: &AudioSinkConfig) -> ReelResult<()> {
        self.check(CompositionStage::OpenAudio)?;
        self.audio = Some(cfg.clone());
        self.samples.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        self.check(CompositionStage::PushFrame)?;
        let cfg = self.cfg.as_ref().ok_or_else(|| {
            ReelError::composition(CompositionStage::PushFrame, "frame sink not opened")
        })?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ReelError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if let Some((last, _)) = self.frames.last()
            && idx.0 <= last.0
        {
            return Err(ReelError::composition(
                CompositionStage::PushFrame,
                "out-of-order frame index",
            ));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn mix_track(&mut self, samples: &[f32]) -> ReelResult<()> {
        self.check(CompositionStage::MixAudio)?;
        if self.audio.is_none() {
            return Err(ReelError::composition(
                CompositionStage::MixAudio,
                "audio sink not opened",
            ));
        }
        self.samples.extend_from_slice(samples);
        Ok(())
    }

    fn finalize(&mut self) -> ReelResult<VideoBlob> {
        self.check(CompositionStage::Finalize)?;
        let cfg = self.cfg.as_ref().ok_or_else(|| {
            ReelError::composition(CompositionStage::Finalize, "frame sink not opened")
        })?;
        let frame_count = self.frames.len() as u64;
        let mut bytes = Vec::with_capacity(self.frames.iter().map(|(_, f)| f.data.len()).sum());
        for (_, f) in &self.frames {
            bytes.extend_from_slice(&f.data);
        }
        let blob = VideoBlob {
            bytes,
            media_type: "video/x-raw-rgba".to_string(),
            suggested_filename: "moment-reel.rgba".to_string(),
            frame_count,
            duration_secs: cfg.fps.frames_to_secs(frame_count),
        };
        self.finalized = true;
        Ok(blob)
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}
