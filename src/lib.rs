//! Momentreel renders AI-narrated story scripts into a single synchronized video.
//!
//! A run takes a [`VideoScript`], per-scene narration audio and images, and an optional
//! narrator clip, and streams drawn frames plus a mixed audio track into a [`VideoEncoder`]:
//!
//! - Parse a script with [`parse_script_str`] (malformed fields fall back to defaults)
//! - Pick a [`ComposeOptions`] (canvas, fps, music, narrator, mode, pacing)
//! - Call [`compose`] with an encoder ([`FfmpegEncoder`] for MP4, [`InMemoryEncoder`] in tests)
#![forbid(unsafe_code)]

mod foundation;

/// Media sources, decoding and per-run handle ownership.
pub mod assets;
/// Software audio mixing.
pub mod audio;
/// Composition orchestration.
pub mod compose;
/// Scene-to-scene transition effects.
pub mod effects;
/// Encoder interface and implementations.
pub mod encode;
/// Scene drawing.
pub mod render;
/// Script model and ingestion.
pub mod script;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{CompositionStage, ReelError, ReelResult};

pub use crate::assets::loader::MediaLoader;
pub use crate::assets::source::MediaSource;
pub use crate::audio::mix::{MIX_CHANNELS, MIX_SAMPLE_RATE, MixGraph};
pub use crate::compose::options::{ComposeOptions, Pacing};
pub use crate::compose::orchestrator::{CompositionPlan, compose};
pub use crate::compose::progress::{NoProgress, ProgressReporter, ProgressUpdate, Status};
pub use crate::effects::transition::TransitionEngine;
pub use crate::encode::ffmpeg::FfmpegEncoder;
pub use crate::encode::sink::{
    AudioSinkConfig, EncoderConfig, InMemoryEncoder, VideoBlob, VideoEncoder,
};
pub use crate::render::frame::FrameRGBA;
pub use crate::render::scene::{OverlayAnchor, OverlayPlacement, RenderMode};
pub use crate::script::ingest::{parse_script_str, parse_script_value};
pub use crate::script::model::{MusicMood, Scene, TransitionKind, VideoScript};
