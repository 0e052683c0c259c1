use crate::assets::source::MediaSource;
use crate::audio::mix::{MIX_CHANNELS, MIX_SAMPLE_RATE};
use crate::encode::sink::{AudioSinkConfig, EncoderConfig};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::scene::{OverlayPlacement, RenderMode, SceneStyle};

pub use crate::render::scene::OverlayAnchor;

/// Whether frames are held for `1/fps` of wall-clock time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Pacing {
    /// Hold each frame for one frame interval.
    #[default]
    RealTime,
    /// Render as fast as possible (tests, offline batch renders).
    Unpaced,
}

/// Configuration of one composition run. Every field has a default.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ComposeOptions {
    /// Output width in pixels (even).
    pub width: u32,
    /// Output height in pixels (even).
    pub height: u32,
    /// Output frame rate (whole frames per second).
    pub fps: u32,
    /// Music bed looped for the whole run.
    pub background_music: Option<MediaSource>,
    /// Music gain relative to narration.
    pub background_music_gain: f32,
    /// Narrator clip drawn as the base layer in narrator mode.
    pub narrator: Option<MediaSource>,
    /// Scene drawing mode.
    pub mode: RenderMode,
    /// Frame pacing.
    pub pacing: Pacing,
    /// Length of each inter-scene transition.
    pub transition_seconds: f64,
    /// Caption visibility window from scene start.
    pub caption_window_seconds: f64,
    /// Caption fade-in / fade-out length.
    pub caption_fade_seconds: f64,
    /// Target video bitrate in bits per second.
    pub video_bitrate: u32,
    /// Image inset placement in narrator mode.
    pub overlay: OverlayPlacement,
    /// Caption font file.
    pub font: Option<MediaSource>,
    /// Canvas clear color (straight RGBA8).
    pub background_rgba: [u8; 4],
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            background_music: None,
            background_music_gain: 0.3,
            narrator: None,
            mode: RenderMode::Narrator,
            pacing: Pacing::RealTime,
            transition_seconds: 1.0,
            caption_window_seconds: 2.5,
            caption_fade_seconds: 0.5,
            video_bitrate: 5_000_000,
            overlay: OverlayPlacement::default(),
            font: None,
            background_rgba: [0, 0, 0, 255],
        }
    }
}

impl ComposeOptions {
    /// Reject option combinations no run can honor.
    pub fn validate(&self) -> ReelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::validation("width/height must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(ReelError::validation(format!(
                "width/height must be even, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(ReelError::validation(format!(
                "width/height must be <= {}",
                u16::MAX
            )));
        }
        if self.fps == 0 {
            return Err(ReelError::validation("fps must be > 0"));
        }
        if self.video_bitrate == 0 {
            return Err(ReelError::validation("videoBitrate must be > 0"));
        }
        for (name, v) in [
            ("transitionSeconds", self.transition_seconds),
            ("captionWindowSeconds", self.caption_window_seconds),
            ("captionFadeSeconds", self.caption_fade_seconds),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ReelError::validation(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if !self.background_music_gain.is_finite() || self.background_music_gain < 0.0 {
            return Err(ReelError::validation(
                "backgroundMusicGain must be finite and >= 0",
            ));
        }
        let o = &self.overlay;
        if !(o.width_fraction > 0.0 && o.width_fraction <= 1.0) {
            return Err(ReelError::validation(
                "overlay.widthFraction must be in (0, 1]",
            ));
        }
        if !(o.margin_fraction >= 0.0 && o.margin_fraction < 0.5) {
            return Err(ReelError::validation(
                "overlay.marginFraction must be in [0, 0.5)",
            ));
        }
        Ok(())
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Output frame rate.
    pub fn frame_rate(&self) -> ReelResult<Fps> {
        Fps::whole(self.fps)
    }

    pub(crate) fn encoder_config(&self) -> ReelResult<EncoderConfig> {
        Ok(EncoderConfig {
            width: self.width,
            height: self.height,
            fps: self.frame_rate()?,
            video_bitrate: self.video_bitrate,
            background_rgba: self.background_rgba,
        })
    }

    pub(crate) fn audio_config(&self) -> AudioSinkConfig {
        AudioSinkConfig {
            sample_rate: MIX_SAMPLE_RATE,
            channels: MIX_CHANNELS,
        }
    }

    pub(crate) fn scene_style(&self) -> SceneStyle {
        SceneStyle {
            mode: self.mode,
            overlay: self.overlay,
            caption_window_secs: self.caption_window_seconds,
            caption_fade_secs: self.caption_fade_seconds,
            background_rgba: self.background_rgba,
        }
    }
}
