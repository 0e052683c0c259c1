//! Time-to-geometry functions for scene animation.
//!
//! Everything here is a pure function of scene progress (`frame / total_frames`) or of seconds
//! since scene start, so identical inputs always render identical frames.

use std::f64::consts::TAU;

use crate::foundation::core::{Affine, Rect, Vec2};
use crate::foundation::math::{ease_out_cubic, lerp};
use crate::render::surface::{cover_transform, scale_about};

/// Maximum zoom used by the Ken Burns effects.
pub const KEN_BURNS_ZOOM: f64 = 1.2;

/// Pan/zoom effect applied to full-frame slideshow images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KenBurns {
    /// Scale up from 1.0 to [`KEN_BURNS_ZOOM`].
    ZoomIn,
    /// Scale down from [`KEN_BURNS_ZOOM`] to 1.0.
    ZoomOut,
    /// Zoomed in, drifting left.
    PanLeft,
    /// Zoomed in, drifting right.
    PanRight,
}

impl KenBurns {
    /// Effects in rotation order.
    pub const ALL: [KenBurns; 4] = [
        KenBurns::ZoomIn,
        KenBurns::ZoomOut,
        KenBurns::PanLeft,
        KenBurns::PanRight,
    ];

    /// Effect for a scene; consecutive scenes alternate.
    pub fn for_scene(scene_index: usize) -> Self {
        Self::ALL[scene_index % Self::ALL.len()]
    }

    /// Zoom factor and horizontal offset (in pixels) at `progress` for a frame `width` wide.
    pub fn params(self, progress: f64, width: f64) -> (f64, f64) {
        let p = progress.clamp(0.0, 1.0);
        let travel = (KEN_BURNS_ZOOM - 1.0) * width / 2.0;
        match self {
            Self::ZoomIn => (lerp(1.0, KEN_BURNS_ZOOM, p), 0.0),
            Self::ZoomOut => (lerp(KEN_BURNS_ZOOM, 1.0, p), 0.0),
            Self::PanLeft => (KEN_BURNS_ZOOM, lerp(travel, -travel, p)),
            Self::PanRight => (KEN_BURNS_ZOOM, lerp(-travel, travel, p)),
        }
    }

    /// Image-to-canvas transform: cover-fit, then pan/zoom about the frame center.
    pub fn transform(self, progress: f64, img_w: u32, img_h: u32, frame: Rect) -> Affine {
        let (zoom, dx) = self.params(progress, frame.width());
        Affine::translate(Vec2::new(dx, 0.0))
            * scale_about(frame.center(), zoom)
            * cover_transform(img_w, img_h, frame)
    }
}

/// Entrance animation of the image inset: slides in from the right over the first third of the
/// scene with an ease-out, fading in alongside.
///
/// Returns `(x offset in pixels, opacity)`.
pub fn entrance(progress: f64, distance: f64) -> (f64, f32) {
    let t = (progress * 3.0).clamp(0.0, 1.0);
    ((1.0 - ease_out_cubic(t)) * distance, t as f32)
}

/// Caption opacity `secs` into a scene: visible during `[0, window)`, with linear fades of
/// `fade` seconds at both ends of the window.
pub fn caption_opacity(secs: f64, window: f64, fade: f64) -> f32 {
    if !(0.0..window).contains(&secs) {
        return 0.0;
    }
    if fade <= 0.0 {
        return 1.0;
    }
    let fade_in = secs / fade;
    let fade_out = (window - secs) / fade;
    fade_in.min(fade_out).clamp(0.0, 1.0) as f32
}

/// Which of `count` images is shown at `frame` of a `total_frames` scene.
pub fn image_index(frame: u64, total_frames: u64, count: usize) -> Option<usize> {
    if count == 0 {
        return None;
    }
    if total_frames == 0 {
        return Some(0);
    }
    let progress = frame as f64 / total_frames as f64;
    Some(((progress * count as f64).floor() as usize).min(count - 1))
}

/// Pose of the placeholder narrator at `progress`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AvatarPose {
    /// Head scale around 1.0.
    pub scale: f64,
    /// Mouth opening in `[0, 1]`.
    pub mouth_open: f64,
}

/// Placeholder narrator pose: a slow breath and a faster speech-like mouth cycle.
pub fn avatar_pose(progress: f64) -> AvatarPose {
    let p = progress.clamp(0.0, 1.0);
    AvatarPose {
        scale: 1.0 + 0.03 * (p * TAU * 2.0).sin(),
        mouth_open: (p * TAU * 6.0).sin().abs(),
    }
}
