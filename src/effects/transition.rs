use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{mul_div255_u8, unit_to_u8};
use crate::render::frame::FrameRGBA;
use crate::script::model::TransitionKind;

type PremulRgba8 = [u8; 4];

const OPAQUE_BLACK: PremulRgba8 = [0, 0, 0, 255];

/// Smallest scale the `zoom` transition reaches on its last frame.
const ZOOM_END_SCALE: f64 = 0.5;

/// Renders the inter-scene transition frames from the last frame of the outgoing scene.
#[derive(Clone, Copy, Debug)]
pub struct TransitionEngine {
    fps: Fps,
    seconds: f64,
}

impl TransitionEngine {
    /// Create an engine producing `seconds`-long transitions at `fps`.
    pub fn new(fps: Fps, seconds: f64) -> ReelResult<Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ReelError::validation(
                "transition seconds must be finite and >= 0",
            ));
        }
        Ok(Self { fps, seconds })
    }

    /// Number of frames in one transition window.
    pub fn frame_count(&self) -> u64 {
        self.fps.secs_to_frames_round(self.seconds)
    }

    /// Transition progress of window frame `k`; the last frame reaches exactly 1.
    pub fn progress(&self, k: u64) -> f64 {
        let n = self.frame_count();
        if n == 0 {
            return 1.0;
        }
        ((k + 1) as f64 / n as f64).min(1.0)
    }

    /// Render window frame `k` of a `kind` transition away from `last`.
    pub fn render(&self, kind: TransitionKind, last: &FrameRGBA, k: u64) -> FrameRGBA {
        let t = self.progress(k);
        let data = match kind {
            TransitionKind::Fade => fade(&last.data, t),
            TransitionKind::Slide => slide(last, t),
            TransitionKind::Zoom => zoom(last, t),
        };
        FrameRGBA {
            width: last.width,
            height: last.height,
            data,
        }
    }

    /// The cleared canvas shown before the next scene starts drawing.
    pub fn cleared(canvas: Canvas) -> FrameRGBA {
        FrameRGBA::solid(canvas, OPAQUE_BLACK)
    }
}

/// Source-over of `src` at `opacity` onto opaque black.
fn over_black(src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let op = unit_to_u8(opacity);
    [
        mul_div255_u8(u16::from(src[0]), op),
        mul_div255_u8(u16::from(src[1]), op),
        mul_div255_u8(u16::from(src[2]), op),
        255,
    ]
}

fn pixel(data: &[u8], idx: usize) -> PremulRgba8 {
    [data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]
}

/// Black overlay whose opacity rises linearly to 1.
fn fade(src: &[u8], t: f64) -> Vec<u8> {
    let keep = (1.0 - t) as f32;
    let mut out = Vec::with_capacity(src.len());
    for px in src.chunks_exact(4) {
        out.extend_from_slice(&over_black([px[0], px[1], px[2], px[3]], keep));
    }
    out
}

/// Buffer shifted left by `t × width` while fading out.
fn slide(src: &FrameRGBA, t: f64) -> Vec<u8> {
    let (w, h) = (src.width as usize, src.height as usize);
    let shift = (t * w as f64).round() as usize;
    let keep = (1.0 - t) as f32;
    let mut out = Vec::with_capacity(src.data.len());
    for y in 0..h {
        for x in 0..w {
            let sx = x + shift;
            if sx < w {
                out.extend_from_slice(&over_black(pixel(&src.data, (y * w + sx) * 4), keep));
            } else {
                out.extend_from_slice(&OPAQUE_BLACK);
            }
        }
    }
    out
}

/// Buffer scaled down around the center while fading out (nearest sampling).
fn zoom(src: &FrameRGBA, t: f64) -> Vec<u8> {
    let (w, h) = (src.width as usize, src.height as usize);
    let scale = 1.0 - (1.0 - ZOOM_END_SCALE) * t;
    let keep = (1.0 - t) as f32;
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let mut out = Vec::with_capacity(src.data.len());
    for y in 0..h {
        let sy = cy + (y as f64 + 0.5 - cy) / scale;
        for x in 0..w {
            let sx = cx + (x as f64 + 0.5 - cx) / scale;
            if sx < 0.0 || sy < 0.0 || sx >= w as f64 || sy >= h as f64 {
                out.extend_from_slice(&OPAQUE_BLACK);
                continue;
            }
            let idx = ((sy as usize) * w + (sx as usize)) * 4;
            out.extend_from_slice(&over_black(pixel(&src.data, idx), keep));
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/effects/transition.rs"]
mod tests;
