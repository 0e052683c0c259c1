use std::sync::Arc;

use crate::assets::image::LoadedImage;
use crate::assets::video::NarratorClip;
use crate::foundation::core::{Affine, Canvas, Fps, Point, Rect};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::avatar::{draw_placeholder_avatar, draw_placeholder_backdrop};
use crate::render::frame::FrameRGBA;
use crate::render::motion::{KenBurns, caption_opacity, entrance, image_index};
use crate::render::surface::{Surface, fit_transform};
use crate::render::text::CaptionRenderer;
use crate::script::model::Scene;

/// How scenes are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderMode {
    /// Narrator clip (or placeholder avatar) as base, scene images as an inset overlay.
    #[default]
    Narrator,
    /// Scene images full-frame with Ken Burns pan/zoom.
    Slideshow,
}

/// Canvas corner the image inset is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayAnchor {
    /// Top-left corner.
    UpperLeft,
    /// Top-right corner.
    #[default]
    UpperRight,
    /// Bottom-left corner.
    LowerLeft,
    /// Bottom-right corner.
    LowerRight,
}

/// Placement of the image inset in narrator mode.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayPlacement {
    /// Corner the inset sits in.
    pub anchor: OverlayAnchor,
    /// Inset width as a fraction of canvas width, in `(0, 1]`.
    pub width_fraction: f64,
    /// Distance from the canvas edges as a fraction of canvas width, in `[0, 0.5)`.
    pub margin_fraction: f64,
}

impl Default for OverlayPlacement {
    fn default() -> Self {
        Self {
            anchor: OverlayAnchor::UpperRight,
            width_fraction: 0.3,
            margin_fraction: 0.04,
        }
    }
}

impl OverlayPlacement {
    /// Inset region on `canvas` (4:3).
    pub fn rect(&self, canvas: Canvas) -> Rect {
        let cw = f64::from(canvas.width);
        let ch = f64::from(canvas.height);
        let w = cw * self.width_fraction;
        let h = (w * 0.75).min(ch);
        let m = cw * self.margin_fraction;
        let x0 = match self.anchor {
            OverlayAnchor::UpperLeft | OverlayAnchor::LowerLeft => m,
            OverlayAnchor::UpperRight | OverlayAnchor::LowerRight => cw - m - w,
        };
        let y0 = match self.anchor {
            OverlayAnchor::UpperLeft | OverlayAnchor::UpperRight => m,
            OverlayAnchor::LowerLeft | OverlayAnchor::LowerRight => ch - m - h,
        };
        Rect::new(x0, y0, x0 + w, y0 + h)
    }
}

/// Per-run drawing parameters shared by every scene.
#[derive(Clone, Debug)]
pub struct SceneStyle {
    /// Drawing mode.
    pub mode: RenderMode,
    /// Image inset placement (narrator mode).
    pub overlay: OverlayPlacement,
    /// Caption visibility window from scene start, in seconds.
    pub caption_window_secs: f64,
    /// Caption fade length at both ends of the window, in seconds.
    pub caption_fade_secs: f64,
    /// Canvas clear color (straight RGBA8).
    pub background_rgba: [u8; 4],
}

#[derive(Debug)]
enum SceneState {
    Idle,
    Entered {
        scene_index: usize,
        frame: u64,
        total_frames: u64,
        caption: String,
        images: Vec<Option<Arc<LoadedImage>>>,
    },
    Exited,
}

/// Draws the frames of one scene at a time: `enter`, `draw_frame` × `total_frames`, `exit`.
#[derive(Debug)]
pub struct SceneRenderer {
    style: SceneStyle,
    fps: Fps,
    captions: Option<CaptionRenderer>,
    state: SceneState,
}

impl SceneRenderer {
    /// Create a renderer; `captions` is `None` when no font is available.
    pub fn new(style: SceneStyle, fps: Fps, captions: Option<CaptionRenderer>) -> Self {
        Self {
            style,
            fps,
            captions,
            state: SceneState::Idle,
        }
    }

    /// Frames drawn for a scene of `duration_secs`.
    pub fn total_frames(&self, duration_secs: f64) -> u64 {
        self.fps.secs_to_frames_round(duration_secs)
    }

    /// Begin scene `scene_index`; returns its frame count.
    ///
    /// `images` keeps one slot per source; `None` slots failed to decode.
    pub fn enter(
        &mut self,
        scene_index: usize,
        scene: &Scene,
        images: Vec<Option<Arc<LoadedImage>>>,
    ) -> ReelResult<u64> {
        if let SceneState::Entered { scene_index: s, .. } = self.state {
            return Err(ReelError::validation(format!(
                "cannot enter scene {scene_index} while scene {s} is active"
            )));
        }
        let total_frames = self.total_frames(scene.duration_seconds);
        tracing::debug!(
            scene = scene_index,
            total_frames,
            images = images.len(),
            "scene entered"
        );
        self.state = SceneState::Entered {
            scene_index,
            frame: 0,
            total_frames,
            caption: scene.caption().to_string(),
            images,
        };
        Ok(total_frames)
    }

    /// Index of the next frame to draw within the active scene.
    pub fn frame_in_scene(&self) -> Option<u64> {
        match &self.state {
            SceneState::Entered { frame, .. } => Some(*frame),
            _ => None,
        }
    }

    /// Draw the next frame of the active scene.
    pub fn draw_frame(
        &mut self,
        surface: &mut Surface,
        narrator: Option<&mut NarratorClip>,
    ) -> ReelResult<FrameRGBA> {
        let SceneState::Entered {
            scene_index,
            frame,
            total_frames,
            caption,
            images,
        } = &mut self.state
        else {
            return Err(ReelError::validation("draw_frame called outside a scene"));
        };
        if *frame >= *total_frames {
            return Err(ReelError::validation(format!(
                "scene {scene_index} has only {total_frames} frames"
            )));
        }
        let scene_index = *scene_index;
        let progress = *frame as f64 / *total_frames as f64;
        let secs = self.fps.frames_to_secs(*frame);
        let slot = image_index(*frame, *total_frames, images.len())
            .and_then(|i| images[i].clone());
        *frame += 1;

        surface.begin(self.style.background_rgba);
        match self.style.mode {
            RenderMode::Narrator => {
                draw_narrator_base(surface, narrator, scene_index, progress);
                if let Some(img) = slot {
                    draw_inset(surface, &self.style.overlay, &img, progress);
                }
            }
            RenderMode::Slideshow => match slot {
                Some(img) => {
                    let tr = KenBurns::for_scene(scene_index).transform(
                        progress,
                        img.width,
                        img.height,
                        surface.canvas().rect(),
                    );
                    surface.draw_image(&img.paint, img.width, img.height, tr, 1.0);
                }
                None => draw_placeholder_backdrop(surface, scene_index),
            },
        }

        let opacity = caption_opacity(
            secs,
            self.style.caption_window_secs,
            self.style.caption_fade_secs,
        );
        if let Some(captions) = self.captions.as_mut()
            && opacity > 0.0
            && let Err(e) = captions.draw(surface, caption, opacity)
        {
            tracing::warn!(scene = scene_index, error = %e, "caption skipped");
        }

        Ok(surface.finish())
    }

    /// Leave the active scene and return its index. Drops its image references.
    pub fn exit(&mut self) -> ReelResult<usize> {
        let SceneState::Entered {
            scene_index,
            frame,
            total_frames,
            ..
        } = &self.state
        else {
            return Err(ReelError::validation("exit called outside a scene"));
        };
        let scene_index = *scene_index;
        if frame < total_frames {
            tracing::debug!(
                scene = scene_index,
                drawn = *frame,
                total_frames = *total_frames,
                "scene exited early"
            );
        }
        self.state = SceneState::Exited;
        Ok(scene_index)
    }
}

fn draw_inset(
    surface: &mut Surface,
    overlay: &OverlayPlacement,
    img: &LoadedImage,
    progress: f64,
) {
    let canvas = surface.canvas();
    let region = overlay.rect(canvas);
    let fit = fit_transform(img.width, img.height, region);
    let (dx, opacity) = entrance(progress, f64::from(canvas.width) - region.x0);
    let slide = Affine::translate((dx, 0.0));

    let tl = fit * Point::new(0.0, 0.0);
    let br = fit * Point::new(f64::from(img.width), f64::from(img.height));
    let border = (f64::from(canvas.width) * 0.004).max(1.0);
    let frame_rect = Rect::new(tl.x - border, tl.y - border, br.x + border, br.y + border);
    surface.fill_shape(&frame_rect, slide, [255, 255, 255, 255], opacity);
    surface.draw_image(&img.paint, img.width, img.height, slide * fit, opacity);
}

fn draw_narrator_base(
    surface: &mut Surface,
    narrator: Option<&mut NarratorClip>,
    scene_index: usize,
    progress: f64,
) {
    let Some(clip) = narrator else {
        draw_placeholder_avatar(surface, progress);
        return;
    };
    if let Err(e) = clip.advance() {
        tracing::warn!(scene = scene_index, error = %e, "narrator clip stalled; holding last frame");
    }
    match clip.current() {
        Some(paint) => {
            let c = surface.canvas();
            surface.draw_image(paint, c.width, c.height, Affine::IDENTITY, 1.0);
        }
        None => draw_placeholder_avatar(surface, progress),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene.rs"]
mod tests;
