use std::path::Path;
use std::sync::Arc;

use crate::assets::loader::MediaLoader;
use crate::assets::source::MediaSource;
use crate::foundation::core::{Affine, Canvas, Rect};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::surface::{Surface, color};

/// Font files tried when neither the options nor `MOMENTREEL_FONT` name one.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

const CAPTION_TEXT: TextBrushRgba8 = TextBrushRgba8 {
    r: 255,
    g: 255,
    b: 255,
    a: 255,
};
const CAPTION_BAND: [u8; 4] = [0, 0, 0, 150];

struct CachedLayout {
    text: String,
    max_width: u32,
    layout: parley::Layout<TextBrushRgba8>,
}

/// Lays out and draws scene captions with one registered font.
pub struct CaptionRenderer {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
    cached: Option<CachedLayout>,
}

impl std::fmt::Debug for CaptionRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionRenderer")
            .field("family_name", &self.family_name)
            .finish_non_exhaustive()
    }
}

impl CaptionRenderer {
    /// Register `font_bytes` (TTF/OTF) and build a renderer for it.
    pub fn new(font_bytes: &[u8]) -> ReelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| ReelError::validation("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ReelError::validation("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font: vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font_bytes.to_vec()),
                0,
            ),
            cached: None,
        })
    }

    /// Font size used for captions on `canvas`.
    pub fn font_size(canvas: Canvas) -> f32 {
        (canvas.height as f32 * 0.045).max(12.0)
    }

    /// Horizontal margin used for captions on `canvas`.
    pub fn margin(canvas: Canvas) -> f64 {
        f64::from(canvas.width) * 0.06
    }

    /// Lay out `text` word-wrapped to `max_width_px`; returns `(width, height, line count)`.
    pub fn measure(
        &mut self,
        text: &str,
        size_px: f32,
        max_width_px: f32,
    ) -> ReelResult<(f32, f32, usize)> {
        let layout = self.layout(text, size_px, max_width_px)?;
        Ok((layout.width(), layout.height(), layout.len()))
    }

    fn layout(
        &mut self,
        text: &str,
        size_px: f32,
        max_width_px: f32,
    ) -> ReelResult<&parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ReelError::validation(
                "text size_px must be finite and > 0",
            ));
        }
        let max_width = max_width_px.max(1.0).round() as u32;
        let hit = self
            .cached
            .as_ref()
            .is_some_and(|c| c.text == text && c.max_width == max_width);
        if !hit {
            let mut builder = self
                .layout_ctx
                .ranged_builder(&mut self.font_ctx, text, 1.0, true);
            builder.push_default(parley::style::StyleProperty::FontStack(
                parley::style::FontStack::Source(std::borrow::Cow::Owned(
                    self.family_name.clone(),
                )),
            ));
            builder.push_default(parley::style::StyleProperty::FontSize(size_px));
            builder.push_default(parley::style::StyleProperty::Brush(CAPTION_TEXT));

            let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
            layout.break_all_lines(Some(max_width as f32));
            layout.align(
                Some(max_width as f32),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
            self.cached = Some(CachedLayout {
                text: text.to_string(),
                max_width,
                layout,
            });
        }
        self.cached
            .as_ref()
            .map(|c| &c.layout)
            .ok_or_else(|| ReelError::validation("caption layout unavailable"))
    }

    /// Draw `text` as a caption on a translucent band in the lower third of `surface`.
    pub fn draw(&mut self, surface: &mut Surface, text: &str, opacity: f32) -> ReelResult<()> {
        let text = text.trim();
        if text.is_empty() || opacity <= 0.0 {
            return Ok(());
        }
        let canvas = surface.canvas();
        let margin = Self::margin(canvas);
        let max_w = (f64::from(canvas.width) - 2.0 * margin).max(1.0);
        let size = Self::font_size(canvas);
        let pad = f64::from(size) * 0.5;

        let font = self.font.clone();
        let layout = self.layout(text, size, max_w as f32)?;
        let text_w = f64::from(layout.width());
        let text_h = f64::from(layout.height());

        let band_bottom = f64::from(canvas.height) * 0.92;
        let band_top = (band_bottom - text_h - 2.0 * pad).max(0.0);
        surface.fill_rect(
            Rect::new(margin - pad, band_top, margin + max_w + pad, band_bottom),
            CAPTION_BAND,
            opacity,
        );

        let origin_x = margin + ((max_w - text_w) / 2.0).max(0.0);
        let origin_y = band_top + pad;
        surface.draw_with(
            Affine::translate((origin_x, origin_y)),
            opacity,
            |ctx| {
                for line in layout.lines() {
                    for item in line.items() {
                        let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                            continue;
                        };
                        let brush = run.style().brush;
                        ctx.set_paint(color([brush.r, brush.g, brush.b, brush.a]));
                        let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                            id: g.id,
                            x: g.x,
                            y: g.y,
                        });
                        ctx.glyph_run(&font)
                            .font_size(run.run().font_size())
                            .fill_glyphs(glyphs);
                    }
                }
            },
        );
        Ok(())
    }
}

/// Find and register a caption font: `explicit`, then `MOMENTREEL_FONT`, then common system
/// fonts. Returns `None` (after one warning) when nothing loads.
pub fn load_caption_font(
    explicit: Option<&MediaSource>,
    loader: &mut MediaLoader,
) -> Option<CaptionRenderer> {
    let mut candidates: Vec<MediaSource> = Vec::new();
    if let Some(src) = explicit {
        candidates.push(src.clone());
    }
    if let Some(env) = std::env::var_os("MOMENTREEL_FONT") {
        candidates.push(MediaSource::from(Path::new(&env)));
    }
    candidates.extend(
        SYSTEM_FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .filter(|p| p.is_file())
            .map(MediaSource::from),
    );

    for src in &candidates {
        let bytes: Arc<[u8]> = match loader.load_bytes(src) {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(source = %src.describe(), error = %e, "caption font unavailable");
                continue;
            }
        };
        match CaptionRenderer::new(&bytes) {
            Ok(r) => {
                tracing::debug!(source = %src.describe(), family = %r.family_name, "caption font loaded");
                return Some(r);
            }
            Err(e) => {
                tracing::debug!(source = %src.describe(), error = %e, "caption font rejected");
            }
        }
    }
    tracing::warn!("no usable caption font found; captions are skipped");
    None
}
