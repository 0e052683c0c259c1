use kurbo::{PathEl, Shape};

use crate::foundation::core::{Affine, Canvas, Point, Rect};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::frame::FrameRGBA;

/// Drawing surface of one composition run: a `vello_cpu` context plus its target pixmap.
///
/// A frame is drawn between [`Surface::begin`] and [`Surface::finish`]. The surface is owned by
/// exactly one run and never shared.
pub struct Surface {
    canvas: Canvas,
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("canvas", &self.canvas)
            .finish_non_exhaustive()
    }
}

impl Surface {
    /// Allocate a surface for `canvas`.
    pub fn new(canvas: Canvas) -> ReelResult<Self> {
        let w: u16 = canvas
            .width
            .try_into()
            .map_err(|_| ReelError::validation("surface width exceeds u16"))?;
        let h: u16 = canvas
            .height
            .try_into()
            .map_err(|_| ReelError::validation("surface height exceeds u16"))?;
        if w == 0 || h == 0 {
            return Err(ReelError::validation("surface size must be non-zero"));
        }
        Ok(Self {
            canvas,
            ctx: vello_cpu::RenderContext::new(w, h),
            pixmap: vello_cpu::Pixmap::new(w, h),
        })
    }

    /// Surface dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Start a new frame filled with `rgba` (straight alpha).
    pub fn begin(&mut self, rgba: [u8; 4]) {
        self.ctx.reset();
        self.fill_rect(self.canvas.rect(), rgba, 1.0);
    }

    /// Fill `rect` with a solid color.
    pub fn fill_rect(&mut self, rect: Rect, rgba: [u8; 4], opacity: f32) {
        self.fill_shape(&rect, Affine::IDENTITY, rgba, opacity);
    }

    /// Fill any `kurbo` shape with a solid color under `transform`.
    pub fn fill_shape(
        &mut self,
        shape: &impl Shape,
        transform: Affine,
        rgba: [u8; 4],
        opacity: f32,
    ) {
        if opacity <= 0.0 {
            return;
        }
        let path = shape_to_cpu(shape);
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(color(rgba));
        self.with_opacity(opacity, |ctx| ctx.fill_path(&path));
    }

    /// Fill `rect` with a vertical gradient from `top` to `bottom`, in horizontal bands.
    pub fn fill_vertical_gradient(&mut self, rect: Rect, top: [u8; 4], bottom: [u8; 4]) {
        const BANDS: u32 = 48;
        let band_h = rect.height() / f64::from(BANDS);
        for i in 0..BANDS {
            let t = f64::from(i) / f64::from(BANDS - 1);
            let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
            let c = [
                mix(top[0], bottom[0]),
                mix(top[1], bottom[1]),
                mix(top[2], bottom[2]),
                mix(top[3], bottom[3]),
            ];
            let y0 = rect.y0 + band_h * f64::from(i);
            // Bands overlap by a pixel so no seams show between them.
            let band = Rect::new(rect.x0, y0, rect.x1, (y0 + band_h + 1.0).min(rect.y1));
            self.fill_rect(band, c, 1.0);
        }
    }

    /// Draw an image paint of size `img_w × img_h` mapped through `transform`.
    pub(crate) fn draw_image(
        &mut self,
        paint: &vello_cpu::Image,
        img_w: u32,
        img_h: u32,
        transform: Affine,
        opacity: f32,
    ) {
        if opacity <= 0.0 || img_w == 0 || img_h == 0 {
            return;
        }
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(paint.clone());
        self.with_opacity(opacity, |ctx| {
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(img_w),
                f64::from(img_h),
            ));
        });
    }

    /// Run raw context drawing (glyph runs) under `transform` and `opacity`.
    pub(crate) fn draw_with(
        &mut self,
        transform: Affine,
        opacity: f32,
        f: impl FnOnce(&mut vello_cpu::RenderContext),
    ) {
        if opacity <= 0.0 {
            return;
        }
        self.ctx.set_transform(affine_to_cpu(transform));
        self.with_opacity(opacity, f);
    }

    /// Rasterize everything drawn since `begin` into a frame.
    pub fn finish(&mut self) -> FrameRGBA {
        self.pixmap.data_as_u8_slice_mut().fill(0);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.pixmap);
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.pixmap.data_as_u8_slice().to_vec(),
        }
    }

    fn with_opacity(&mut self, opacity: f32, f: impl FnOnce(&mut vello_cpu::RenderContext)) {
        let layered = opacity < 1.0;
        if layered {
            self.ctx.push_opacity_layer(opacity.clamp(0.0, 1.0));
        }
        f(&mut self.ctx);
        if layered {
            self.ctx.pop_layer();
        }
    }
}

/// Transform that scales an `img_w × img_h` image to cover `dst`, centered.
pub fn cover_transform(img_w: u32, img_h: u32, dst: Rect) -> Affine {
    let (w, h) = (f64::from(img_w.max(1)), f64::from(img_h.max(1)));
    let s = (dst.width() / w).max(dst.height() / h);
    let offset_x = dst.x0 + (dst.width() - w * s) / 2.0;
    let offset_y = dst.y0 + (dst.height() - h * s) / 2.0;
    Affine::translate((offset_x, offset_y)) * Affine::scale(s)
}

/// Transform that scales an `img_w × img_h` image to fit inside `dst`, centered.
pub fn fit_transform(img_w: u32, img_h: u32, dst: Rect) -> Affine {
    let (w, h) = (f64::from(img_w.max(1)), f64::from(img_h.max(1)));
    let s = (dst.width() / w).min(dst.height() / h);
    let offset_x = dst.x0 + (dst.width() - w * s) / 2.0;
    let offset_y = dst.y0 + (dst.height() - h * s) / 2.0;
    Affine::translate((offset_x, offset_y)) * Affine::scale(s)
}

/// Scale by `s` around `center`.
pub fn scale_about(center: Point, s: f64) -> Affine {
    Affine::translate(center.to_vec2()) * Affine::scale(s) * Affine::translate(-center.to_vec2())
}

pub(crate) fn color(rgba: [u8; 4]) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn shape_to_cpu(shape: &impl Shape) -> vello_cpu::kurbo::BezPath {
    let pt = |p: Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for el in shape.path_elements(0.1) {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}
