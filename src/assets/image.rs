use anyhow::Context as _;

use crate::foundation::error::ReelResult;
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::render::frame::image_from_premul_bytes;

/// Longest edge kept for decoded stills; larger photos are downscaled once at load.
pub const MAX_IMAGE_EDGE: u32 = 4096;

/// A decoded still image, ready to be painted.
#[derive(Clone)]
pub struct LoadedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    pub(crate) paint: vello_cpu::Image,
}

impl std::fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Decode encoded image bytes (PNG, JPEG, WebP, ...) into a premultiplied paint.
pub(crate) fn decode_image(bytes: &[u8]) -> ReelResult<LoadedImage> {
    let mut dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    if dyn_img.width() == 0 || dyn_img.height() == 0 {
        return Err(anyhow::anyhow!("decoded image has zero size").into());
    }
    if dyn_img.width() > MAX_IMAGE_EDGE || dyn_img.height() > MAX_IMAGE_EDGE {
        dyn_img = dyn_img.resize(
            MAX_IMAGE_EDGE,
            MAX_IMAGE_EDGE,
            image::imageops::FilterType::Triangle,
        );
    }
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);
    let paint = image_from_premul_bytes(&rgba8_premul, width, height)?;

    Ok(LoadedImage {
        width,
        height,
        paint,
    })
}
