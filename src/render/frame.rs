use std::sync::Arc;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ReelError, ReelResult};

/// A rendered frame as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**. The compositor always produces opaque frames, so for
/// its own output premultiplied and straight alpha coincide.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// An opaque frame filled with `rgba` (straight alpha).
    pub fn solid(canvas: Canvas, rgba: [u8; 4]) -> Self {
        let px = premul_rgba8(rgba);
        let mut data = vec![0u8; canvas.rgba_len()];
        for d in data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
        }
    }

    /// Canvas dimensions of this frame.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Read one pixel; out-of-range coordinates return transparent black.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Mean luma over the whole frame (0..=255), handy for coarse assertions.
    pub fn mean_luma(&self) -> f64 {
        let n = (self.data.len() / 4).max(1);
        let sum: u64 = self
            .data
            .chunks_exact(4)
            .map(|p| (u64::from(p[0]) * 299 + u64::from(p[1]) * 587 + u64::from(p[2]) * 114) / 1000)
            .sum();
        sum as f64 / n as f64
    }
}

pub(crate) fn premul_rgba8(rgba: [u8; 4]) -> [u8; 4] {
    let [r, g, b, a] = rgba;
    let a16 = u16::from(a);
    let premul = |c: u8| -> u8 { (((u16::from(c) * a16) + 127) / 255) as u8 };
    [premul(r), premul(g), premul(b), a]
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ReelError::validation("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ReelError::validation("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ReelError::validation("pixmap byte len mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    let opaque = bytes.chunks_exact(4).all(|p| p[3] == 255);
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, !opaque,
    ))
}

pub(crate) fn image_from_premul_bytes(
    bytes_premul: &[u8],
    width: u32,
    height: u32,
) -> ReelResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}
