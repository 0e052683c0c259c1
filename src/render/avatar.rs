use kurbo::{Circle, Ellipse};

use crate::foundation::core::{Affine, Point};
use crate::render::motion::avatar_pose;
use crate::render::surface::{Surface, scale_about};

const BACKDROP_TOP: [u8; 4] = [34, 40, 92, 255];
const BACKDROP_BOTTOM: [u8; 4] = [104, 52, 120, 255];
const FACE: [u8; 4] = [244, 204, 166, 255];
const FEATURE: [u8; 4] = [48, 34, 40, 255];
const MOUTH: [u8; 4] = [150, 46, 60, 255];

/// Slideshow backdrops, picked by scene index.
const SLIDE_GRADIENTS: [([u8; 4], [u8; 4]); 3] = [
    ([28, 60, 98, 255], [12, 20, 40, 255]),
    ([92, 44, 70, 255], [30, 14, 34, 255]),
    ([30, 84, 70, 255], [10, 30, 28, 255]),
];

/// Draw the procedural placeholder narrator at scene `progress`.
///
/// A gradient backdrop and a round face that breathes, with a mouth that opens and closes.
pub fn draw_placeholder_avatar(surface: &mut Surface, progress: f64) {
    let rect = surface.canvas().rect();
    surface.fill_vertical_gradient(rect, BACKDROP_TOP, BACKDROP_BOTTOM);

    let pose = avatar_pose(progress);
    let center = Point::new(rect.width() / 2.0, rect.height() * 0.45);
    let r = rect.width().min(rect.height()) * 0.22;
    let head = scale_about(center, pose.scale);

    surface.fill_shape(&Circle::new(center, r), head, FACE, 1.0);

    let eye_y = center.y - r * 0.2;
    for dx in [-0.35, 0.35] {
        let eye = Ellipse::new((center.x + r * dx, eye_y), (r * 0.08, r * 0.11), 0.0);
        surface.fill_shape(&eye, head, FEATURE, 1.0);
    }

    let mouth_h = r * (0.04 + 0.2 * pose.mouth_open);
    let mouth = Ellipse::new((center.x, center.y + r * 0.42), (r * 0.3, mouth_h), 0.0);
    surface.fill_shape(&mouth, head, MOUTH, 1.0);
}

/// Draw the slideshow fallback backdrop for a scene without usable images.
pub fn draw_placeholder_backdrop(surface: &mut Surface, scene_index: usize) {
    let (top, bottom) = SLIDE_GRADIENTS[scene_index % SLIDE_GRADIENTS.len()];
    let rect = surface.canvas().rect();
    surface.fill_vertical_gradient(rect, top, bottom);
    // Soft vignette bar keeps the caption readable on lighter gradients.
    surface.fill_shape(
        &kurbo::Rect::new(0.0, rect.height() * 0.6, rect.width(), rect.height()),
        Affine::IDENTITY,
        [0, 0, 0, 255],
        0.25,
    );
}
