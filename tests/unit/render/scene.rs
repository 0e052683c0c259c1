use std::io::Cursor;

use super::*;
use crate::assets::image::decode_image;

const RED: [u8; 4] = [200, 10, 10, 255];

fn canvas() -> Canvas {
    Canvas {
        width: 64,
        height: 36,
    }
}

fn style(mode: RenderMode) -> SceneStyle {
    SceneStyle {
        mode,
        overlay: OverlayPlacement::default(),
        caption_window_secs: 2.5,
        caption_fade_secs: 0.5,
        background_rgba: [0, 0, 0, 255],
    }
}

fn near(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 2)
}

fn renderer(mode: RenderMode) -> SceneRenderer {
    SceneRenderer::new(style(mode), Fps::whole(10).unwrap(), None)
}

fn red_image(w: u32, h: u32) -> Arc<LoadedImage> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(RED));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    Arc::new(decode_image(&buf).unwrap())
}

#[test]
fn draws_exactly_total_frames() {
    let mut r = renderer(RenderMode::Narrator);
    let mut s = Surface::new(canvas()).unwrap();
    let total = r.enter(0, &Scene::new("hello", 1.04), Vec::new()).unwrap();
    assert_eq!(total, 10);
    for i in 0..total {
        assert_eq!(r.frame_in_scene(), Some(i));
        let f = r.draw_frame(&mut s, None).unwrap();
        assert_eq!(f.canvas(), canvas());
    }
    assert!(r.draw_frame(&mut s, None).is_err());
    assert_eq!(r.exit().unwrap(), 0);
    assert!(r.draw_frame(&mut s, None).is_err());
    assert!(r.exit().is_err());
}

#[test]
fn cannot_enter_twice() {
    let mut r = renderer(RenderMode::Narrator);
    r.enter(0, &Scene::new("a", 1.0), Vec::new()).unwrap();
    assert!(r.enter(1, &Scene::new("b", 1.0), Vec::new()).is_err());
}

#[test]
fn narrator_inset_slides_in_during_first_third() {
    let mut r = renderer(RenderMode::Narrator);
    let mut s = Surface::new(canvas()).unwrap();
    r.enter(0, &Scene::new("x", 1.0), vec![Some(red_image(4, 3))])
        .unwrap();
    let first = r.draw_frame(&mut s, None).unwrap();
    assert!(!near(first.pixel(51, 9), RED));

    for _ in 1..4 {
        r.draw_frame(&mut s, None).unwrap();
    }
    let settled = r.draw_frame(&mut s, None).unwrap();
    assert!(near(settled.pixel(51, 9), RED));
}

#[test]
fn failed_image_slot_is_skipped() {
    let mut with_none = renderer(RenderMode::Narrator);
    let mut without = renderer(RenderMode::Narrator);
    let mut s = Surface::new(canvas()).unwrap();
    with_none.enter(0, &Scene::new("x", 1.0), vec![None]).unwrap();
    without.enter(0, &Scene::new("x", 1.0), Vec::new()).unwrap();
    for _ in 0..10 {
        let a = with_none.draw_frame(&mut s, None).unwrap();
        let b = without.draw_frame(&mut s, None).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn slideshow_draws_image_full_frame() {
    let mut r = renderer(RenderMode::Slideshow);
    let mut s = Surface::new(canvas()).unwrap();
    r.enter(0, &Scene::new("x", 1.0), vec![Some(red_image(16, 9))])
        .unwrap();
    let f = r.draw_frame(&mut s, None).unwrap();
    assert!(near(f.pixel(32, 18), RED));
    assert!(near(f.pixel(1, 1), RED));
}

#[test]
fn slideshow_without_images_uses_backdrop() {
    let mut r = renderer(RenderMode::Slideshow);
    let mut s = Surface::new(canvas()).unwrap();
    r.enter(2, &Scene::new("x", 1.0), Vec::new()).unwrap();
    let f = r.draw_frame(&mut s, None).unwrap();

    let mut expected = Surface::new(canvas()).unwrap();
    expected.begin([0, 0, 0, 255]);
    draw_placeholder_backdrop(&mut expected, 2);
    assert_eq!(f, expected.finish());
}

#[test]
fn default_overlay_sits_upper_right() {
    let r = OverlayPlacement::default().rect(Canvas {
        width: 1920,
        height: 1080,
    });
    assert!((r.x1 - (1920.0 - 76.8)).abs() < 1e-9);
    assert!((r.y0 - 76.8).abs() < 1e-9);
    assert!((r.width() - 576.0).abs() < 1e-9);
    assert!((r.height() - 432.0).abs() < 1e-9);

    let lower_left = OverlayPlacement {
        anchor: OverlayAnchor::LowerLeft,
        ..OverlayPlacement::default()
    }
    .rect(Canvas {
        width: 1920,
        height: 1080,
    });
    assert!((lower_left.x0 - 76.8).abs() < 1e-9);
    assert!((lower_left.y1 - (1080.0 - 76.8)).abs() < 1e-9);
}
