use super::*;

const WHITE: [u8; 4] = [255, 255, 255, 255];

fn engine() -> TransitionEngine {
    TransitionEngine::new(Fps::whole(10).unwrap(), 1.0).unwrap()
}

fn white(w: u32, h: u32) -> FrameRGBA {
    FrameRGBA::solid(
        Canvas {
            width: w,
            height: h,
        },
        WHITE,
    )
}

#[test]
fn window_length_and_progress() {
    let e = engine();
    assert_eq!(e.frame_count(), 10);
    assert!((e.progress(0) - 0.1).abs() < 1e-12);
    assert_eq!(e.progress(9), 1.0);

    let none = TransitionEngine::new(Fps::whole(30).unwrap(), 0.0).unwrap();
    assert_eq!(none.frame_count(), 0);
    assert!(TransitionEngine::new(Fps::whole(30).unwrap(), -1.0).is_err());
    assert!(TransitionEngine::new(Fps::whole(30).unwrap(), f64::NAN).is_err());
}

#[test]
fn fade_darkens_monotonically_to_black() {
    let e = engine();
    let last = white(8, 4);
    let mut prev = last.mean_luma();
    for k in 0..e.frame_count() {
        let f = e.render(TransitionKind::Fade, &last, k);
        let luma = f.mean_luma();
        assert!(luma < prev);
        prev = luma;
    }
    let end = e.render(TransitionKind::Fade, &last, 9);
    assert_eq!(end, TransitionEngine::cleared(last.canvas()));
}

#[test]
fn slide_moves_content_left() {
    let e = engine();
    let mut last = white(10, 2);
    // Mark the right half red.
    for y in 0..2 {
        for x in 5..10 {
            let i = (y * 10 + x) * 4;
            last.data[i..i + 4].copy_from_slice(&[255, 0, 0, 255]);
        }
    }
    // k = 1 → t = 0.2, shift 2 px.
    let f = e.render(TransitionKind::Slide, &last, 1);
    assert!(f.pixel(3, 0)[0] > 150);
    assert_eq!(f.pixel(3, 0)[1], 0);
    assert!(f.pixel(2, 0)[1] > 0);
    assert_eq!(f.pixel(9, 0), [0, 0, 0, 255]);
    assert_eq!(f.pixel(8, 1), [0, 0, 0, 255]);
}

#[test]
fn zoom_shrinks_toward_center() {
    let e = engine();
    let last = white(20, 20);
    let f = e.render(TransitionKind::Zoom, &last, 4);
    assert_eq!(f.pixel(0, 0), [0, 0, 0, 255]);
    let center = f.pixel(10, 10);
    assert!(center[0] > 0 && center[0] < 255);
    assert_eq!(center[3], 255);
}

#[test]
fn output_is_always_opaque() {
    let e = engine();
    let last = FrameRGBA {
        width: 4,
        height: 4,
        data: vec![0u8; 64],
    };
    for kind in [TransitionKind::Fade, TransitionKind::Slide, TransitionKind::Zoom] {
        for k in 0..e.frame_count() {
            let f = e.render(kind, &last, k);
            assert!(f.data.chunks_exact(4).all(|p| p[3] == 255));
        }
    }
}
