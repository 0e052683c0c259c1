use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert!(Fps::whole(30).is_ok());
}

#[test]
fn secs_to_frames_rounds_to_nearest() {
    let fps = Fps::whole(30).unwrap();
    assert_eq!(fps.secs_to_frames_round(5.0), 150);
    assert_eq!(fps.secs_to_frames_round(0.51), 15);
    assert_eq!(fps.secs_to_frames_round(0.1), 3);
    assert_eq!(fps.secs_to_frames_round(-3.0), 0);
    assert_eq!(fps.secs_to_frames_round(f64::NAN), 0);
}

#[test]
fn rational_fps_frame_duration() {
    let fps = Fps::new(30_000, 1001).unwrap();
    assert!((fps.as_f64() - 29.97).abs() < 0.01);
    assert!((fps.frames_to_secs(30_000) - 1001.0).abs() < 1e-9);
}

#[test]
fn canvas_rgba_len() {
    let c = Canvas {
        width: 4,
        height: 2,
    };
    assert_eq!(c.rgba_len(), 32);
}
