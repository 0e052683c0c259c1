use std::io::Cursor;

use super::*;

fn loader() -> MediaLoader {
    MediaLoader::new(
        Canvas {
            width: 32,
            height: 18,
        },
        Fps::whole(10).unwrap(),
    )
}

fn png(w: u32, h: u32) -> MediaSource {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([200, 10, 10, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    MediaSource::from(buf)
}

#[test]
fn scene_images_keep_failed_slots() {
    let mut l = loader();
    let slots = l.load_scene_images(
        1,
        &[png(4, 4), MediaSource::from(b"garbage".to_vec()), png(2, 2)],
    );
    assert_eq!(slots.len(), 3);
    assert!(slots[0].is_some());
    assert!(slots[1].is_none());
    assert_eq!(slots[2].as_ref().map(|i| i.width), Some(2));
    assert_eq!(l.live_handles(), 2);
}

#[test]
fn decode_failure_is_asset_level() {
    let mut l = loader();
    let err = l
        .load_image(&MediaSource::from(b"not an image".to_vec()))
        .unwrap_err();
    assert!(err.is_asset_level());
    assert_eq!(l.live_handles(), 0);
}

#[test]
fn release_all_drops_handles_and_blocks_loads() {
    let mut l = loader();
    l.load_image(&png(3, 3)).unwrap();
    assert_eq!(l.live_handles(), 1);
    l.release_all();
    assert_eq!(l.live_handles(), 0);
    assert!(l.load_image(&png(3, 3)).is_err());
    l.release_all();
}

#[test]
fn missing_narrator_file_is_decode_error() {
    let mut l = loader();
    let err = l
        .load_narrator(&MediaSource::Reference("/no/such/clip.mp4".to_string()))
        .unwrap_err();
    assert!(matches!(err, ReelError::MediaDecode { .. }));
    assert!(!l.has_narrator());
}

#[test]
fn corrupt_in_memory_narrator_fails_and_leaves_no_clip() {
    let mut l = loader();
    let res = l.load_narrator(&MediaSource::from(b"not a video at all".to_vec()));
    assert!(res.is_err());
    assert!(!l.has_narrator());
    l.release_all();
    assert_eq!(l.live_handles(), 0);
}

#[test]
fn release_scene_drops_only_that_scene() {
    let mut l = loader();
    l.load_scene_images(0, &[png(4, 4), png(4, 4)]);
    l.load_scene_images(1, &[png(2, 2)]);
    assert_eq!(l.live_handles(), 3);
    l.release_scene(0);
    assert_eq!(l.live_handles(), 1);
    l.release_scene(0);
    l.release_scene(1);
    assert_eq!(l.live_handles(), 0);
}

#[test]
fn scene_handles_fall_back_after_each_scene() {
    let mut l = loader();
    for scene in 0..5 {
        let slots = l.load_scene_images(scene, &[png(8, 8), png(8, 8)]);
        assert_eq!(l.live_handles(), 2);
        drop(slots);
        l.release_scene(scene);
        assert_eq!(l.live_handles(), 0, "after scene {scene}");
    }
}

#[test]
fn narrator_path_is_trimmed_like_other_sources() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, b"not really a video").unwrap();
    let mut l = loader();
    let err = l
        .load_narrator(&MediaSource::Reference(format!("  {}\n", path.display())))
        .unwrap_err();
    match err {
        ReelError::MediaDecode { cause, .. } => assert_ne!(cause, "file not found"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!l.has_narrator());
}
