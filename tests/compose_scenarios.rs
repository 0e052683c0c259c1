use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::{Duration, Instant};

use momentreel::{
    AudioSinkConfig, CancelToken, ComposeOptions, CompositionPlan, CompositionStage,
    EncoderConfig, FrameIndex, FrameRGBA, InMemoryEncoder, MediaSource, NoProgress, Pacing,
    ProgressUpdate, ReelError, ReelResult, RenderMode, Scene, Status, TransitionKind, VideoBlob,
    VideoEncoder, VideoScript, compose,
};

const RED: [u8; 4] = [200, 10, 10, 255];

fn options() -> ComposeOptions {
    ComposeOptions {
        width: 64,
        height: 36,
        fps: 10,
        pacing: Pacing::Unpaced,
        ..ComposeOptions::default()
    }
}

fn script(durations: &[f64]) -> VideoScript {
    VideoScript::new(
        "story",
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| Scene::new(format!("Scene number {i}"), *d))
            .collect(),
    )
}

fn png(w: u32, h: u32, rgba: [u8; 4]) -> MediaSource {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    MediaSource::from(buf)
}

fn sine_wav(secs: f32, freq: f32) -> MediaSource {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::new();
    {
        let mut w = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
        let n = (secs * spec.sample_rate as f32) as u32;
        for i in 0..n {
            let t = i as f32 / spec.sample_rate as f32;
            let v = (t * freq * std::f32::consts::TAU).sin() * 0.5;
            w.write_sample((v * f32::from(i16::MAX)) as i16).unwrap();
        }
        w.finalize().unwrap();
    }
    MediaSource::from(buf)
}

fn near(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 3)
}

fn run(
    script: &VideoScript,
    narration: &BTreeMap<usize, MediaSource>,
    visuals: &BTreeMap<usize, Vec<MediaSource>>,
    opts: &ComposeOptions,
) -> (ReelResult<VideoBlob>, InMemoryEncoder, Vec<ProgressUpdate>) {
    let mut enc = InMemoryEncoder::new();
    let mut updates = Vec::new();
    let mut rep = |u: &ProgressUpdate| updates.push(*u);
    let res = compose(
        script,
        narration,
        visuals,
        opts,
        &mut enc,
        &mut rep,
        &CancelToken::new(),
    );
    (res, enc, updates)
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

#[test]
fn two_scenes_without_assets_use_placeholder() {
    let s = script(&[5.0, 3.0]);
    let (res, enc, _) = run(&s, &BTreeMap::new(), &BTreeMap::new(), &options());
    let blob = res.unwrap();

    // 50 + 10 (transition) + 30
    assert_eq!(blob.frame_count, 90);
    assert!((blob.duration_secs - 9.0).abs() < 1e-9);
    assert!((blob.duration_secs - s.total_duration_seconds()).abs() <= 1.0 + 1e-9);
    assert!(enc.is_finalized());
    assert!(!enc.is_aborted());

    let frames = enc.frames();
    for (i, (idx, _)) in frames.iter().enumerate() {
        assert_eq!(*idx, FrameIndex(i as u64));
    }
    for (_, f) in frames[..50].iter().chain(&frames[60..]) {
        assert!(f.mean_luma() > 5.0);
    }
    assert_eq!(enc.samples().len(), 9 * 48_000 * 2);
    assert_eq!(peak(enc.samples()), 0.0);
}

#[test]
fn single_scene_with_image_and_narration() {
    let s = script(&[4.0]);
    let narration = BTreeMap::from([(0, sine_wav(1.0, 440.0))]);
    let visuals = BTreeMap::from([(0, vec![png(4, 3, RED)])]);
    let (res, enc, _) = run(&s, &narration, &visuals, &options());
    let blob = res.unwrap();
    assert_eq!(blob.frame_count, 40);

    // Inset settled after the first third of the scene.
    let settled = &enc.frames()[20].1;
    assert!(near(settled.pixel(51, 9), RED), "{:?}", settled.pixel(51, 9));
    assert!(!near(enc.frames()[0].1.pixel(51, 9), RED));

    // Narration audible from the first frame block; silent after it ends.
    let per_frame = 4_800 * 2;
    assert!(peak(&enc.samples()[..per_frame]) > 0.1);
    assert_eq!(peak(&enc.samples()[per_frame * 12..]), 0.0);
    assert_eq!(enc.samples().len(), 40 * per_frame);
}

#[test]
fn narration_starts_on_scene_first_frame() {
    let s = script(&[1.0, 1.0]);
    let narration = BTreeMap::from([(1, sine_wav(0.5, 330.0))]);
    let (res, enc, _) = run(&s, &narration, &BTreeMap::new(), &options());
    res.unwrap();

    let plan = CompositionPlan::new(&s, &options()).unwrap();
    let start = (plan.scene_starts[1] * 4_800 * 2) as usize;
    assert_eq!(start, 20 * 9_600);
    assert_eq!(peak(&enc.samples()[..start]), 0.0);
    assert!(peak(&enc.samples()[start..start + 9_600]) > 0.1);
}

#[test]
fn corrupt_image_only_affects_its_scene() {
    let s = script(&[1.0, 1.0, 1.0]);
    let opts = ComposeOptions {
        transition_seconds: 0.5,
        ..options()
    };
    let with_corrupt = BTreeMap::from([
        (0, vec![png(4, 3, RED)]),
        (1, vec![MediaSource::from(b"definitely not a png".to_vec())]),
        (2, vec![png(4, 3, RED)]),
    ]);
    let without = BTreeMap::from([(0, vec![png(4, 3, RED)]), (2, vec![png(4, 3, RED)])]);

    let (res_a, enc_a, _) = run(&s, &BTreeMap::new(), &with_corrupt, &opts);
    let (res_b, enc_b, _) = run(&s, &BTreeMap::new(), &without, &opts);
    assert_eq!(res_a.unwrap().frame_count, 40);
    res_b.unwrap();

    assert_eq!(enc_a.frames(), enc_b.frames());
    // scene 0 frame 8, scene 2 starts at 30
    assert!(near(enc_a.frames()[8].1.pixel(51, 9), RED));
    assert!(near(enc_a.frames()[38].1.pixel(51, 9), RED));
    assert!(!near(enc_a.frames()[23].1.pixel(51, 9), RED));
}

#[test]
fn frame_totals_match_rounded_durations() {
    for (durations, fps) in [
        (vec![0.7, 2.25, 1.5], 24),
        (vec![1.0], 30),
        (vec![0.3, 0.3, 0.3, 0.3], 25),
    ] {
        let s = script(&durations);
        let opts = ComposeOptions {
            fps,
            transition_seconds: 0.25,
            ..options()
        };
        let (res, _, updates) = run(&s, &BTreeMap::new(), &BTreeMap::new(), &opts);
        let blob = res.unwrap();
        let scene_frames: u64 = durations
            .iter()
            .map(|d| (d * f64::from(fps)).round() as u64)
            .sum();
        let transition = (0.25 * f64::from(fps)).round() as u64;
        assert_eq!(
            blob.frame_count,
            scene_frames + transition * (durations.len() as u64 - 1)
        );
        assert_eq!(updates.last().map(|u| u.status), Some(Status::Finished));
    }
}

#[test]
fn repeated_runs_are_identical() {
    let s = script(&[1.2, 0.8]);
    let visuals = BTreeMap::from([(1, vec![png(8, 6, [20, 200, 40, 255])])]);
    let narration = BTreeMap::from([(0, sine_wav(0.4, 220.0))]);
    let (a, enc_a, _) = run(&s, &narration, &visuals, &options());
    let (b, enc_b, _) = run(&s, &narration, &visuals, &options());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.frame_count, b.frame_count);
    assert_eq!(a.duration_secs, b.duration_secs);
    assert_eq!(a.bytes, b.bytes);
    assert_eq!(enc_a.samples(), enc_b.samples());
}

#[test]
fn missing_narration_keeps_duration() {
    let s = script(&[1.0, 1.0, 1.0]);
    let full = BTreeMap::from([
        (0, sine_wav(0.5, 200.0)),
        (1, sine_wav(0.5, 300.0)),
        (2, sine_wav(0.5, 400.0)),
    ]);
    let partial = BTreeMap::from([
        (0, sine_wav(0.5, 200.0)),
        (1, MediaSource::from(b"not audio".to_vec())),
    ]);
    let (a, _, _) = run(&s, &full, &BTreeMap::new(), &options());
    let (b, enc_b, _) = run(&s, &partial, &BTreeMap::new(), &options());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.frame_count, b.frame_count);
    assert_eq!(a.duration_secs, b.duration_secs);
    assert_eq!(enc_b.samples().len() as u64, b.frame_count * 4_800 * 2);
}

#[test]
fn progress_is_monotone_and_completes_last() {
    let s = script(&[0.5, 0.5, 0.5, 0.5]);
    let (res, _, updates) = run(&s, &BTreeMap::new(), &BTreeMap::new(), &options());
    res.unwrap();

    assert_eq!(updates.first().map(|u| u.status), Some(Status::Started));
    assert!(updates.windows(2).all(|w| w[0].percent <= w[1].percent));
    let first_full = updates.iter().position(|u| u.percent >= 100.0).unwrap();
    assert_eq!(updates[first_full].status, Status::SceneCompleted);
    assert_eq!(updates[first_full].scene_index, Some(3));
    assert_eq!(updates.last().map(|u| u.status), Some(Status::Finished));
    let completed: Vec<f32> = updates
        .iter()
        .filter(|u| u.status == Status::SceneCompleted)
        .map(|u| u.percent)
        .collect();
    assert_eq!(completed, vec![25.0, 50.0, 75.0, 100.0]);
}

/// Delegating encoder that fires a cancel token after a fixed number of frames.
struct CancelAfter<'a> {
    inner: &'a mut InMemoryEncoder,
    token: CancelToken,
    after: usize,
}

impl VideoEncoder for CancelAfter<'_> {
    fn open_frame_sink(&mut self, cfg: &EncoderConfig) -> ReelResult<()> {
        self.inner.open_frame_sink(cfg)
    }
    fn open_audio_sink(&mut self, cfg: &AudioSinkConfig) -> ReelResult<()> {
        self.inner.open_audio_sink(cfg)
    }
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        self.inner.push_frame(idx, frame)?;
        if self.inner.frames().len() == self.after {
            self.token.cancel();
        }
        Ok(())
    }
    fn mix_track(&mut self, samples: &[f32]) -> ReelResult<()> {
        self.inner.mix_track(samples)
    }
    fn finalize(&mut self) -> ReelResult<VideoBlob> {
        self.inner.finalize()
    }
    fn abort(&mut self) {
        self.inner.abort()
    }
}

#[test]
fn cancellation_mid_second_scene() {
    let s = script(&[1.0, 1.0, 1.0, 1.0]);
    let opts = ComposeOptions {
        transition_seconds: 0.5,
        ..options()
    };
    let token = CancelToken::new();
    let mut inner = InMemoryEncoder::new();
    let mut updates = Vec::new();
    let mut rep = |u: &ProgressUpdate| updates.push(*u);
    // scene 1 spans frames 15..25
    let mut enc = CancelAfter {
        inner: &mut inner,
        token: token.clone(),
        after: 20,
    };
    let err = compose(
        &s,
        &BTreeMap::new(),
        &BTreeMap::new(),
        &opts,
        &mut enc,
        &mut rep,
        &token,
    )
    .unwrap_err();

    match err {
        ReelError::Cancelled {
            scenes_completed,
            percent,
        } => {
            assert_eq!(scenes_completed, 1);
            assert_eq!(percent, 25.0);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(inner.frames().len(), 20);
    assert!(inner.is_aborted());
    assert!(!inner.is_finalized());
    assert_eq!(updates.last().map(|u| u.status), Some(Status::Cancelled));
    assert_eq!(updates.last().and_then(|u| u.scene_index), Some(1));
}

#[test]
fn cancel_before_start_produces_no_frames() {
    let token = CancelToken::new();
    token.cancel();
    let mut enc = InMemoryEncoder::new();
    let err = compose(
        &script(&[1.0]),
        &BTreeMap::new(),
        &BTreeMap::new(),
        &options(),
        &mut enc,
        &mut NoProgress,
        &token,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ReelError::Cancelled {
            scenes_completed: 0,
            ..
        }
    ));
    assert!(enc.frames().is_empty());
    assert!(enc.is_aborted());
}

#[test]
fn encoder_failures_abort_with_stage() {
    for stage in [
        CompositionStage::OpenEncoder,
        CompositionStage::OpenAudio,
        CompositionStage::PushFrame,
        CompositionStage::MixAudio,
        CompositionStage::Finalize,
    ] {
        let mut enc = InMemoryEncoder::failing_at(stage);
        let mut last = None;
        let mut rep = |u: &ProgressUpdate| last = Some(u.status);
        let err = compose(
            &script(&[0.5, 0.5]),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &options(),
            &mut enc,
            &mut rep,
            &CancelToken::new(),
        )
        .unwrap_err();
        match err {
            ReelError::Composition { stage: got, .. } => assert_eq!(got, stage),
            other => panic!("unexpected error: {other}"),
        }
        assert!(enc.is_aborted());
        assert_eq!(last, Some(Status::Failed));
    }
}

#[test]
fn slideshow_mode_draws_images_full_frame() {
    let mut s = script(&[1.0, 1.0]);
    s.scenes[0].transition_kind = TransitionKind::Slide;
    let opts = ComposeOptions {
        mode: RenderMode::Slideshow,
        ..options()
    };
    let visuals = BTreeMap::from([(0, vec![png(16, 9, RED)])]);
    let (res, enc, _) = run(&s, &BTreeMap::new(), &visuals, &opts);
    assert_eq!(res.unwrap().frame_count, 30);
    assert!(near(enc.frames()[5].1.pixel(32, 10), RED));
    // Last transition frame is fully faded out.
    assert_eq!(enc.frames()[19].1.pixel(5, 5), [0, 0, 0, 255]);
}

#[test]
fn music_loops_under_the_whole_run() {
    let opts = ComposeOptions {
        background_music: Some(sine_wav(0.25, 110.0)),
        background_music_gain: 0.3,
        ..options()
    };
    let (res, enc, _) = run(&script(&[1.0, 1.0]), &BTreeMap::new(), &BTreeMap::new(), &opts);
    let blob = res.unwrap();
    assert_eq!(blob.frame_count, 30);
    let tail = &enc.samples()[enc.samples().len() - 9_600..];
    let p = peak(tail);
    assert!(p > 0.05 && p <= 0.3 * 0.5 + 0.01, "{p}");
}

#[test]
fn broken_music_is_skipped() {
    let opts = ComposeOptions {
        background_music: Some(MediaSource::from(b"junk".to_vec())),
        ..options()
    };
    let (res, enc, _) = run(&script(&[0.5]), &BTreeMap::new(), &BTreeMap::new(), &opts);
    res.unwrap();
    assert_eq!(peak(enc.samples()), 0.0);
}

#[test]
fn real_time_pacing_holds_frames() {
    let opts = ComposeOptions {
        fps: 20,
        pacing: Pacing::RealTime,
        ..options()
    };
    let started = Instant::now();
    let (res, _, _) = run(&script(&[0.5]), &BTreeMap::new(), &BTreeMap::new(), &opts);
    assert_eq!(res.unwrap().frame_count, 10);
    assert!(started.elapsed() >= Duration::from_millis(450));
}

#[test]
fn missing_narrator_falls_back_to_placeholder() {
    let opts = ComposeOptions {
        narrator: Some(MediaSource::Reference(
            "/nonexistent/momentreel/narrator.mp4".to_string(),
        )),
        ..options()
    };
    let (with_missing, enc_a, _) =
        run(&script(&[0.5]), &BTreeMap::new(), &BTreeMap::new(), &opts);
    let (plain, enc_b, _) = run(&script(&[0.5]), &BTreeMap::new(), &BTreeMap::new(), &options());
    assert_eq!(with_missing.unwrap().frame_count, plain.unwrap().frame_count);
    assert_eq!(enc_a.frames(), enc_b.frames());
}

fn caption_font() -> Option<MediaSource> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    ]
    .iter()
    .map(std::path::Path::new)
    .find(|p| p.is_file())
    .map(MediaSource::from)
}

#[test]
fn caption_visible_only_during_title_window() {
    let Some(font) = caption_font() else {
        eprintln!("skipping: no caption font installed");
        return;
    };
    let opts = ComposeOptions {
        font: Some(font),
        ..options()
    };
    let visuals = BTreeMap::from([(0, vec![png(4, 3, RED)])]);
    let captioned = VideoScript::new(
        "story",
        vec![Scene::new("A quiet morning by the lake", 4.0)],
    );
    let bare = VideoScript::new("story", vec![Scene::new("   ", 4.0)]);

    let (res, with_caption, _) = run(&captioned, &BTreeMap::new(), &visuals, &opts);
    res.unwrap();
    let (res, without_caption, _) = run(&bare, &BTreeMap::new(), &visuals, &opts);
    res.unwrap();

    let a = with_caption.frames();
    let b = without_caption.frames();
    assert_eq!(a.len(), 40);
    assert_eq!(b.len(), 40);
    // Inside the window the caption band changes pixels; after it, frames match.
    assert_ne!(a[10].1, b[10].1);
    assert_eq!(a[30].1, b[30].1);
    assert_eq!(a[39].1, b[39].1);
}
