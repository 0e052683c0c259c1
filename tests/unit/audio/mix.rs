use std::sync::Arc;

use super::*;

fn constant(sample_rate: u32, frames: usize, value: f32) -> AudioPcm {
    AudioPcm {
        sample_rate,
        interleaved_f32: Arc::new(vec![value; frames * 2]),
    }
}

fn left(block: &[f32], frame: usize) -> f32 {
    block[frame * 2]
}

#[test]
fn frame_to_sample_uses_rational_fps() {
    let fps30 = Fps::whole(30).unwrap();
    assert_eq!(frame_to_sample(0, fps30, 48_000), 0);
    assert_eq!(frame_to_sample(1, fps30, 48_000), 1_600);
    assert_eq!(frame_to_sample(30, fps30, 48_000), 48_000);

    let ntsc = Fps::new(30_000, 1001).unwrap();
    assert_eq!(frame_to_sample(30_000, ntsc, 48_000), 48_000 * 1001);
}

#[test]
fn per_frame_blocks_cover_the_timeline_exactly() {
    let fps = Fps::new(30_000, 1001).unwrap();
    let mut g = MixGraph::new();
    let mut total = 0usize;
    for f in 0..90u64 {
        total += g.pull_frame(FrameIndex(f), fps).unwrap().len() / 2;
    }
    assert_eq!(total as u64, frame_to_sample(90, fps, MIX_SAMPLE_RATE));
    assert_eq!(g.cursor(), total as u64);
}

#[test]
fn narration_fades_in_from_its_start() {
    let mut g = MixGraph::new();
    g.play_narration(constant(48_000, 48_000, 0.5), 0.0).unwrap();
    let block = g.pull_until(4_800).unwrap();
    assert!(left(&block, 0).abs() < 1e-6);
    assert!((left(&block, 2_000) - 0.5).abs() < 1e-4);
}

#[test]
fn narration_offset_is_relative_to_cursor() {
    let mut g = MixGraph::new();
    g.pull_until(1_000).unwrap();
    g.play_narration(constant(48_000, 48_000, 0.5), 0.1).unwrap();
    let silent = g.pull_until(1_000 + 4_800).unwrap();
    assert!(silent.iter().all(|s| s.abs() < 1e-9));
    let audible = g.pull_until(1_000 + 9_600).unwrap();
    assert!((left(&audible, 2_000) - 0.5).abs() < 1e-4);
}

#[test]
fn new_narration_stops_previous_one() {
    let mut g = MixGraph::new();
    g.play_narration(constant(48_000, 48_000, 0.5), 0.0).unwrap();
    g.pull_until(4_800).unwrap();
    g.play_narration(constant(48_000, 48_000, 0.25), 0.0).unwrap();
    let block = g.pull_until(9_600).unwrap();
    // 20 ms after the switch only the new voice remains, fully faded in.
    assert!((left(&block, 960) - 0.25).abs() < 1e-4);
    assert_eq!(g.active_voices(), 1);
}

#[test]
fn music_loops_at_its_gain() {
    let mut g = MixGraph::new();
    g.play_looped_music(constant(48_000, 100, 0.5), 0.3).unwrap();
    let block = g.pull_until(1_000).unwrap();
    assert!((left(&block, 950) - 0.15).abs() < 1e-5);
    assert_eq!(g.active_voices(), 1);
}

#[test]
fn output_is_clamped() {
    let mut g = MixGraph::new();
    g.play_looped_music(constant(48_000, 48_000, 0.9), 1.0).unwrap();
    g.play_narration(constant(48_000, 48_000, 0.9), 0.0).unwrap();
    let block = g.pull_until(4_800).unwrap();
    assert!(block.iter().all(|s| (-1.0..=1.0).contains(s)));
    assert_eq!(left(&block, 2_000), 1.0);
}

#[test]
fn resampled_voice_ends_at_scaled_length() {
    let mut g = MixGraph::new();
    // 0.1 s at 24 kHz spans 4800 output samples.
    g.play_narration(constant(24_000, 2_400, 0.5), 0.0).unwrap();
    let block = g.pull_until(9_600).unwrap();
    assert!(left(&block, 2_400) > 0.4);
    assert!(left(&block, 5_000).abs() < 1e-9);
    assert_eq!(g.active_voices(), 0);
}

#[test]
fn closed_graph_rejects_use() {
    let mut g = MixGraph::new();
    g.play_looped_music(constant(48_000, 10, 0.1), 0.3).unwrap();
    g.close();
    g.close();
    assert!(g.is_closed());
    assert_eq!(g.active_voices(), 0);
    let err = g.pull_until(10).unwrap_err();
    assert!(matches!(
        err,
        ReelError::Composition {
            stage: CompositionStage::OpenAudio,
            ..
        }
    ));
    assert!(g.play_narration(constant(48_000, 10, 0.1), 0.0).is_err());
}

#[test]
fn invalid_inputs_are_rejected() {
    let mut g = MixGraph::new();
    assert!(g.play_narration(constant(48_000, 10, 0.1), -1.0).is_err());
    assert!(g.play_looped_music(constant(48_000, 10, 0.1), f32::NAN).is_err());
    assert!(g.play_looped_music(constant(48_000, 0, 0.1), 0.3).is_err());
}
