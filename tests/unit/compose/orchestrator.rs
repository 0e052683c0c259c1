use super::*;
use crate::encode::sink::InMemoryEncoder;
use crate::script::model::Scene;

fn options(fps: u32) -> ComposeOptions {
    ComposeOptions {
        width: 32,
        height: 18,
        fps,
        pacing: crate::compose::options::Pacing::Unpaced,
        ..ComposeOptions::default()
    }
}

fn script(durations: &[f64]) -> VideoScript {
    VideoScript::new(
        "t",
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| Scene::new(format!("scene {i}"), *d))
            .collect(),
    )
}

#[test]
fn plan_counts_scene_and_transition_frames() {
    let plan = CompositionPlan::new(&script(&[5.0, 3.0]), &options(30)).unwrap();
    assert_eq!(plan.scene_frames, vec![150, 90]);
    assert_eq!(plan.scene_starts, vec![0, 180]);
    assert_eq!(plan.transition_frames, 30);
    assert_eq!(plan.scene_frames_total, 240);
    assert_eq!(plan.total_frames, 270);
    assert_eq!(plan.transition_after(0), 30);
    assert_eq!(plan.transition_after(1), 0);
    assert!((plan.duration_secs() - 9.0).abs() < 1e-9);
}

#[test]
fn plan_rounds_each_scene_independently() {
    let plan = CompositionPlan::new(&script(&[1.04, 1.06, 0.96]), &options(10)).unwrap();
    assert_eq!(plan.scene_frames, vec![10, 11, 10]);
    assert_eq!(plan.scene_frames_total, 31);
}

#[test]
fn plan_without_transitions() {
    let o = ComposeOptions {
        transition_seconds: 0.0,
        ..options(10)
    };
    let plan = CompositionPlan::new(&script(&[1.0, 2.0]), &o).unwrap();
    assert_eq!(plan.total_frames, 30);
    assert_eq!(plan.scene_starts, vec![0, 10]);
}

#[test]
fn invalid_script_allocates_nothing() {
    let mut enc = InMemoryEncoder::new();
    let err = compose(
        &VideoScript::new("empty", Vec::new()),
        &BTreeMap::new(),
        &BTreeMap::new(),
        &options(10),
        &mut enc,
        &mut crate::compose::progress::NoProgress,
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::ScriptValidation(_)));
    assert!(enc.config().is_none());
    assert!(!enc.is_aborted());
}

#[test]
fn invalid_options_are_rejected_before_opening() {
    let mut enc = InMemoryEncoder::new();
    let err = compose(
        &script(&[1.0]),
        &BTreeMap::new(),
        &BTreeMap::new(),
        &ComposeOptions {
            width: 31,
            ..options(10)
        },
        &mut enc,
        &mut crate::compose::progress::NoProgress,
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
    assert!(enc.config().is_none());
}

#[test]
fn script_rounding_to_no_frames_is_rejected_before_opening() {
    let short = script(&[0.01]);
    short.validate().unwrap();
    let err = CompositionPlan::new(&short, &options(30)).unwrap_err();
    assert!(matches!(err, ReelError::ScriptValidation(_)));

    let mut enc = InMemoryEncoder::new();
    let err = compose(
        &short,
        &BTreeMap::new(),
        &BTreeMap::new(),
        &options(30),
        &mut enc,
        &mut crate::compose::progress::NoProgress,
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::ScriptValidation(_)));
    assert!(enc.config().is_none());
}

#[test]
fn zero_frame_scene_is_fine_when_others_draw() {
    let plan = CompositionPlan::new(&script(&[0.01, 1.0]), &options(10)).unwrap();
    assert_eq!(plan.scene_frames, vec![0, 10]);
    assert_eq!(plan.total_frames, 20);
}
