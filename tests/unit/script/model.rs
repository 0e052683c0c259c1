use super::*;

#[test]
fn validate_rejects_empty_script() {
    let script = VideoScript::new("empty", Vec::new());
    assert!(matches!(
        script.validate(),
        Err(ReelError::ScriptValidation(_))
    ));
}

#[test]
fn validate_rejects_non_positive_duration() {
    let script = VideoScript::new("bad", vec![Scene::new("a", 2.0), Scene::new("b", 0.0)]);
    let err = script.validate().unwrap_err();
    assert!(err.to_string().contains("scene 1"));
}

#[test]
fn total_duration_sums_scenes() {
    let script = VideoScript::new("ok", vec![Scene::new("a", 5.0), Scene::new("b", 3.0)]);
    script.validate().unwrap();
    assert!((script.total_duration_seconds() - 8.0).abs() < 1e-12);
}

#[test]
fn caption_prefers_non_blank_title() {
    let scene = Scene::new("  we went to the beach  ", 3.0);
    assert_eq!(scene.caption(), "we went to the beach");
    let titled = scene.clone().with_title("Summer");
    assert_eq!(titled.caption(), "Summer");
    let blank = scene.with_title("   ");
    assert_eq!(blank.caption(), "we went to the beach");
}

#[test]
fn loose_transition_and_mood_names() {
    assert_eq!(TransitionKind::parse_loose(" Slide "), Some(TransitionKind::Slide));
    assert_eq!(TransitionKind::parse_loose("zoom-out"), Some(TransitionKind::Zoom));
    assert_eq!(TransitionKind::parse_loose("spin"), None);
    assert_eq!(MusicMood::parse_loose("Happy"), MusicMood::Upbeat);
    assert_eq!(MusicMood::parse_loose("???"), MusicMood::Neutral);
}

#[test]
fn serde_uses_camel_case_and_defaults() {
    let scene: Scene = serde_json::from_value(serde_json::json!({
        "narrationText": "hello",
        "durationSeconds": 4.0,
        "transitionKind": "zoom"
    }))
    .unwrap();
    assert_eq!(scene.transition_kind, TransitionKind::Zoom);
    assert_eq!(scene.music_mood, MusicMood::Neutral);
    assert!(scene.source_note_id.is_none());
}
