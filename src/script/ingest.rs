//! Lenient ingestion of script JSON produced by the script-generation agent.
//!
//! Generated scripts are frequently incomplete: missing durations, unknown transition names,
//! numbers encoded as strings. Individual fields are defaulted instead of rejecting the
//! whole document. Only a document without a usable `scenes` array is an error.

use serde_json::{Map, Value};

use crate::foundation::error::{ReelError, ReelResult};
use crate::script::model::{DEFAULT_SCENE_SECONDS, MusicMood, Scene, TransitionKind, VideoScript};

/// Parse script JSON text leniently.
pub fn parse_script_str(text: &str) -> ReelResult<VideoScript> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ReelError::script(format!("script is not valid JSON: {e}")))?;
    parse_script_value(&value)
}

/// Parse an already-decoded script JSON value leniently.
pub fn parse_script_value(value: &Value) -> ReelResult<VideoScript> {
    let obj = value
        .as_object()
        .ok_or_else(|| ReelError::script("script JSON must be an object"))?;
    let raw_scenes = obj
        .get("scenes")
        .and_then(Value::as_array)
        .ok_or_else(|| ReelError::script("script JSON has no 'scenes' array"))?;

    let script_mood = str_field(obj, &["musicMood", "mood"])
        .map(MusicMood::parse_loose)
        .unwrap_or_default();

    let mut scenes = Vec::with_capacity(raw_scenes.len());
    for (i, raw) in raw_scenes.iter().enumerate() {
        let Some(scene_obj) = raw.as_object() else {
            tracing::warn!(scene = i, "skipping script scene that is not an object");
            continue;
        };
        scenes.push(parse_scene(i, scene_obj, script_mood));
    }

    let script = VideoScript {
        title: str_field(obj, &["title"]).unwrap_or_default().to_string(),
        scenes,
        music_mood: script_mood,
    };

    if let Some(declared) = num_field(obj, &["totalDurationSeconds", "totalDuration"]) {
        let actual = script.total_duration_seconds();
        if (declared - actual).abs() > 0.5 {
            tracing::debug!(
                declared,
                actual,
                "script totalDurationSeconds disagrees with scene sum; using scene sum"
            );
        }
    }
    Ok(script)
}

fn parse_scene(index: usize, obj: &Map<String, Value>, script_mood: MusicMood) -> Scene {
    let duration_seconds = match num_field(obj, &["durationSeconds", "duration"]) {
        Some(d) if d.is_finite() && d > 0.0 => d,
        other => {
            tracing::warn!(
                scene = index,
                raw = ?other,
                fallback = DEFAULT_SCENE_SECONDS,
                "scene duration missing or invalid; using fallback"
            );
            DEFAULT_SCENE_SECONDS
        }
    };

    let transition_kind = match str_field(obj, &["transitionKind", "transition"]) {
        None => TransitionKind::default(),
        Some(s) => TransitionKind::parse_loose(s).unwrap_or_else(|| {
            tracing::debug!(scene = index, kind = s, "unknown transition; using fade");
            TransitionKind::default()
        }),
    };

    Scene {
        narration_text: str_field(obj, &["narrationText", "narration", "text"])
            .unwrap_or_default()
            .to_string(),
        visual_description: str_field(obj, &["visualDescription", "visual", "description"])
            .unwrap_or_default()
            .to_string(),
        duration_seconds,
        transition_kind,
        music_mood: str_field(obj, &["musicMood", "mood"])
            .map(MusicMood::parse_loose)
            .unwrap_or(script_mood),
        title: str_field(obj, &["title"])
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
        source_note_id: obj
            .get("sourceNoteId")
            .or_else(|| obj.get("noteId"))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

fn num_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('s').trim().parse::<f64>().ok(),
        _ => None,
    })
}
