use crate::foundation::error::{ReelError, ReelResult};

/// Fallback scene duration used when a script omits or garbles `durationSeconds`.
pub const DEFAULT_SCENE_SECONDS: f64 = 8.0;

/// Visual transition played after a scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Fade the last frame to black.
    #[default]
    Fade,
    /// Slide the last frame off to the left while fading it out.
    Slide,
    /// Shrink the last frame around the center while fading it out.
    Zoom,
}

impl TransitionKind {
    /// Parse a loosely formatted transition name; unknown names yield `None`.
    pub fn parse_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fade" | "fade-to-black" | "fade_to_black" | "crossfade" | "dissolve" => {
                Some(Self::Fade)
            }
            "slide" | "slide-left" | "slide_left" | "wipe" | "push" => Some(Self::Slide),
            "zoom" | "zoom-out" | "zoom_out" | "zoomout" => Some(Self::Zoom),
            _ => None,
        }
    }
}

/// Mood tag attached to scenes and scripts; used by callers to pick music.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MusicMood {
    /// Energetic.
    Upbeat,
    /// Quiet and relaxed.
    Calm,
    /// Sentimental.
    Emotional,
    /// Tense or epic.
    Dramatic,
    /// Wistful, looking back.
    Nostalgic,
    /// No particular mood.
    #[default]
    Neutral,
}

impl MusicMood {
    /// Parse a loosely formatted mood; unknown names map to [`MusicMood::Neutral`].
    pub fn parse_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "upbeat" | "happy" | "energetic" | "joyful" => Self::Upbeat,
            "calm" | "peaceful" | "relaxed" | "chill" => Self::Calm,
            "emotional" | "sentimental" | "touching" | "sad" => Self::Emotional,
            "dramatic" | "epic" | "intense" => Self::Dramatic,
            "nostalgic" | "reflective" | "wistful" => Self::Nostalgic,
            _ => Self::Neutral,
        }
    }
}

/// One timed unit of a video script.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Text spoken by the narrator during this scene.
    #[serde(default)]
    pub narration_text: String,
    /// Description of what the scene should show.
    #[serde(default)]
    pub visual_description: String,
    /// Target on-screen duration, `> 0`.
    pub duration_seconds: f64,
    /// Transition played after this scene (ignored for the last scene).
    #[serde(default)]
    pub transition_kind: TransitionKind,
    /// Mood of the scene.
    #[serde(default)]
    pub music_mood: MusicMood,
    /// Optional short title shown in the opening caption instead of the narration text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Weak back-reference to the moment this scene was written from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_note_id: Option<String>,
}

impl Scene {
    /// Create a scene with default transition and mood.
    pub fn new(narration_text: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            narration_text: narration_text.into(),
            visual_description: String::new(),
            duration_seconds,
            transition_kind: TransitionKind::default(),
            music_mood: MusicMood::default(),
            title: None,
            source_note_id: None,
        }
    }

    /// Builder-style transition setter.
    pub fn with_transition(mut self, kind: TransitionKind) -> Self {
        self.transition_kind = kind;
        self
    }

    /// Builder-style title setter.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Text for the opening caption: the title when present, else the narration.
    pub fn caption(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => self.narration_text.trim(),
        }
    }
}

/// Ordered list of scenes rendered by one composition run.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoScript {
    /// Script title.
    #[serde(default)]
    pub title: String,
    /// Scenes in playback order.
    #[serde(default)]
    pub scenes: Vec<Scene>,
    /// Overall mood of the script.
    #[serde(default)]
    pub music_mood: MusicMood,
}

impl VideoScript {
    /// Create a script from scenes.
    pub fn new(title: impl Into<String>, scenes: Vec<Scene>) -> Self {
        Self {
            title: title.into(),
            scenes,
            music_mood: MusicMood::default(),
        }
    }

    /// Sum of scene durations in seconds.
    pub fn total_duration_seconds(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration_seconds).sum()
    }

    /// Reject scripts that cannot be rendered.
    pub fn validate(&self) -> ReelResult<()> {
        if self.scenes.is_empty() {
            return Err(ReelError::script("script has no scenes"));
        }
        for (i, scene) in self.scenes.iter().enumerate() {
            if !scene.duration_seconds.is_finite() || scene.duration_seconds <= 0.0 {
                return Err(ReelError::script(format!(
                    "scene {i} duration must be finite and > 0 (got {})",
                    scene.duration_seconds
                )));
            }
        }
        let total = self.total_duration_seconds();
        if !total.is_finite() || total <= 0.0 {
            return Err(ReelError::script("script total duration must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/model.rs"]
mod tests;
