/// Phase a [`ProgressUpdate`] reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    /// Resources are open; nothing drawn yet.
    Started,
    /// A scene began drawing.
    SceneStarted,
    /// A scene and its outgoing transition finished.
    SceneCompleted,
    /// The output was produced.
    Finished,
    /// The run aborted with a fatal error.
    Failed,
    /// The run stopped because its cancel token fired.
    Cancelled,
}

/// One progress notification.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// `scenes completed / total scenes × 100`, never decreasing within a run.
    pub percent: f32,
    /// Scene the update refers to, if any.
    pub scene_index: Option<usize>,
    /// Number of scenes in the script.
    pub total_scenes: usize,
    /// Phase.
    pub status: Status,
}

/// Receives progress notifications from a composition run.
pub trait ProgressReporter {
    /// Called synchronously on the composing thread.
    fn report(&mut self, update: &ProgressUpdate);
}

impl<F: FnMut(&ProgressUpdate)> ProgressReporter for F {
    fn report(&mut self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Reporter that drops every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _update: &ProgressUpdate) {}
}

/// Turns scene events into monotone [`ProgressUpdate`]s.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    total_scenes: usize,
    percent: f32,
}

impl ProgressTracker {
    pub(crate) fn new(total_scenes: usize) -> Self {
        Self {
            total_scenes,
            percent: 0.0,
        }
    }

    pub(crate) fn percent(&self) -> f32 {
        self.percent
    }

    pub(crate) fn emit(
        &mut self,
        reporter: &mut dyn ProgressReporter,
        status: Status,
        scene_index: Option<usize>,
        scenes_completed: usize,
    ) {
        let target = if self.total_scenes == 0 {
            0.0
        } else {
            (scenes_completed.min(self.total_scenes) as f32 / self.total_scenes as f32) * 100.0
        };
        self.percent = self.percent.max(target);
        reporter.report(&ProgressUpdate {
            percent: self.percent,
            scene_index,
            total_scenes: self.total_scenes,
            status,
        });
    }
}
