use std::collections::BTreeMap;
use std::time::Instant;

use crate::assets::loader::MediaLoader;
use crate::assets::source::MediaSource;
use crate::audio::mix::MixGraph;
use crate::compose::options::ComposeOptions;
use crate::compose::pacing::FrameClock;
use crate::compose::progress::{ProgressReporter, ProgressTracker, Status};
use crate::effects::transition::TransitionEngine;
use crate::encode::sink::{VideoBlob, VideoEncoder};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{CompositionStage, ReelError, ReelResult};
use crate::render::frame::FrameRGBA;
use crate::render::scene::{RenderMode, SceneRenderer};
use crate::render::surface::Surface;
use crate::render::text::load_caption_font;
use crate::script::model::VideoScript;

/// Frame layout of a run, computed before anything is opened.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionPlan {
    /// Output frame rate.
    pub fps: Fps,
    /// Drawn frames per scene: `round(durationSeconds × fps)`.
    pub scene_frames: Vec<u64>,
    /// Global index of each scene's first frame.
    pub scene_starts: Vec<u64>,
    /// Frames in one transition window.
    pub transition_frames: u64,
    /// Sum of `scene_frames`.
    pub scene_frames_total: u64,
    /// Every output frame, transitions included.
    pub total_frames: u64,
}

impl CompositionPlan {
    /// Lay out `script` at the options' frame rate.
    ///
    /// A script whose scenes all round to zero frames is rejected as
    /// [`ReelError::ScriptValidation`].
    pub fn new(script: &VideoScript, options: &ComposeOptions) -> ReelResult<Self> {
        let fps = options.frame_rate()?;
        let transition_frames = TransitionEngine::new(fps, options.transition_seconds)?.frame_count();
        let scene_frames: Vec<u64> = script
            .scenes
            .iter()
            .map(|s| fps.secs_to_frames_round(s.duration_seconds))
            .collect();

        let mut scene_starts = Vec::with_capacity(scene_frames.len());
        let mut at = 0u64;
        for (i, frames) in scene_frames.iter().enumerate() {
            scene_starts.push(at);
            at += frames;
            if i + 1 < scene_frames.len() {
                at += transition_frames;
            }
        }

        if at == 0 {
            return Err(ReelError::script(format!(
                "script renders no frames at {} fps",
                fps.as_f64()
            )));
        }

        Ok(Self {
            fps,
            scene_frames_total: scene_frames.iter().sum(),
            scene_frames,
            scene_starts,
            transition_frames,
            total_frames: at,
        })
    }

    /// Transition frames played after scene `index` (none after the last scene).
    pub fn transition_after(&self, index: usize) -> u64 {
        if index + 1 < self.scene_frames.len() {
            self.transition_frames
        } else {
            0
        }
    }

    /// Output duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.total_frames)
    }
}

/// Position of a run in its timeline. Lives exactly as long as one [`compose`] call.
#[derive(Debug)]
struct RenderState {
    scene_index: usize,
    frame_in_scene: u64,
    global_frame: u64,
    started_at: Instant,
    scenes_completed: usize,
}

impl RenderState {
    fn new() -> Self {
        Self {
            scene_index: 0,
            frame_in_scene: 0,
            global_frame: 0,
            started_at: Instant::now(),
            scenes_completed: 0,
        }
    }
}

/// Render `script` into one video.
///
/// `narration` and `visuals` are keyed by zero-based scene index; missing keys mean a silent
/// scene or a scene without images. Asset failures are logged and degrade the affected scene;
/// encoder and mixer failures abort the run with [`ReelError::Composition`]. When `cancel` fires
/// the run stops within one frame and returns [`ReelError::Cancelled`].
///
/// Every resource opened by the run (encoder, mix graph, decoded assets) is released before
/// this returns, on every path.
#[tracing::instrument(
    skip_all,
    fields(scenes = script.scenes.len(), width = options.width, height = options.height, fps = options.fps)
)]
pub fn compose(
    script: &VideoScript,
    narration: &BTreeMap<usize, MediaSource>,
    visuals: &BTreeMap<usize, Vec<MediaSource>>,
    options: &ComposeOptions,
    encoder: &mut dyn VideoEncoder,
    progress: &mut dyn ProgressReporter,
    cancel: &CancelToken,
) -> ReelResult<VideoBlob> {
    script.validate()?;
    options.validate()?;
    let plan = CompositionPlan::new(script, options)?;
    let canvas = options.canvas();

    let mut loader = MediaLoader::new(canvas, plan.fps);
    let surface = Surface::new(canvas).map_err(|e| e.at_stage(CompositionStage::OpenEncoder))?;
    let captions = load_caption_font(options.font.as_ref(), &mut loader);

    let mut run = Run {
        script,
        narration,
        visuals,
        options,
        plan: &plan,
        encoder,
        progress,
        cancel,
        loader,
        mixer: MixGraph::new(),
        tracker: ProgressTracker::new(script.scenes.len()),
        state: RenderState::new(),
        surface,
        renderer: SceneRenderer::new(options.scene_style(), plan.fps, captions),
        transitions: TransitionEngine::new(plan.fps, options.transition_seconds)?,
        clock: FrameClock::start(options.pacing, plan.fps),
    };

    tracing::info!(
        total_frames = plan.total_frames,
        duration_secs = plan.duration_secs(),
        "composition started"
    );
    let result = run.execute();
    run.shutdown(&result);
    result
}

struct Run<'a> {
    script: &'a VideoScript,
    narration: &'a BTreeMap<usize, MediaSource>,
    visuals: &'a BTreeMap<usize, Vec<MediaSource>>,
    options: &'a ComposeOptions,
    plan: &'a CompositionPlan,
    encoder: &'a mut dyn VideoEncoder,
    progress: &'a mut dyn ProgressReporter,
    cancel: &'a CancelToken,
    loader: MediaLoader,
    mixer: MixGraph,
    tracker: ProgressTracker,
    state: RenderState,
    surface: Surface,
    renderer: SceneRenderer,
    transitions: TransitionEngine,
    clock: FrameClock,
}

impl Run<'_> {
    fn execute(&mut self) -> ReelResult<VideoBlob> {
        self.open_narrator();

        let enc_cfg = self
            .options
            .encoder_config()
            .map_err(|e| e.at_stage(CompositionStage::OpenEncoder))?;
        self.encoder
            .open_frame_sink(&enc_cfg)
            .map_err(|e| e.at_stage(CompositionStage::OpenEncoder))?;
        self.encoder
            .open_audio_sink(&self.options.audio_config())
            .map_err(|e| e.at_stage(CompositionStage::OpenAudio))?;

        self.start_music();
        self.tracker
            .emit(&mut *self.progress, Status::Started, None, 0);
        self.clock = FrameClock::start(self.options.pacing, self.plan.fps);

        for index in 0..self.script.scenes.len() {
            self.render_scene(index)?;
        }

        let blob = self
            .encoder
            .finalize()
            .map_err(|e| e.at_stage(CompositionStage::Finalize))?;
        self.tracker.emit(
            &mut *self.progress,
            Status::Finished,
            None,
            self.state.scenes_completed,
        );
        Ok(blob)
    }

    fn open_narrator(&mut self) {
        let Some(src) = self.options.narrator.as_ref() else {
            return;
        };
        if self.options.mode != RenderMode::Narrator {
            tracing::debug!("narrator clip ignored in slideshow mode");
            return;
        }
        if let Err(e) = self.loader.load_narrator(src) {
            tracing::warn!(source = %src.describe(), error = %e, "narrator clip unavailable; using placeholder avatar");
        }
    }

    fn start_music(&mut self) {
        let Some(src) = self.options.background_music.as_ref() else {
            return;
        };
        let played = self.loader.load_audio(src).and_then(|pcm| {
            self.mixer
                .play_looped_music(pcm, self.options.background_music_gain)
        });
        match played {
            Ok(()) => tracing::debug!(
                source = %src.describe(),
                gain = self.options.background_music_gain,
                "background music started"
            ),
            Err(e) => tracing::warn!(source = %src.describe(), error = %e, "background music skipped"),
        }
    }

    fn render_scene(&mut self, index: usize) -> ReelResult<()> {
        let script = self.script;
        let scene = &script.scenes[index];
        self.state.scene_index = index;
        self.state.frame_in_scene = 0;
        self.tracker.emit(
            &mut *self.progress,
            Status::SceneStarted,
            Some(index),
            self.state.scenes_completed,
        );

        let sources = self.visuals.get(&index).map(Vec::as_slice).unwrap_or(&[]);
        let images = self.loader.load_scene_images(index, sources);

        // Narration starts at the cursor, which sits on this scene's first frame.
        if let Some(src) = self.narration.get(&index) {
            let played = self
                .loader
                .load_audio(src)
                .and_then(|pcm| self.mixer.play_narration(pcm, 0.0));
            if let Err(e) = played {
                let e = ReelError::narration(index, e);
                tracing::warn!(scene = index, error = %e, "scene renders without narration");
            }
        }

        let total = self.renderer.enter(index, scene, images)?;
        let mut last: Option<FrameRGBA> = None;
        for _ in 0..total {
            self.check_cancel()?;
            let frame = self
                .renderer
                .draw_frame(&mut self.surface, self.loader.narrator_mut())?;
            self.push(&frame)?;
            self.state.frame_in_scene += 1;
            last = Some(frame);
        }
        let exited = self.renderer.exit()?;
        self.loader.release_scene(exited);

        let n = self.plan.transition_after(index);
        if n > 0 {
            let kind = scene.transition_kind;
            let last = last.unwrap_or_else(|| TransitionEngine::cleared(self.options.canvas()));
            tracing::debug!(scene = index, kind = ?kind, frames = n, "transition");
            for k in 0..n {
                self.check_cancel()?;
                let frame = self.transitions.render(kind, &last, k);
                self.push(&frame)?;
            }
            if let Some(clip) = self.loader.narrator_mut()
                && let Err(e) = clip.skip(n)
            {
                tracing::warn!(scene = index, error = %e, "narrator clip stalled during transition");
            }
        }

        self.state.scenes_completed += 1;
        self.tracker.emit(
            &mut *self.progress,
            Status::SceneCompleted,
            Some(index),
            self.state.scenes_completed,
        );
        Ok(())
    }

    fn push(&mut self, frame: &FrameRGBA) -> ReelResult<()> {
        let idx = FrameIndex(self.state.global_frame);
        self.encoder
            .push_frame(idx, frame)
            .map_err(|e| e.at_stage(CompositionStage::PushFrame))?;
        let samples = self
            .mixer
            .pull_frame(idx, self.plan.fps)
            .map_err(|e| e.at_stage(CompositionStage::MixAudio))?;
        self.encoder
            .mix_track(&samples)
            .map_err(|e| e.at_stage(CompositionStage::MixAudio))?;
        self.state.global_frame += 1;
        self.clock.tick();
        Ok(())
    }

    fn check_cancel(&self) -> ReelResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ReelError::Cancelled {
                scenes_completed: self.state.scenes_completed,
                percent: self.tracker.percent(),
            });
        }
        Ok(())
    }

    fn shutdown(&mut self, result: &ReelResult<VideoBlob>) {
        let scene = Some(self.state.scene_index);
        match result {
            Ok(blob) => tracing::info!(
                frames = blob.frame_count,
                duration_secs = blob.duration_secs,
                bytes = blob.bytes.len(),
                elapsed_ms = self.state.started_at.elapsed().as_millis() as u64,
                "composition finished"
            ),
            Err(ReelError::Cancelled {
                scenes_completed, ..
            }) => {
                self.encoder.abort();
                tracing::info!(
                    scene = self.state.scene_index,
                    frame = self.state.frame_in_scene,
                    scenes_completed,
                    "composition cancelled"
                );
                self.tracker.emit(
                    &mut *self.progress,
                    Status::Cancelled,
                    scene,
                    self.state.scenes_completed,
                );
            }
            Err(e) => {
                self.encoder.abort();
                tracing::error!(
                    scene = self.state.scene_index,
                    frame = self.state.global_frame,
                    error = %e,
                    "composition failed"
                );
                self.tracker.emit(
                    &mut *self.progress,
                    Status::Failed,
                    scene,
                    self.state.scenes_completed,
                );
            }
        }
        self.mixer.close();
        self.loader.release_all();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/orchestrator.rs"]
mod tests;
