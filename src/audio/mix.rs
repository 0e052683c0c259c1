use crate::assets::audio::AudioPcm;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{CompositionStage, ReelError, ReelResult};

/// Output sample rate of the mix graph.
pub const MIX_SAMPLE_RATE: u32 = 48_000;
/// Output channel count of the mix graph (interleaved stereo).
pub const MIX_CHANNELS: u16 = 2;

const NARRATION_FADE_SECS: f64 = 0.010;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VoiceKind {
    Narration,
    Music,
}

#[derive(Debug)]
struct Voice {
    kind: VoiceKind,
    pcm: AudioPcm,
    start_sample: u64,
    /// Last output sample (exclusive) this voice contributes to. `None` loops forever.
    end_sample: Option<u64>,
    gain: f32,
    fade_secs: f64,
}

impl Voice {
    fn natural_end(pcm: &AudioPcm, start_sample: u64) -> u64 {
        if pcm.sample_rate == 0 {
            return start_sample;
        }
        let out = (pcm.frames() as u128 * u128::from(MIX_SAMPLE_RATE))
            .div_ceil(u128::from(pcm.sample_rate));
        start_sample + out as u64
    }

    fn fade_gain(&self, dst_sample: u64) -> f32 {
        if self.fade_secs <= 0.0 {
            return 1.0;
        }
        let rate = f64::from(MIX_SAMPLE_RATE);
        let mut gain = 1.0f32;
        let rel_sec = dst_sample.saturating_sub(self.start_sample) as f64 / rate;
        gain *= (rel_sec / self.fade_secs).clamp(0.0, 1.0) as f32;
        if let Some(end) = self.end_sample {
            let rem = end.saturating_sub(dst_sample) as f64 / rate;
            gain *= (rem / self.fade_secs).clamp(0.0, 1.0) as f32;
        }
        gain
    }

    /// Add this voice's contribution for `[block_start, block_start + out.len()/2)` into `out`.
    fn mix_into(&self, out: &mut [f32], block_start: u64) {
        let src = self.pcm.interleaved_f32.as_slice();
        let src_frames = self.pcm.frames();
        if src_frames == 0 || self.pcm.sample_rate == 0 {
            return;
        }
        let step = f64::from(self.pcm.sample_rate) / f64::from(MIX_SAMPLE_RATE);
        let looped = self.kind == VoiceKind::Music;

        for (i, dst) in out.chunks_exact_mut(2).enumerate() {
            let dst_sample = block_start + i as u64;
            if dst_sample < self.start_sample {
                continue;
            }
            if let Some(end) = self.end_sample
                && dst_sample >= end
            {
                break;
            }

            let src_pos = (dst_sample - self.start_sample) as f64 * step;
            let mut src_frame0 = src_pos.floor() as usize;
            let frac = (src_pos - src_pos.floor()) as f32;
            if looped {
                src_frame0 %= src_frames;
            } else if src_frame0 >= src_frames {
                break;
            }
            let src_frame1 = if looped {
                (src_frame0 + 1) % src_frames
            } else {
                (src_frame0 + 1).min(src_frames - 1)
            };

            let (i0, i1) = (src_frame0 * 2, src_frame1 * 2);
            let l = src[i0] + (src[i1] - src[i0]) * frac;
            let r = src[i0 + 1] + (src[i1 + 1] - src[i0 + 1]) * frac;

            let gain = self.gain * self.fade_gain(dst_sample);
            dst[0] += l * gain;
            dst[1] += r * gain;
        }
    }

    fn finished_before(&self, sample: u64) -> bool {
        self.end_sample.is_some_and(|end| end <= sample)
    }
}

/// Software mix graph producing the single destination audio track of a run.
///
/// The destination is pulled in blocks that follow the video timeline exactly; see
/// [`frame_to_sample`]. One narration channel and one looped music bed are supported.
#[derive(Debug, Default)]
pub struct MixGraph {
    voices: Vec<Voice>,
    cursor: u64,
    closed: bool,
}

impl MixGraph {
    /// Create an open graph with the destination cursor at sample 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Destination cursor (next sample to be pulled).
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Number of voices still scheduled or playing.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Return `true` after [`MixGraph::close`].
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Schedule narration to start `offset_secs` after the destination cursor.
    ///
    /// Any narration still playing is faded out at that instant.
    pub fn play_narration(&mut self, pcm: AudioPcm, offset_secs: f64) -> ReelResult<()> {
        self.ensure_open()?;
        if !offset_secs.is_finite() || offset_secs < 0.0 {
            return Err(ReelError::validation(
                "narration offset must be finite and >= 0",
            ));
        }
        let start = self.cursor + (offset_secs * f64::from(MIX_SAMPLE_RATE)).round() as u64;
        let fade_samples = (NARRATION_FADE_SECS * f64::from(MIX_SAMPLE_RATE)).round() as u64;

        for v in self
            .voices
            .iter_mut()
            .filter(|v| v.kind == VoiceKind::Narration)
        {
            let stop = start + fade_samples;
            v.end_sample = Some(v.end_sample.map_or(stop, |e| e.min(stop)));
        }

        let end = Voice::natural_end(&pcm, start);
        tracing::debug!(
            start_sample = start,
            end_sample = end,
            source_rate = pcm.sample_rate,
            "narration scheduled"
        );
        self.voices.push(Voice {
            kind: VoiceKind::Narration,
            pcm,
            start_sample: start,
            end_sample: Some(end),
            gain: 1.0,
            fade_secs: NARRATION_FADE_SECS,
        });
        Ok(())
    }

    /// Start (or replace) the looped music bed at the destination cursor.
    pub fn play_looped_music(&mut self, pcm: AudioPcm, gain: f32) -> ReelResult<()> {
        self.ensure_open()?;
        if !gain.is_finite() || gain < 0.0 {
            return Err(ReelError::validation("music gain must be finite and >= 0"));
        }
        if pcm.frames() == 0 {
            return Err(ReelError::validation("music track has no samples"));
        }
        self.voices.retain(|v| v.kind != VoiceKind::Music);
        self.voices.push(Voice {
            kind: VoiceKind::Music,
            pcm,
            start_sample: self.cursor,
            end_sample: None,
            gain,
            fade_secs: 0.0,
        });
        Ok(())
    }

    /// Render the destination track from the cursor up to `end_sample` (exclusive).
    ///
    /// Returns interleaved stereo samples clamped to `[-1, 1]` and advances the cursor.
    pub fn pull_until(&mut self, end_sample: u64) -> ReelResult<Vec<f32>> {
        self.ensure_open()?;
        let frames = end_sample.saturating_sub(self.cursor) as usize;
        let mut out = vec![0.0f32; frames * usize::from(MIX_CHANNELS)];
        for v in &self.voices {
            v.mix_into(&mut out, self.cursor);
        }
        for s in &mut out {
            *s = s.clamp(-1.0, 1.0);
        }
        self.cursor += frames as u64;
        let cursor = self.cursor;
        self.voices.retain(|v| !v.finished_before(cursor));
        Ok(out)
    }

    /// Render exactly the samples that belong to output video frame `frame`.
    pub fn pull_frame(&mut self, frame: FrameIndex, fps: Fps) -> ReelResult<Vec<f32>> {
        self.pull_until(frame_to_sample(frame.0 + 1, fps, MIX_SAMPLE_RATE))
    }

    /// Drop all voices and refuse further use. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.voices.clear();
        self.closed = true;
        tracing::debug!(samples = self.cursor, "mix graph closed");
    }

    fn ensure_open(&self) -> ReelResult<()> {
        if self.closed {
            return Err(ReelError::composition(
                CompositionStage::OpenAudio,
                "mix graph is closed",
            ));
        }
        Ok(())
    }
}

impl Drop for MixGraph {
    fn drop(&mut self) {
        self.close();
    }
}

/// Convert a frame count to the nearest sample index at `sample_rate`.
pub fn frame_to_sample(frame: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frame) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
